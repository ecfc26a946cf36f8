//! Progress bar for registry lookups

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Mutex;
use unblock_registry::ProgressSink;

/// [`ProgressSink`] drawing one bar per resolution stage on stderr
#[derive(Default)]
pub struct LookupProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl LookupProgress {
    /// Progress with no bar shown yet
    pub fn new() -> Self {
        Self::default()
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━╸━")
}

impl ProgressSink for LookupProgress {
    fn begin(&self, total: usize, label: &str) {
        let bar = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr());
        bar.set_style(bar_style());
        bar.set_prefix(format!("Resolving {label}"));
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(previous) = slot.replace(bar) {
                previous.finish_and_clear();
            }
        }
    }

    fn advance(&self, label: &str) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                bar.set_message(label.to_string());
                bar.inc(1);
            }
        }
    }

    fn end(&self) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        }
    }
}

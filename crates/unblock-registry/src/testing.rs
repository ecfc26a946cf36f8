//! In-memory version sources for tests (enabled with the `test-utils` feature)

use crate::error::{Error, Result};
use crate::progress::ProgressSink;
use crate::source::LatestVersionSource;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Clone)]
enum Answer {
    Version(String),
    NotFound,
    /// Time out `failures` times, then answer `version`
    Flaky { failures: usize, version: String },
    AlwaysTimeout,
}

/// Scripted [`LatestVersionSource`] that counts every call.
///
/// Names without a script answer `PackageNotFound`.
#[derive(Debug, Default)]
pub struct StaticVersionSource {
    answers: HashMap<String, Answer>,
    calls: Mutex<HashMap<String, usize>>,
    unreachable: AtomicBool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StaticVersionSource {
    /// Empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `version` for `name`
    pub fn with_version(mut self, name: &str, version: &str) -> Self {
        self.answers
            .insert(name.to_string(), Answer::Version(version.to_string()));
        self
    }

    /// Answer "not found" for `name`
    pub fn with_not_found(mut self, name: &str) -> Self {
        self.answers.insert(name.to_string(), Answer::NotFound);
        self
    }

    /// Time out `failures` times for `name`, then answer `version`
    pub fn with_flaky(mut self, name: &str, failures: usize, version: &str) -> Self {
        self.answers.insert(
            name.to_string(),
            Answer::Flaky {
                failures,
                version: version.to_string(),
            },
        );
        self
    }

    /// Always time out for `name`
    pub fn with_timeout(mut self, name: &str) -> Self {
        self.answers.insert(name.to_string(), Answer::AlwaysTimeout);
        self
    }

    /// Make `ping` fail
    pub fn unreachable(self) -> Self {
        self.unreachable.store(true, Ordering::SeqCst);
        self
    }

    /// Lookups made for `name`
    pub fn calls_for(&self, name: &str) -> usize {
        self.calls.lock().get(name).copied().unwrap_or(0)
    }

    /// Lookups made in total
    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    /// Names looked up at least once, sorted
    pub fn requested_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.calls.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Highest number of lookups observed in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LatestVersionSource for StaticVersionSource {
    async fn latest_version(&self, package_name: &str) -> Result<String> {
        let attempt = {
            let mut calls = self.calls.lock();
            let count = calls.entry(package_name.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.answers.get(package_name) {
            Some(Answer::Version(v)) => Ok(v.clone()),
            Some(Answer::Flaky { failures, version }) if attempt > *failures => Ok(version.clone()),
            Some(Answer::Flaky { .. }) | Some(Answer::AlwaysTimeout) => {
                Err(Error::Timeout(package_name.to_string()))
            }
            Some(Answer::NotFound) | None => Err(Error::PackageNotFound(
                package_name.to_string(),
                "npm".to_string(),
            )),
        }
    }

    async fn ping(&self) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            Err(Error::Unreachable("static source marked unreachable".into()))
        } else {
            Ok(())
        }
    }
}

/// [`ProgressSink`] that records every notification as a string
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<String>>,
}

impl RecordingProgress {
    /// Empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Events in order: `begin:<total>:<label>`, `advance:<label>`, `end`
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn begin(&self, total: usize, label: &str) {
        self.events.lock().push(format!("begin:{}:{}", total, label));
    }

    fn advance(&self, label: &str) {
        self.events.lock().push(format!("advance:{}", label));
    }

    fn end(&self) {
        self.events.lock().push("end".to_string());
    }
}

//! Human-readable output

use colored::*;
use std::fmt::Write;
use unblock_deps::{
    AnalysisResult, BackupRecord, Category, ClassifiedDependency, PhaseKind, UpdatePlan,
    UpdateResult,
};

const NAME_WIDTH: usize = 28;

/// Analysis buckets with their members
pub fn render_analysis(result: &AnalysisResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{}", "Dependency Analysis".bold());
    let _ = writeln!(out, "===================\n");
    let _ = writeln!(
        out,
        "  {} installed packages, {} edges, {} top-level",
        result.stats.packages,
        result.stats.edges,
        result.top_level.len()
    );
    let _ = writeln!(
        out,
        "  {} registry lookups ({} top-level, {} blocker candidates)",
        result.stats.top_level_lookups + result.stats.blocker_lookups,
        result.stats.top_level_lookups,
        result.stats.blocker_lookups
    );

    section(&mut out, "Safe to upgrade", &result.safe, "✓".green());
    section(&mut out, "Major version jump", &result.major_jump, "⬆".yellow());
    section(&mut out, "Blocked", &result.blocked, "✗".red());

    if result.classified().next().is_none() {
        let _ = writeln!(out, "\n{}", "Everything is up to date.".green());
    }
    if !result.not_installed.is_empty() {
        let _ = writeln!(
            out,
            "\n{} declared but not installed: {}",
            "!".yellow(),
            result.not_installed.join(", ")
        );
    }
    if result.stats.unresolved > 0 {
        let _ = writeln!(
            out,
            "\n{} {} package(s) could not be resolved and were left out",
            "!".yellow(),
            result.stats.unresolved
        );
    }
    out
}

fn section(out: &mut String, title: &str, entries: &[ClassifiedDependency], marker: ColoredString) {
    if entries.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{} ({}):", title.bold(), entries.len());
    for dep in entries {
        let _ = write!(
            out,
            "  {} {:<width$} {} → {}",
            marker,
            dep.name(),
            dep.record.resolved_version,
            dep.latest.cyan(),
            width = NAME_WIDTH
        );
        if let Category::Blocked {
            blocker_name,
            blocker_range,
            blocker_count,
        } = &dep.category
        {
            let _ = write!(
                out,
                "  {}",
                format!("held back by {blocker_name} ({blocker_range})").bright_black()
            );
            if *blocker_count > 1 {
                let _ = write!(
                    out,
                    "{}",
                    format!(" and {} more", blocker_count - 1).bright_black()
                );
            }
        }
        let _ = writeln!(out);
    }
}

/// Phases, risks and the time estimate
pub fn render_plan(plan: &UpdatePlan) -> String {
    let mut out = String::new();
    if plan.is_empty() {
        let _ = writeln!(out, "{}", "Nothing to update.".green());
        return out;
    }

    let _ = writeln!(out, "\n{}", "Update Plan".bold());
    let _ = writeln!(out, "===========");
    for (index, phase) in plan.phases.iter().enumerate() {
        let title = match phase.kind {
            PhaseKind::Safe => "safe".green(),
            PhaseKind::Major => "major".yellow(),
            PhaseKind::Blocked => "blocked".red(),
        };
        let _ = writeln!(out, "\nPhase {}: {} ({})", index + 1, title, phase.packages.len());
        for update in &phase.packages {
            let dev = if update.is_dev { " (dev)" } else { "" };
            let _ = writeln!(
                out,
                "  {:<width$} {} → {}  {}{}",
                update.name,
                update.current_version,
                update.target_version.cyan(),
                update.update_type.to_string().bright_black(),
                dev.bright_black(),
                width = NAME_WIDTH
            );
        }
    }

    if !plan.risks.is_empty() {
        let _ = writeln!(out, "\n{}", "Risks:".bold());
        for risk in &plan.risks {
            let _ = writeln!(out, "  {} {}", "!".yellow(), risk);
        }
    }
    let _ = writeln!(
        out,
        "\nEstimated time: {}",
        format_duration(plan.estimated_duration.as_secs())
    );
    out
}

/// Outcome of an update run
pub fn render_update(result: &UpdateResult) -> String {
    let mut out = String::new();

    if result.dry_run {
        out.push_str(&render_plan(&result.plan));
        let _ = writeln!(out, "\n{}", "Dry run: nothing was installed.".bold());
    }

    for applied in &result.updated {
        let _ = writeln!(
            out,
            "  {} {} {} → {}",
            "✓".green(),
            applied.name,
            applied.from,
            applied.to.cyan()
        );
    }
    for failed in &result.failed {
        let _ = writeln!(out, "  {} {}: {}", "✗".red(), failed.name, failed.error);
    }
    if !result.blocked.is_empty() {
        let _ = writeln!(
            out,
            "  {} skipped (blocked): {}  use --force to install anyway",
            "-".bright_black(),
            result.blocked.join(", ")
        );
    }

    for warning in &result.warnings {
        let _ = writeln!(out, "{} {}", "warning:".yellow().bold(), warning);
    }
    for error in &result.errors {
        let _ = writeln!(out, "{} {}", "error:".red().bold(), error);
    }

    if let Some(path) = &result.backup_path {
        let _ = writeln!(out, "\nBackup: {}", path.display());
    }

    let summary = if result.success {
        format!(
            "{} updated, {} failed",
            result.updated.len(),
            result.failed.len()
        )
        .green()
    } else {
        format!(
            "{} updated, {} failed, {} error(s)",
            result.updated.len(),
            result.failed.len(),
            result.errors.len()
        )
        .red()
    };
    if !result.dry_run {
        let _ = writeln!(out, "\n{summary}");
        if !result.success && result.backup_path.is_some() {
            let _ = writeln!(out, "Run `unblock restore` to roll back.");
        }
    }
    out
}

/// Backups, newest first
pub fn render_backups(records: &[BackupRecord]) -> String {
    let mut out = String::new();
    if records.is_empty() {
        let _ = writeln!(out, "No backups.");
        return out;
    }
    for record in records {
        let files: Vec<&str> = record.files.iter().map(|f| f.name.as_str()).collect();
        let _ = writeln!(
            out,
            "{}  {}  {}",
            record.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            record.path.display(),
            files.join(", ").bright_black()
        );
    }
    let _ = writeln!(out, "\nTotal: {} backup(s)", records.len());
    out
}

pub(crate) fn format_duration(secs: u64) -> String {
    match (secs / 60, secs % 60) {
        (0, s) => format!("{s}s"),
        (m, 0) => format!("{m}m"),
        (m, s) => format!("{m}m {s}s"),
    }
}

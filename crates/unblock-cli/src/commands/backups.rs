//! `unblock restore` and `unblock backups`

use crate::cli::{BackupsCommand, RestoreArgs};
use crate::context::ProjectContext;
use crate::formatters::{human, print_json};
use anyhow::{anyhow, Context, Result};
use colored::*;
use serde_json::json;
use std::io::{self, Write};
use std::process::ExitCode;
use unblock_deps::BackupManager;
use unblock_fs::{FileSystem, NativeFileSystem};

fn manager(ctx: &ProjectContext) -> BackupManager<NativeFileSystem> {
    BackupManager::new(ctx.fs.clone(), &ctx.settings.update.backup_dir)
}

pub async fn execute(ctx: &ProjectContext, command: BackupsCommand) -> Result<ExitCode> {
    let backups = manager(ctx);
    match command {
        BackupsCommand::List => {
            let records = backups.list().await.context("Failed to list backups")?;
            if ctx.json {
                print_json(&records_json(&records))?;
            } else {
                print!("{}", human::render_backups(&records));
            }
        }
        BackupsCommand::Cleanup { keep } => {
            let keep = keep.unwrap_or(ctx.settings.update.keep_backups);
            let removed = backups.cleanup(keep).await.context("Failed to clean up backups")?;
            if ctx.json {
                print_json(&json!({ "kept": keep, "removed": removed }))?;
            } else if removed.is_empty() {
                println!("Nothing to remove ({} kept at most).", keep);
            } else {
                for path in &removed {
                    println!("  {} {}", "-".red(), path.display());
                }
                println!("✓ Removed {} backup(s)", removed.len());
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn records_json(records: &[unblock_deps::BackupRecord]) -> serde_json::Value {
    records
        .iter()
        .map(|record| {
            json!({
                "path": record.path,
                "createdAt": record.created_at,
                "files": record.files,
            })
        })
        .collect()
}

pub async fn restore(ctx: &ProjectContext, args: RestoreArgs) -> Result<ExitCode> {
    let backups = manager(ctx);
    let record = match &args.backup {
        Some(path) => backups
            .read_record(&ctx.fs.project_root().join(path))
            .await?,
        None => backups
            .latest()
            .await?
            .ok_or_else(|| anyhow!("No backups found in {}", backups.backup_root().display()))?,
    };

    let drifted = backups.detect_drift(&record).await?;
    if drifted.is_empty() {
        if ctx.json {
            print_json(&json!({ "restored": false, "path": record.path }))?;
        } else {
            println!("Project already matches {}", record.path.display());
        }
        return Ok(ExitCode::SUCCESS);
    }

    if !args.yes && !ctx.json {
        println!(
            "Restore {} from {}?",
            drifted.join(", "),
            record.path.display()
        );
        print!("\nContinue? [y/N] ");
        io::stdout().flush()?;

        let mut response = String::new();
        io::stdin().read_line(&mut response)?;
        if !response.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(ExitCode::SUCCESS);
        }
    }

    backups
        .restore(&record.path)
        .await
        .with_context(|| format!("Failed to restore {}", record.path.display()))?;

    if ctx.json {
        print_json(&json!({ "restored": true, "path": record.path, "files": drifted }))?;
    } else {
        println!("✓ Restored {} from {}", drifted.join(", "), record.path.display());
        println!("  Run `npm install` to sync node_modules with the restored lockfile.");
    }
    Ok(ExitCode::SUCCESS)
}

//! Command handlers

pub mod analyze;
pub mod backups;
pub mod config;
pub mod update;

use crate::cli::{Cli, Command};
use crate::context::ProjectContext;
use anyhow::Result;
use std::process::ExitCode;

/// Run the parsed command line
pub async fn run(cli: Cli) -> Result<ExitCode> {
    let Cli {
        project,
        config: config_path,
        json,
        quiet,
        command,
        ..
    } = cli;
    let config_path = config_path.as_deref();

    if let Command::Config { command } = command {
        return config::execute(&project, config_path, command, json).await;
    }

    let ctx = ProjectContext::open(&project, config_path, json, quiet).await?;
    match command {
        Command::Analyze(args) => analyze::analyze(&ctx, args).await,
        Command::Preview(args) => analyze::preview(&ctx, args).await,
        Command::Update(args) => update::execute(&ctx, args).await,
        Command::Restore(args) => backups::restore(&ctx, args).await,
        Command::Backups { command } => backups::execute(&ctx, command).await,
        Command::Config { .. } => Ok(ExitCode::SUCCESS),
    }
}

//! unblock - find out which npm dependencies are held back, and by what.

use clap::Parser;
use colored::*;
use std::process::ExitCode;
use unblock_cli::{cli::Cli, commands, hints, logger};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    logger::init_logger(cli.verbose, cli.quiet, cli.no_color);
    if cli.no_color {
        colored::control::set_override(false);
    }

    match commands::run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            if let Some(hint) = hints::hint_for(&e) {
                eprintln!("{} {}", "hint:".cyan().bold(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

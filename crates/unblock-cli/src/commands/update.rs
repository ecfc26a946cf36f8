//! `unblock update`

use crate::cli::UpdateArgs;
use crate::context::ProjectContext;
use crate::formatters::{human, print_json};
use anyhow::{Context, Result};
use std::process::ExitCode;
use unblock_deps::{TokioCommandRunner, UpdateOptions, Updater};

pub async fn execute(ctx: &ProjectContext, args: UpdateArgs) -> Result<ExitCode> {
    let analysis = ctx
        .analyze(args.production)
        .await
        .context("Dependency analysis failed")?;

    let options = UpdateOptions {
        dry_run: args.dry_run,
        backup: !args.no_backup,
        run_tests: args.test,
        include_dev: ctx.include_dev(args.production),
        safe_only: args.safe_only,
        force: args.force,
        keep_backups: Some(ctx.settings.update.keep_backups),
    };

    let unknown: Vec<&str> = args
        .packages
        .iter()
        .filter(|name| analysis.category_of(name).is_none())
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        tracing::warn!("no update available for: {}", unknown.join(", "));
    }

    let updater = Updater::new(ctx.fs.clone(), TokioCommandRunner, &ctx.settings.update);
    let result = updater
        .update(&analysis, &args.packages, &options)
        .await
        .context("Update failed")?;

    if ctx.json {
        print_json(&result)?;
    } else {
        print!("{}", human::render_update(&result));
    }

    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

//! `unblock analyze` and `unblock preview`

use crate::cli::{AnalyzeArgs, PreviewArgs};
use crate::context::ProjectContext;
use crate::formatters::{human, print_json};
use anyhow::{Context, Result};
use std::process::ExitCode;
use unblock_deps::{preview_update, PlanOptions};

pub async fn analyze(ctx: &ProjectContext, args: AnalyzeArgs) -> Result<ExitCode> {
    let result = ctx
        .analyze(args.production)
        .await
        .context("Dependency analysis failed")?;

    if ctx.json {
        print_json(&result)?;
    } else {
        print!("{}", human::render_analysis(&result));
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn preview(ctx: &ProjectContext, args: PreviewArgs) -> Result<ExitCode> {
    let result = ctx
        .analyze(args.production)
        .await
        .context("Dependency analysis failed")?;
    let plan = preview_update(
        &result,
        &PlanOptions {
            safe_only: args.safe_only,
            include_dev: ctx.include_dev(args.production),
        },
    );

    if ctx.json {
        print_json(&plan)?;
    } else {
        print!("{}", human::render_plan(&plan));
    }
    Ok(ExitCode::SUCCESS)
}

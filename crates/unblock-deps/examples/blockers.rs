//! Classify the dependencies of an npm project and print the update plan
//!
//! Run with: cargo run --package unblock-deps --example blockers -- path/to/project

use std::time::Duration;
use unblock_deps::{preview_update, Analyzer, PlanOptions, ProjectSnapshot};
use unblock_fs::NativeFileSystem;
use unblock_registry::{HttpClient, NpmRegistry, VersionCache, VersionResolver};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let project = std::env::args().nth(1).unwrap_or_else(|| ".".to_string());
    println!("=== unblock-deps: blockers in {} ===\n", project);

    let fs = NativeFileSystem::new(&project)?;
    let snapshot = ProjectSnapshot::load(&fs).await?;
    println!(
        "{} installed packages, {} top-level\n",
        snapshot.table.len(),
        snapshot.table.top_level().count()
    );

    let client = HttpClient::with_rate_limit(10, Duration::from_secs(30))?;
    let resolver = VersionResolver::new(NpmRegistry::new(client)?, VersionCache::default());
    let result = Analyzer::new(resolver).analyze(&snapshot, None).await?;

    for dep in &result.blocked {
        if let Some(blocker) = dep.category.blocker_name() {
            println!(
                "   {:<30} {} -> {} (held back by {})",
                dep.name(),
                dep.record.resolved_version,
                dep.latest,
                blocker
            );
        }
    }

    let plan = preview_update(&result, &PlanOptions::default());
    println!("\n{} updates in {} phases", plan.len(), plan.phases.len());
    for phase in &plan.phases {
        println!("\n[{}]", phase.kind);
        for update in &phase.packages {
            println!(
                "   {:<30} {} -> {} ({})",
                update.name, update.current_version, update.target_version, update.update_type
            );
        }
    }
    for risk in &plan.risks {
        println!("\n   ! {}", risk);
    }

    Ok(())
}

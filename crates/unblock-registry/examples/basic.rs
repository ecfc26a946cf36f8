//! Resolve the latest versions of a few packages
//!
//! Run with: cargo run --package unblock-registry --example basic

use std::time::Duration;
use unblock_registry::{HttpClient, NpmRegistry, VersionCache, VersionResolver};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== unblock-registry Basic Example ===\n");

    let client = HttpClient::with_rate_limit(5, Duration::from_secs(15))?;
    let registry = NpmRegistry::new(client)?;
    let mut resolver = VersionResolver::new(registry, VersionCache::default());

    let names: Vec<String> = ["react", "lodash", "@types/node", "this-package-does-not-exist-xyz"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let latest = resolver.resolve_all(&names, "example", None).await?;
    for (name, version) in &latest {
        println!("   {:<36} {}", name, version);
    }

    // Second pass is served from the cache
    let again = resolver.resolve_all(&names[..1], "cached", None).await?;
    println!("\n   cached react: {}", again["react"]);

    Ok(())
}

//! Latest-version resolution against the npm registry
//!
//! This crate answers one question for many packages: "what is the latest
//! published version of X?". It provides:
//!
//! - [`NpmRegistry`]: HTTP lookups of `dist-tags.latest`, rate limited with
//!   `governor`
//! - [`VersionCache`]: TTL cache owned by the resolver
//! - [`RetryPolicy`]: exponential backoff with jitter, skipping final errors
//! - [`VersionResolver`]: batched resolution with a bounded number of
//!   in-flight requests
//!
//! # Example
//!
//! ```no_run
//! use unblock_registry::{HttpClient, NpmRegistry, VersionCache, VersionResolver};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpClient::with_rate_limit(10, Duration::from_secs(30))?;
//!     let registry = NpmRegistry::new(client)?;
//!     let mut resolver = VersionResolver::new(registry, VersionCache::default());
//!
//!     let names = vec!["react".to_string(), "@types/node".to_string()];
//!     let latest = resolver.resolve_all(&names, "top-level", None).await?;
//!     for (name, version) in latest {
//!         println!("{name}: {version}");
//!     }
//!     Ok(())
//! }
//! ```

mod cache;
mod client;
mod error;
mod npm;
mod progress;
mod resolver;
mod retry;
mod source;
mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use cache::{VersionCache, DEFAULT_CACHE_TTL};
pub use client::{HttpClient, DEFAULT_TIMEOUT};
pub use error::{Error, Result};
pub use npm::{encode_package_name, NpmRegistry, NPM_REGISTRY_URL};
pub use progress::ProgressSink;
pub use resolver::{ResolverConfig, VersionResolver};
pub use retry::{retry, RetryPolicy};
pub use source::LatestVersionSource;
pub use types::LatestVersion;

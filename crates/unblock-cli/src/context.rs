//! Per-invocation state shared by the commands

use crate::progress::LookupProgress;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use unblock_config::{ConfigManager, Settings};
use unblock_deps::{AnalysisOptions, AnalysisResult, Analyzer, ProjectSnapshot};
use unblock_fs::{FileSystem, NativeFileSystem};
use unblock_registry::{
    HttpClient, NpmRegistry, ProgressSink, ResolverConfig, RetryPolicy, VersionCache,
    VersionResolver,
};

/// An opened project with its settings
pub struct ProjectContext {
    /// Filesystem scoped to the project root
    pub fs: Arc<NativeFileSystem>,
    /// Effective settings
    pub settings: Settings,
    /// Where the settings came from (or would be written)
    pub config_path: PathBuf,
    /// Emit JSON on stdout
    pub json: bool,
    /// Suppress progress output
    pub quiet: bool,
}

impl ProjectContext {
    /// Open `root`, loading `config` (or `unblock.toml` when present)
    pub async fn open(root: &Path, config: Option<&Path>, json: bool, quiet: bool) -> Result<Self> {
        let fs = Arc::new(
            NativeFileSystem::new(root)
                .with_context(|| format!("Cannot open project at {}", root.display()))?,
        );

        let manager = match config {
            Some(path) => {
                ConfigManager::load_from(fs.clone(), &fs.project_root().join(path)).await?
            }
            None => ConfigManager::load_for_project(fs.clone()).await?,
        };
        let config_path = manager.config_path().to_path_buf();
        let settings = manager.into_settings();
        tracing::debug!(config = %config_path.display(), "settings loaded");

        Ok(Self {
            fs,
            settings,
            config_path,
            json,
            quiet,
        })
    }

    /// Resolver configured from `[registry]`
    pub fn resolver(&self) -> Result<VersionResolver<NpmRegistry>> {
        let registry = &self.settings.registry;
        let timeout = Duration::from_secs(registry.timeout_secs);

        let client = HttpClient::with_rate_limit(registry.requests_per_second, timeout)
            .context("Failed to create HTTP client")?;
        let source = NpmRegistry::with_base_url(client, &registry.url)
            .with_context(|| format!("Invalid registry URL '{}'", registry.url))?;

        let config = ResolverConfig {
            retry: RetryPolicy {
                max_retries: registry.max_retries,
                ..RetryPolicy::default()
            },
            request_timeout: timeout,
            max_concurrency: registry.max_concurrency,
            ..ResolverConfig::default()
        };
        let cache = VersionCache::new(Duration::from_secs(registry.cache_ttl_secs));
        Ok(VersionResolver::with_config(source, cache, config))
    }

    /// Load the project files and run a full analysis
    pub async fn analyze(&self, production: bool) -> Result<AnalysisResult> {
        let snapshot = ProjectSnapshot::load(self.fs.as_ref()).await?;
        let options = AnalysisOptions {
            include_dev: self.include_dev(production),
        };
        let mut analyzer = Analyzer::with_options(self.resolver()?, options);

        let progress = LookupProgress::new();
        let sink: Option<&dyn ProgressSink> = if self.json || self.quiet {
            None
        } else {
            Some(&progress)
        };
        Ok(analyzer.analyze(&snapshot, sink).await?)
    }

    /// Whether dev dependencies take part, given `--production`
    pub fn include_dev(&self, production: bool) -> bool {
        !production && self.settings.analysis.include_dev
    }
}

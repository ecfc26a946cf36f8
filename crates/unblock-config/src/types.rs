use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete settings for one project.
///
/// Every field has a default, so an empty or partial `unblock.toml` is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Registry lookups
    pub registry: RegistrySettings,

    /// Update workflow
    pub update: UpdateSettings,

    /// Classification
    pub analysis: AnalysisSettings,
}

/// Registry client settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RegistrySettings {
    /// Registry base URL
    pub url: String,

    /// Client-side rate limit
    pub requests_per_second: u32,

    /// Timeout for one lookup attempt
    pub timeout_secs: u64,

    /// Retries after the first failed attempt
    pub max_retries: u32,

    /// How long a resolved version stays cached
    pub cache_ttl_secs: u64,

    /// Upper bound on concurrent lookups
    pub max_concurrency: usize,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            url: "https://registry.npmjs.org".to_string(),
            requests_per_second: 10,
            timeout_secs: 30,
            max_retries: 3,
            cache_ttl_secs: 60 * 60,
            max_concurrency: 8,
        }
    }
}

/// Update workflow settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct UpdateSettings {
    /// Package manager binary used to install updates
    pub package_manager: String,

    /// Command run for pre/post update tests (program followed by args)
    pub test_command: Vec<String>,

    /// Timeout for one package install
    pub install_timeout_secs: u64,

    /// Timeout for one test run
    pub test_timeout_secs: u64,

    /// Backup directory, relative to the project root
    pub backup_dir: PathBuf,

    /// Backups kept after a successful update
    pub keep_backups: usize,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            package_manager: "npm".to_string(),
            test_command: vec!["npm".to_string(), "test".to_string()],
            install_timeout_secs: 5 * 60,
            test_timeout_secs: 10 * 60,
            backup_dir: PathBuf::from(".unblock").join("backups"),
            keep_backups: 5,
        }
    }
}

/// Classification settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisSettings {
    /// Whether devDependencies are considered top-level dependencies
    pub include_dev: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self { include_dev: true }
    }
}

impl Settings {
    /// Reject values that would make the tool misbehave rather than fail.
    ///
    /// Returns a description of the first offending field.
    pub fn validate(&self) -> Result<(), String> {
        if self.registry.url.trim().is_empty() {
            return Err("registry.url must not be empty".to_string());
        }
        if self.registry.requests_per_second == 0 {
            return Err("registry.requests_per_second must be at least 1".to_string());
        }
        if self.registry.timeout_secs == 0 {
            return Err("registry.timeout_secs must be at least 1".to_string());
        }
        if self.registry.max_concurrency == 0 {
            return Err("registry.max_concurrency must be at least 1".to_string());
        }
        if self.update.package_manager.trim().is_empty() {
            return Err("update.package_manager must not be empty".to_string());
        }
        if self.update.backup_dir.is_absolute()
            || self
                .update
                .backup_dir
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err("update.backup_dir must be a relative path inside the project".to_string());
        }
        if self.update.keep_backups == 0 {
            return Err("update.keep_backups must be at least 1".to_string());
        }
        Ok(())
    }
}

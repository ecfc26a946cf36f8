//! Project settings for unblock, read from `unblock.toml`.

pub mod manager;
pub mod types;

pub use manager::{ConfigError, ConfigManager, CONFIG_FILE_NAME};
pub use types::{AnalysisSettings, RegistrySettings, Settings, UpdateSettings};

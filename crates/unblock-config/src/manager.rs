use crate::types::Settings;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use unblock_fs::FileSystem;

/// Settings file looked up in the project root
pub const CONFIG_FILE_NAME: &str = "unblock.toml";

/// Errors that can occur during config management
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Invalid TOML in {path}: {source}")]
    TomlDe {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid settings in {path}: {message}")]
    Invalid { path: PathBuf, message: String },

    #[error("Config file not found at {0}")]
    ConfigNotFound(PathBuf),
}

/// Loads and saves project settings.
///
/// A missing `unblock.toml` is not an error: defaults apply.
pub struct ConfigManager<F: FileSystem> {
    fs: Arc<F>,
    config_path: PathBuf,
    settings: Settings,
}

impl<F: FileSystem> ConfigManager<F> {
    /// Load `unblock.toml` from the filesystem's project root, falling back
    /// to defaults when the file does not exist.
    pub async fn load_for_project(fs: Arc<F>) -> Result<Self, ConfigError> {
        let path = fs.project_root().join(CONFIG_FILE_NAME);
        let exists = fs.exists(&path).await.map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;

        if !exists {
            return Ok(Self {
                fs,
                config_path: path,
                settings: Settings::default(),
            });
        }

        Self::load_from(fs, &path).await
    }

    /// Load settings from an explicit path; the file must exist.
    pub async fn load_from(fs: Arc<F>, path: &Path) -> Result<Self, ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if !fs.exists(path).await.map_err(io_error)? {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let contents = fs.read_to_string(path).await.map_err(io_error)?;
        let settings = parse_settings(path, &contents)?;

        Ok(Self {
            fs,
            config_path: path.to_path_buf(),
            settings,
        })
    }

    /// Write a default `unblock.toml` into the project root
    pub async fn init(fs: Arc<F>) -> Result<Self, ConfigError> {
        let manager = Self {
            config_path: fs.project_root().join(CONFIG_FILE_NAME),
            fs,
            settings: Settings::default(),
        };
        manager.save().await?;
        Ok(manager)
    }

    /// Save settings to disk atomically
    ///
    /// Uses a temporary file and atomic rename to prevent corruption
    pub async fn save(&self) -> Result<(), ConfigError> {
        let toml_str = toml::to_string_pretty(&self.settings)?;
        let temp_path = self.config_path.with_extension("toml.tmp");
        let io_error = |source| ConfigError::Io {
            path: self.config_path.clone(),
            source,
        };

        self.fs.write(&temp_path, &toml_str).await.map_err(io_error)?;
        self.fs
            .rename(&temp_path, &self.config_path)
            .await
            .map_err(io_error)?;

        Ok(())
    }

    /// Loaded settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Mutable settings (caller must call save() to persist)
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Consume the manager, keeping only the settings
    pub fn into_settings(self) -> Settings {
        self.settings
    }

    /// Path the settings were (or would be) read from
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

fn parse_settings(path: &Path, contents: &str) -> Result<Settings, ConfigError> {
    let settings: Settings = toml::from_str(contents).map_err(|source| ConfigError::TomlDe {
        path: path.to_path_buf(),
        source,
    })?;

    settings.validate().map_err(|message| ConfigError::Invalid {
        path: path.to_path_buf(),
        message,
    })?;

    Ok(settings)
}

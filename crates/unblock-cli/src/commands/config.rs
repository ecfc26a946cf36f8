//! `unblock config`

use crate::cli::ConfigCommand;
use crate::formatters::print_json;
use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use unblock_config::{ConfigManager, CONFIG_FILE_NAME};
use unblock_fs::{FileSystem, NativeFileSystem};

pub async fn execute(
    project: &Path,
    config: Option<&Path>,
    command: ConfigCommand,
    json: bool,
) -> Result<ExitCode> {
    let fs = Arc::new(
        NativeFileSystem::new(project)
            .with_context(|| format!("Cannot open project at {}", project.display()))?,
    );
    let config_path = fs
        .project_root()
        .join(config.unwrap_or(Path::new(CONFIG_FILE_NAME)));

    match command {
        ConfigCommand::Init => init_config(fs, &config_path).await,
        ConfigCommand::Show => show_config(fs, config, json).await,
        ConfigCommand::Path => {
            if json {
                print_json(&json!({ "path": config_path }))?;
            } else {
                println!("{}", config_path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        ConfigCommand::Validate => validate_config(fs, &config_path).await,
    }
}

async fn init_config(fs: Arc<NativeFileSystem>, config_path: &Path) -> Result<ExitCode> {
    if fs.exists(config_path).await? {
        println!("Config already exists at: {}", config_path.display());
        println!("To reinitialize, please delete the existing config first.");
        return Ok(ExitCode::SUCCESS);
    }

    let manager = ConfigManager::init(fs).await?;
    println!("✓ Initialized config at: {}", manager.config_path().display());
    Ok(ExitCode::SUCCESS)
}

async fn show_config(
    fs: Arc<NativeFileSystem>,
    config: Option<&Path>,
    json: bool,
) -> Result<ExitCode> {
    let manager = match config {
        Some(path) => ConfigManager::load_from(fs.clone(), &fs.project_root().join(path)).await?,
        None => ConfigManager::load_for_project(fs).await?,
    };

    if json {
        print_json(manager.settings())?;
    } else {
        let text = toml::to_string_pretty(manager.settings()).context("Failed to render settings")?;
        println!("# {}", manager.config_path().display());
        print!("{}", text);
    }
    Ok(ExitCode::SUCCESS)
}

async fn validate_config(fs: Arc<NativeFileSystem>, config_path: &Path) -> Result<ExitCode> {
    let manager = ConfigManager::load_from(fs, config_path)
        .await
        .context("Config not found or invalid. Run 'unblock config init' first.")?;

    let settings = manager.settings();
    println!("✓ Config is valid");
    println!("  Registry: {}", settings.registry.url);
    println!("  Package manager: {}", settings.update.package_manager);
    println!("  Test command: {}", settings.update.test_command.join(" "));
    println!("  Keep backups: {}", settings.update.keep_backups);
    Ok(ExitCode::SUCCESS)
}

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

use super::AppConfig;

const APP_NAME: &str = "ContextCreator";
const CONFIG_FILE: &str = "settings.json";

/// Returns the platform-specific configuration directory for the application.
pub fn get_config_directory() -> Option<PathBuf> {
    ProjectDirs::from("com", "contextcreator", APP_NAME)
        .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
}

/// Returns the full path to the settings file.
pub fn get_config_file_path() -> Option<PathBuf> {
    get_config_directory().map(|dir| dir.join(CONFIG_FILE))
}

fn resolve_path(path_override: Option<&Path>) -> Result<PathBuf> {
    match path_override {
        Some(path) => Ok(path.to_path_buf()),
        None => get_config_file_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory")),
    }
}

/// Loads the application settings, from `path_override` if given.
///
/// If the file doesn't exist, a default one is written. If the file cannot be parsed,
/// a warning is logged and the defaults are used instead.
pub fn load_config(path_override: Option<&Path>) -> Result<AppConfig> {
    let config_path = resolve_path(path_override)?;

    if !config_path.exists() {
        tracing::info!(
            "Settings file not found, creating default settings at {:?}",
            config_path
        );
        let default_config = AppConfig::default();
        save_config(&default_config, Some(&config_path))?;
        return Ok(default_config);
    }

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read settings from {:?}", config_path))?;

    match serde_json::from_str::<AppConfig>(&config_content) {
        Ok(config) => {
            tracing::info!("Loaded settings from {:?}", config_path);
            Ok(config)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to parse settings file at {:?}: {}. Falling back to default settings.",
                config_path,
                e
            );
            Ok(AppConfig::default())
        }
    }
}

/// Saves the settings, to `path_override` if given, creating the directory if needed.
pub fn save_config(config: &AppConfig, path_override: Option<&Path>) -> Result<()> {
    let config_path = resolve_path(path_override)?;

    if let Some(config_dir) = config_path.parent() {
        if !config_dir.as_os_str().is_empty() && !config_dir.exists() {
            fs::create_dir_all(config_dir)
                .with_context(|| format!("Failed to create {:?}", config_dir))?;
            tracing::info!("Created config directory: {:?}", config_dir);
        }
    }

    let config_json = serde_json::to_string_pretty(config)?;
    fs::write(&config_path, config_json)
        .with_context(|| format!("Failed to write settings to {:?}", config_path))?;
    tracing::debug!("Saved settings to {:?}", config_path);

    Ok(())
}

// Platform-specific configuration paths for reference:
// macOS:   ~/Library/Application Support/com.contextcreator.ContextCreator/
// Linux:   ~/.config/contextcreator/
// Windows: %APPDATA%/contextcreator/ContextCreator/config/

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ExportFormat;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_creates_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/settings.json");

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_round_trip_through_override() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        let mut config = AppConfig {
            default_export_format: ExportFormat::Plain,
            ..Default::default()
        };
        config.add_recent_configuration(Path::new("/work/backend.ctx"));

        save_config(&config, Some(&path)).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), config);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        fs::write(&path, "{ this is not json").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config, AppConfig::default());
    }
}

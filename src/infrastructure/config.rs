//! Configuration file management.
//!
//! Handles loading and saving TOML configuration files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{AppConfig, AppError, Result};

/// Default configuration file content.
const DEFAULT_CONFIG: &str = r#"# Multi-Chronometer Configuration
# Auto-generated - edit as needed

[autosave]
# Seconds between snapshots of running chronometers (default: 5)
interval_secs = 5

[host]
# Milliseconds to wait for the note document before falling back to local storage
init_timeout_ms = 3000

# Milliseconds between checks for edits made by other writers
poll_interval_ms = 1000

# Note document path (optional, defaults to <data_dir>/note.json)
# document_path = "/path/to/note.json"

[display]
# Live display refresh in milliseconds
refresh_ms = 10

[paths]
# Custom data directory (optional, defaults to ~/.multi-chronometer)
# data_dir = "/custom/path"
"#;

/// Load configuration from file or fall back to defaults.
///
/// # Errors
/// Returns error if file exists but cannot be read or parsed.
pub fn load_config() -> Result<AppConfig> {
    let config_path = config_file_path();

    if config_path.exists() {
        load_config_from_file(&config_path)
    } else {
        Ok(AppConfig::default())
    }
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file: {e}"),
    })
}

/// Save configuration to the default config file.
///
/// # Errors
/// Returns error if file cannot be written.
pub fn save_config(config: &AppConfig) -> Result<()> {
    save_config_at(config, &config_file_path())
}

fn save_config_at(config: &AppConfig, config_path: &Path) -> Result<()> {
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io("Failed to create config directory", e))?;
    }

    let content = toml::to_string_pretty(config).map_err(|e| AppError::Config {
        message: format!("Failed to serialize config: {e}"),
    })?;

    fs::write(config_path, content).map_err(|e| {
        AppError::io(
            format!("Failed to write config file: {}", config_path.display()),
            e,
        )
    })?;

    tracing::info!(path = %config_path.display(), "Configuration saved");

    Ok(())
}

/// Create default configuration file if it doesn't exist.
///
/// # Errors
/// Returns error if file cannot be created.
pub fn ensure_config_exists() -> Result<()> {
    ensure_config_at(&config_file_path())
}

fn ensure_config_at(config_path: &Path) -> Result<()> {
    if !config_path.exists() {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create config directory", e))?;
        }

        fs::write(config_path, DEFAULT_CONFIG)
            .map_err(|e| AppError::io("Failed to create default config", e))?;

        tracing::info!(path = %config_path.display(), "Created default configuration");
    }

    Ok(())
}

/// Get the path to the configuration file.
#[must_use]
pub fn config_file_path() -> PathBuf {
    AppConfig::default_data_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_parses() {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.autosave.interval_secs, 5);
        assert_eq!(config.host.init_timeout_ms, 3000);
        assert_eq!(config.host.poll_interval_ms, 1000);
        assert_eq!(config.display.refresh_ms, 10);
        assert!(config.host.document_path.is_none());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: AppConfig = toml::from_str("[autosave]\ninterval_secs = 30\n").unwrap();
        assert_eq!(config.autosave.interval_secs, 30);
        assert_eq!(config.host.init_timeout_ms, 3000);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let mut config = AppConfig::default();
        config.paths.data_dir = Some(dir.path().to_path_buf());
        config.autosave.interval_secs = 9;

        let path = dir.path().join("config.toml");
        save_config_at(&config, &path).unwrap();
        let loaded = load_config_from_file(&path).unwrap();

        assert_eq!(loaded.autosave.interval_secs, 9);
        assert_eq!(loaded.paths.data_dir, config.paths.data_dir);
    }

    #[test]
    fn test_ensure_config_writes_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");

        ensure_config_at(&path).unwrap();
        fs::write(&path, "[autosave]\ninterval_secs = 7\n").unwrap();
        ensure_config_at(&path).unwrap();

        let loaded = load_config_from_file(&path).unwrap();
        assert_eq!(loaded.autosave.interval_secs, 7);
    }
}

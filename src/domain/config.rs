//! Application configuration.
//!
//! Every field has a default so a partial or missing `config.toml` still
//! yields a usable configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Periodic autosave while chronometers run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutosaveConfig {
    /// Interval between autosave snapshots in seconds.
    #[serde(default = "default_autosave_interval")]
    pub interval_secs: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_autosave_interval(),
        }
    }
}

const fn default_autosave_interval() -> u64 {
    5
}

/// Host note document connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// How long to wait for the host to initialize before going standalone.
    #[serde(default = "default_init_timeout")]
    pub init_timeout_ms: u64,

    /// How often the watch session checks the host for external edits.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Note document path (defaults to `<data_dir>/note.json`).
    #[serde(default)]
    pub document_path: Option<PathBuf>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            init_timeout_ms: default_init_timeout(),
            poll_interval_ms: default_poll_interval(),
            document_path: None,
        }
    }
}

const fn default_init_timeout() -> u64 {
    3000
}

const fn default_poll_interval() -> u64 {
    1000
}

/// Live display refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Display tick in milliseconds while a chronometer runs.
    #[serde(default = "default_refresh")]
    pub refresh_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh_ms: default_refresh(),
        }
    }
}

const fn default_refresh() -> u64 {
    10
}

/// Path configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    /// Base data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub autosave: AutosaveConfig,

    #[serde(default)]
    pub host: HostConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub paths: PathConfig,
}

impl AppConfig {
    /// Get the data directory, using default if not configured.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.paths
            .data_dir
            .clone()
            .unwrap_or_else(Self::default_data_dir)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".multi-chronometer")
    }

    /// Host note document path.
    #[must_use]
    pub fn document_path(&self) -> PathBuf {
        self.host
            .document_path
            .clone()
            .unwrap_or_else(|| self.data_dir().join("note.json"))
    }

    /// Local fallback store database path.
    #[must_use]
    pub fn local_store_path(&self) -> PathBuf {
        self.data_dir().join("local-storage.db")
    }

    #[must_use]
    pub const fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave.interval_secs)
    }

    #[must_use]
    pub const fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.host.init_timeout_ms)
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.host.poll_interval_ms)
    }

    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.display.refresh_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.autosave.interval_secs, 5);
        assert_eq!(config.host.init_timeout_ms, 3000);
        assert_eq!(config.display.refresh_ms, 10);
        assert_eq!(config.autosave_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_paths_follow_data_dir() {
        let config = AppConfig {
            paths: PathConfig {
                data_dir: Some(PathBuf::from("/tmp/chrono")),
            },
            ..AppConfig::default()
        };
        assert_eq!(config.document_path(), PathBuf::from("/tmp/chrono/note.json"));
        assert_eq!(
            config.local_store_path(),
            PathBuf::from("/tmp/chrono/local-storage.db")
        );
    }

    #[test]
    fn test_explicit_document_path_wins() {
        let mut config = AppConfig::default();
        config.host.document_path = Some(PathBuf::from("/notes/timers.json"));
        assert_eq!(config.document_path(), PathBuf::from("/notes/timers.json"));
    }
}

//! # Application Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Command line flags (highest priority)                              │
//! │     --db PATH, --device PATH, --out DIR                                │
//! │                                                                         │
//! │  2. Environment Variables                                              │
//! │     TALLY_DB_PATH=/var/lib/tally/tally.db                              │
//! │     TALLY_EXPORT_DIR=/srv/exports                                      │
//! │     TALLY_CAPTURE_DEVICES=/dev/hidraw0,/dev/ttyACM0                    │
//! │     TALLY_BELL=false                                                   │
//! │                                                                         │
//! │  3. TOML Config File                                                   │
//! │     ~/.config/tally/tally.toml (Linux)                                 │
//! │     ~/Library/Application Support/com.tally.tally/tally.toml (macOS)   │
//! │                                                                         │
//! │  4. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [storage]
//! path = "/var/lib/tally/tally.db"
//!
//! [capture]
//! devices = ["/dev/hidraw0"]
//!
//! [export]
//! output_dir = "/srv/exports"
//!
//! [feedback]
//! bell = true
//! ```
//!
//! The batch header (date, store, discount) is not part of this file; it
//! lives in storage and is edited with `tally header`.

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const CONFIG_FILE_NAME: &str = "tally.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Platform directories for Tally's data and config files.
pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "tally", "tally")
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database file. Unset means the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Line-source scanner paths, in camera-toggle order. `-` is stdin.
    #[serde(default)]
    pub devices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// Ring the terminal bell on every recorded scan.
    #[serde(default = "default_true")]
    pub bell: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        FeedbackConfig { bell: true }
    }
}

// =============================================================================
// AppConfig
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub feedback: FeedbackConfig,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, else tally.toml in the config dir)
    /// 3. Environment variables
    ///
    /// An explicit `config_path` that does not exist is an error; a missing
    /// default file is not.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let explicit = config_path.is_some();
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else if explicit {
                return Err(ConfigError::Invalid(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.export.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("export.output_dir must not be empty".into()));
        }

        if self.export.output_dir.is_file() {
            return Err(ConfigError::Invalid(format!(
                "export.output_dir {} is a file",
                self.export.output_dir.display()
            )));
        }

        if let Some(path) = &self.storage.path {
            if path.is_dir() {
                return Err(ConfigError::Invalid(format!(
                    "storage.path {} is a directory",
                    path.display()
                )));
            }
        }

        if self.capture.devices.iter().any(|d| d.trim().is_empty()) {
            return Err(ConfigError::Invalid("capture.devices has an empty entry".into()));
        }

        Ok(())
    }

    /// Applies `TALLY_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("TALLY_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.storage.path = Some(PathBuf::from(path));
        }

        if let Some(dir) = lookup("TALLY_EXPORT_DIR") {
            debug!(dir = %dir, "Overriding export directory from environment");
            self.export.output_dir = PathBuf::from(dir);
        }

        if let Some(devices) = lookup("TALLY_CAPTURE_DEVICES") {
            self.capture.devices = devices
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(bell) = lookup("TALLY_BELL") {
            match bell.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.feedback.bell = true,
                "0" | "false" | "no" | "off" => self.feedback.bell = false,
                _ => warn!(value = %bell, "Unknown TALLY_BELL value in environment"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.storage.path, None);
        assert!(config.capture.devices.is_empty());
        assert_eq!(config.export.output_dir, PathBuf::from("."));
        assert!(config.feedback.bell);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [capture]
            devices = ["/dev/hidraw0", "/dev/ttyACM0"]
            "#,
        )
        .unwrap();

        assert_eq!(config.capture.devices, vec!["/dev/hidraw0", "/dev/ttyACM0"]);
        assert_eq!(config.export.output_dir, PathBuf::from("."));
        assert!(config.feedback.bell);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config.apply_overrides(env(&[
            ("TALLY_DB_PATH", "/tmp/t.db"),
            ("TALLY_EXPORT_DIR", "/tmp/out"),
            ("TALLY_CAPTURE_DEVICES", " /dev/a, ,/dev/b "),
            ("TALLY_BELL", "off"),
        ]));

        assert_eq!(config.storage.path, Some(PathBuf::from("/tmp/t.db")));
        assert_eq!(config.export.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.capture.devices, vec!["/dev/a", "/dev/b"]);
        assert!(!config.feedback.bell);
    }

    #[test]
    fn test_unknown_bell_value_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(env(&[("TALLY_BELL", "loud")]));
        assert!(config.feedback.bell);
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        config.export.output_dir = PathBuf::new();
        assert!(config.validate().is_err());

        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.storage.path = Some(dir.path().to_path_buf());
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.capture.devices = vec!["".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[feedback]\nbell = false\n").unwrap();

        let config = AppConfig::load(Some(path)).unwrap();
        if std::env::var_os("TALLY_BELL").is_none() {
            assert!(!config.feedback.bell);
        }
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(Some(dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        assert!(matches!(
            AppConfig::from_toml("[export]\noutput_dir = 5\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&AppConfig::default()).unwrap();
        assert!(toml_str.contains("[export]"));
        assert!(toml_str.contains("[feedback]"));
    }
}

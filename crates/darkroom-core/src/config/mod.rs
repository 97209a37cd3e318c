//! Configuration management for darkroom.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults; every section is optional in the file.

mod types;
mod validate;

pub use types::*;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Root configuration structure for darkroom.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worker pool settings
    pub engine: EngineConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.darkroom.darkroom/config.toml
    /// - Linux: ~/.config/darkroom/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\darkroom\config\config.toml
    ///
    /// Falls back to ~/.darkroom/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "darkroom", "darkroom")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".darkroom").join("config.toml")
            })
    }

    /// Get the resolved default output directory (with ~ expansion).
    ///
    /// `None` means outputs land alongside their source files.
    pub fn output_dir(&self) -> Option<PathBuf> {
        if self.output.directory.is_empty() {
            return None;
        }
        let expanded = shellexpand::tilde(&self.output.directory);
        Some(PathBuf::from(expanded.into_owned()))
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.engine.workers >= 1);
        assert!(config.engine.workers <= 4);
        assert_eq!(config.limits.max_file_size_mb, 100);
        assert_eq!(config.output.jpeg_quality, 95);
        assert_eq!(config.output.on_collision, "rename");
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[engine]"));
        assert!(toml.contains("[limits]"));
        assert!(toml.contains("[output]"));
        assert!(toml.contains("[logging]"));
    }

    #[test]
    fn test_empty_output_directory_means_alongside_source() {
        let config = Config::default();
        assert!(config.output_dir().is_none());

        let mut config = Config::default();
        config.output.directory = "/tmp/darkroom-out".to_string();
        assert_eq!(
            config.output_dir(),
            Some(PathBuf::from("/tmp/darkroom-out"))
        );
    }

    #[test]
    fn test_load_from_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[engine]\nworkers = 2\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.engine.workers, 2);
        // Unspecified sections fall back to defaults
        assert_eq!(config.limits.max_image_dimension, 10000);
    }

    #[test]
    fn test_load_from_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[output]\njpeg_quality = 150\n").unwrap();

        assert!(Config::load_from(&path).is_err());
    }
}

//! Configuration validation with range checks.

use crate::codec::CollisionPolicy;
use crate::error::ConfigError;
use crate::format::ImageKind;

use super::Config;

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.workers == 0 {
            return Err(ConfigError::ValidationError(
                "engine.workers must be > 0".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.output.jpeg_quality == 0 || self.output.jpeg_quality > 100 {
            return Err(ConfigError::ValidationError(
                "output.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        if CollisionPolicy::parse(&self.output.on_collision).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "output.on_collision must be one of overwrite, skip, rename (got '{}')",
                self.output.on_collision
            )));
        }
        if let Some(format) = &self.output.default_format {
            if ImageKind::parse(format).is_none() {
                return Err(ConfigError::ValidationError(format!(
                    "output.default_format '{}' is not a supported format",
                    format
                )));
            }
        }
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level '{}' is not a valid level",
                self.logging.level
            )));
        }
        if self.logging.format != "pretty" && self.logging.format != "json" {
            return Err(ConfigError::ValidationError(format!(
                "logging.format must be 'pretty' or 'json' (got '{}')",
                self.logging.format
            )));
        }
        Ok(())
    }
}

//! Sub-configuration structs with their default values.

use serde::{Deserialize, Serialize};

use crate::codec::CollisionPolicy;
use crate::format::ImageKind;

/// Worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of parallel workers
    pub workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

/// Pool size when not configured: one worker per core, capped at 4 so a
/// batch of large rasters cannot exhaust memory on wide machines.
fn default_workers() -> usize {
    num_cpus::get().clamp(1, 4)
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Decode timeout in milliseconds
    pub decode_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 10000,
            decode_timeout_ms: 5000,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output directory; empty means alongside the source file
    pub directory: String,

    /// Default output format; unset means keep the source format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_format: Option<String>,

    /// Behavior when the destination already exists: "overwrite", "skip"
    /// or "rename"
    pub on_collision: String,

    /// JPEG encoding quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: String::new(),
            default_format: None,
            on_collision: "rename".to_string(),
            jpeg_quality: 95,
        }
    }
}

impl OutputConfig {
    /// Typed collision policy. Validation guarantees the string parses; an
    /// unvalidated config falls back to the default.
    pub fn collision_policy(&self) -> CollisionPolicy {
        CollisionPolicy::parse(&self.on_collision).unwrap_or(CollisionPolicy::Rename)
    }

    /// Typed default output format, when one is configured.
    pub fn default_format_kind(&self) -> Option<ImageKind> {
        self.default_format.as_deref().and_then(ImageKind::parse)
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

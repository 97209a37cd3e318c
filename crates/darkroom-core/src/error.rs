//! Error types for the darkroom processing pipeline.
//!
//! Job-level errors are caught at the per-job boundary inside the engine and
//! recorded on the outcome; they never abort the batch. Only engine-level
//! errors (and configuration problems) surface to the caller directly.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for darkroom operations.
#[derive(Error, Debug)]
pub enum DarkroomError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Per-job processing errors
    #[error("Job error: {0}")]
    Job(#[from] JobError),

    /// Batch-fatal engine errors
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors that are fatal to a whole batch, as opposed to a single job.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The effective worker pool size resolved to zero
    #[error("Cannot run a batch with a worker pool of size 0")]
    NoWorkers,

    /// The engine stopped before the report was finalized
    #[error("Batch ended before the report was finalized")]
    Interrupted,
}

/// Per-job errors, one variant per failure class recorded on outcomes.
#[derive(Error, Debug)]
pub enum JobError {
    /// The file header is not a member of the supported format set
    #[error("Unsupported format for {path}: {detail}")]
    UnsupportedFormat { path: PathBuf, detail: String },

    /// A recognized container that fails to parse
    #[error("Corrupt file {path}: {message}")]
    CorruptFile { path: PathBuf, message: String },

    /// Declared image dimensions exceed the configured limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// File exceeds the configured size ceiling
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Read or write failure, missing source, permissions
    #[error("IO error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Stage parameters outside their valid range
    #[error("Invalid parameters for {stage} stage: {message}")]
    InvalidParameters { stage: &'static str, message: String },

    /// Watermark region exceeds the raster extents
    #[error(
        "Region out of bounds: {x},{y} {width}x{height} exceeds raster {raster_width}x{raster_height}"
    )]
    RegionOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        raster_width: u32,
        raster_height: u32,
    },

    /// Generic stage failure (decode timeout, fill with nothing to borrow from)
    #[error("Processing failed in {stage} stage: {message}")]
    Processing { stage: &'static str, message: String },
}

/// Serializable classification of a job failure, mirrored onto outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnsupportedFormat,
    CorruptFile,
    ImageTooLarge,
    FileTooLarge,
    Io,
    InvalidParameters,
    RegionOutOfBounds,
    Processing,
}

impl JobError {
    /// The failure class recorded on the job outcome.
    pub fn kind(&self) -> FailureKind {
        match self {
            JobError::UnsupportedFormat { .. } => FailureKind::UnsupportedFormat,
            JobError::CorruptFile { .. } => FailureKind::CorruptFile,
            JobError::ImageTooLarge { .. } => FailureKind::ImageTooLarge,
            JobError::FileTooLarge { .. } => FailureKind::FileTooLarge,
            JobError::Io { .. } => FailureKind::Io,
            JobError::InvalidParameters { .. } => FailureKind::InvalidParameters,
            JobError::RegionOutOfBounds { .. } => FailureKind::RegionOutOfBounds,
            JobError::Processing { .. } => FailureKind::Processing,
        }
    }
}

/// Convenience type alias for darkroom results.
pub type Result<T> = std::result::Result<T, DarkroomError>;

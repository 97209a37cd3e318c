//! Darkroom Core - Embeddable batch image-processing library.
//!
//! Darkroom runs independent image jobs through a bounded worker pool. A job
//! decodes its source file and applies an ordered chain of transform stages
//! (watermark removal, enhancement, format conversion) before encoding the
//! result. Failures stay contained inside their own job, and every submitted
//! job is accounted for exactly once in the final report.
//!
//! # Architecture
//!
//! ```text
//! JobDescriptor → [FIFO queue] → Worker: Decode → Stages → Encode → JobOutcome
//!                                               (× W workers)        ↓
//!                                                              BatchReport
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use darkroom_core::{Config, JobDescriptor, PipelineEngine};
//!
//! #[tokio::main]
//! async fn main() -> darkroom_core::Result<()> {
//!     let config = Config::load()?;
//!     let engine = PipelineEngine::new(&config)?;
//!
//!     let jobs = vec![JobDescriptor::new("./photo.png", "./out/photo.png")];
//!     let report = engine.submit(jobs).finish().await?;
//!     println!("{} succeeded", report.summary.succeeded);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod codec;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod format;
pub mod job;
pub mod output;
pub mod report;
pub mod stage;

// Re-exports for convenient access
pub use codec::{CollisionPolicy, ImageCodec, Raster};
pub use config::Config;
pub use engine::{BatchHandle, CancelHandle, PipelineEngine};
pub use error::{ConfigError, DarkroomError, EngineError, FailureKind, JobError, Result};
pub use format::ImageKind;
pub use job::{EncodeWarning, JobDescriptor, JobOutcome, JobStatus};
pub use output::{ReportFormat, ReportWriter};
pub use report::{BatchReport, BatchSummary};
pub use stage::{
    ConvertParams, EnhanceParams, Region, StageSpec, WatermarkParams, WatermarkRegion,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

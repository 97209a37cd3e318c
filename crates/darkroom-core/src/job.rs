//! Job descriptors and per-job outcomes.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FailureKind, JobError};
use crate::stage::StageSpec;

/// Immutable description of one unit of work: a source file, a destination,
/// and the ordered stages to apply between decode and encode.
///
/// An empty stage list is valid and degenerates to decode plus re-encode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// Source image path
    pub source: PathBuf,

    /// Destination path; the collision policy may redirect the final write
    pub dest: PathBuf,

    /// Stages applied left to right
    #[serde(default)]
    pub stages: Vec<StageSpec>,
}

impl JobDescriptor {
    /// Create a descriptor for a pure decode/re-encode pass.
    pub fn new(source: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
            stages: Vec::new(),
        }
    }

    /// Append a stage to the chain.
    pub fn with_stage(mut self, stage: StageSpec) -> Self {
        self.stages.push(stage);
        self
    }
}

/// Terminal status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Succeeded,
    Failed,
    Skipped,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Succeeded => write!(f, "succeeded"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Non-fatal downgrade applied during encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodeWarning {
    /// Alpha channel dropped for a format that cannot store it
    AlphaFlattened,
    /// 16-bit channels narrowed to 8-bit
    BitDepthNarrowed,
}

impl fmt::Display for EncodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeWarning::AlphaFlattened => {
                write!(f, "alpha channel flattened for the target format")
            }
            EncodeWarning::BitDepthNarrowed => write!(f, "16-bit channels narrowed to 8-bit"),
        }
    }
}

/// The recorded fate of one submitted job. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    /// Position in the submitted batch
    pub index: usize,

    /// The descriptor this outcome answers
    pub job: JobDescriptor,

    /// Terminal status
    pub status: JobStatus,

    /// Failure class, present iff status is `Failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,

    /// Human-readable failure or skip reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Non-fatal encode downgrades
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<EncodeWarning>,

    /// Path actually written; differs from `job.dest` under the rename policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written_to: Option<PathBuf>,

    /// Wall-clock time spent on the job in milliseconds
    pub elapsed_ms: u64,
}

impl JobOutcome {
    /// Record a successful job.
    pub fn succeeded(
        index: usize,
        job: JobDescriptor,
        written_to: PathBuf,
        warnings: Vec<EncodeWarning>,
        elapsed: Duration,
    ) -> Self {
        Self {
            index,
            job,
            status: JobStatus::Succeeded,
            failure: None,
            reason: None,
            warnings,
            written_to: Some(written_to),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    /// Record a failed job from its terminating error.
    pub fn failed(index: usize, job: JobDescriptor, error: &JobError, elapsed: Duration) -> Self {
        Self {
            index,
            job,
            status: JobStatus::Failed,
            failure: Some(error.kind()),
            reason: Some(error.to_string()),
            warnings: Vec::new(),
            written_to: None,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    /// Record a job that ended without running (cancellation, skip policy).
    pub fn skipped(index: usize, job: JobDescriptor, reason: impl Into<String>) -> Self {
        Self {
            index,
            job,
            status: JobStatus::Skipped,
            failure: None,
            reason: Some(reason.into()),
            warnings: Vec::new(),
            written_to: None,
            elapsed_ms: 0,
        }
    }

    /// Whether the job wrote an output file.
    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Succeeded
    }
}

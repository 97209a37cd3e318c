//! CLI enum types shared by the processing commands.

use clap::ValueEnum;
use darkroom_core::{CollisionPolicy, ImageKind, ReportFormat};

/// Report output formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ReportArg {
    /// Single JSON document with all outcomes and the summary
    Json,
    /// One JSON object per line, streamed as jobs finish, summary last
    Jsonl,
}

impl ReportArg {
    pub fn to_format(self) -> ReportFormat {
        match self {
            ReportArg::Json => ReportFormat::Json,
            ReportArg::Jsonl => ReportFormat::JsonLines,
        }
    }
}

/// Collision handling choices.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CollisionArg {
    /// Replace the existing file
    Overwrite,
    /// Leave the existing file alone and skip the job
    Skip,
    /// Write under a numbered name next to the existing file
    Rename,
}

impl CollisionArg {
    pub fn to_policy(self) -> CollisionPolicy {
        match self {
            CollisionArg::Overwrite => CollisionPolicy::Overwrite,
            CollisionArg::Skip => CollisionPolicy::Skip,
            CollisionArg::Rename => CollisionPolicy::Rename,
        }
    }
}

/// Target formats for conversion.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FormatArg {
    Png,
    Jpeg,
    Webp,
    Bmp,
    Tiff,
}

impl FormatArg {
    pub fn to_kind(self) -> ImageKind {
        match self {
            FormatArg::Png => ImageKind::Png,
            FormatArg::Jpeg => ImageKind::Jpeg,
            FormatArg::Webp => ImageKind::WebP,
            FormatArg::Bmp => ImageKind::Bmp,
            FormatArg::Tiff => ImageKind::Tiff,
        }
    }
}

impl std::fmt::Display for FormatArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_kind())
    }
}

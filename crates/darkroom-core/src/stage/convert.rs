//! Format conversion as a routing instruction.
//!
//! This stage never touches pixel data. It rewrites the raster's output
//! container hint, which the codec consumes at encode time.

use serde::{Deserialize, Serialize};

use crate::codec::Raster;
use crate::error::JobError;
use crate::format::ImageKind;

/// Parameters for the conversion stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertParams {
    /// Target container
    pub format: ImageKind,

    /// JPEG quality override for this conversion, 1..=100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jpeg_quality: Option<u8>,
}

impl ConvertParams {
    pub(crate) fn validate(&self) -> Result<(), JobError> {
        if let Some(quality) = self.jpeg_quality {
            if !(1..=100).contains(&quality) {
                return Err(JobError::InvalidParameters {
                    stage: "convert",
                    message: format!("jpeg_quality must be between 1 and 100, got {}", quality),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn apply(&self, mut raster: Raster) -> Result<Raster, JobError> {
        self.validate()?;
        raster.output_format = self.format;
        if let Some(quality) = self.jpeg_quality {
            raster.jpeg_quality = Some(quality);
        }
        Ok(raster)
    }
}

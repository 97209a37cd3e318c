//! Transform stages applied between decode and encode.
//!
//! Stages compose strictly left to right inside one job: the output raster of
//! stage *i* is the sole input of stage *i+1*. Every stage validates its
//! parameters before touching pixels and fails fast instead of clamping.

mod convert;
mod enhance;
mod watermark;

pub use convert::ConvertParams;
pub use enhance::EnhanceParams;
pub use watermark::{Region, WatermarkParams, WatermarkRegion};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::Raster;
use crate::error::JobError;

/// One transform in a job's stage chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageSpec {
    /// Reconstruct a watermark region from its surroundings
    RemoveWatermark(WatermarkParams),
    /// Rewrite the output container hint; pixels stay untouched
    Convert(ConvertParams),
    /// Brightness, contrast and sharpen adjustments
    Enhance(EnhanceParams),
}

impl StageSpec {
    /// Stable stage name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            StageSpec::RemoveWatermark(_) => "remove_watermark",
            StageSpec::Convert(_) => "convert",
            StageSpec::Enhance(_) => "enhance",
        }
    }

    /// Validate parameters and apply this transform to the raster.
    pub fn apply(&self, raster: Raster) -> Result<Raster, JobError> {
        debug!(stage = self.name(), "applying stage");
        match self {
            StageSpec::RemoveWatermark(params) => params.apply(raster),
            StageSpec::Convert(params) => params.apply(raster),
            StageSpec::Enhance(params) => params.apply(raster),
        }
    }
}

//! The `darkroom remove-watermark` command.

use clap::Args;
use darkroom_core::{Region, StageSpec, WatermarkParams, WatermarkRegion};

use super::batch::{self, BatchArgs};

/// Arguments for the `remove-watermark` command.
#[derive(Args, Debug)]
pub struct WatermarkArgs {
    #[command(flatten)]
    pub batch: BatchArgs,

    /// Watermark rectangle as X,Y,WIDTH,HEIGHT in pixels (omit to
    /// auto-detect the region)
    #[arg(long, value_parser = parse_region)]
    pub region: Option<Region>,

    /// Inpainting blend radius in pixels (1-20)
    #[arg(long, default_value = "3")]
    pub radius: u32,
}

/// Execute the remove-watermark command.
pub async fn execute(args: WatermarkArgs) -> anyhow::Result<()> {
    let config = batch::load_config(&args.batch)?;

    let region = match args.region {
        Some(rect) => WatermarkRegion::Rect(rect),
        None => WatermarkRegion::Auto,
    };
    let stage = StageSpec::RemoveWatermark(WatermarkParams {
        region,
        inpaint_radius: args.radius,
    });

    batch::run_batch(config, &args.batch, vec![stage]).await
}

/// Parse "x,y,width,height" into a region.
fn parse_region(raw: &str) -> Result<Region, String> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(format!(
            "expected X,Y,WIDTH,HEIGHT (four comma-separated numbers), got {raw:?}"
        ));
    }
    let mut numbers = [0u32; 4];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|_| format!("{part:?} is not a whole number"))?;
    }
    Ok(Region {
        x: numbers[0],
        y: numbers[1],
        width: numbers[2],
        height: numbers[3],
    })
}

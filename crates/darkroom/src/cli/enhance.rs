//! The `darkroom enhance` command.

use clap::Args;
use darkroom_core::{EnhanceParams, StageSpec};

use super::batch::{self, BatchArgs};

/// Arguments for the `enhance` command.
#[derive(Args, Debug)]
pub struct EnhanceArgs {
    #[command(flatten)]
    pub batch: BatchArgs,

    /// Brightness shift, -255 to 255
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub brightness: i32,

    /// Contrast multiplier, 0.0 to 4.0 (1.0 leaves the image unchanged)
    #[arg(long, default_value = "1.0")]
    pub contrast: f32,

    /// Unsharp-mask strength, 0.0 to 10.0
    #[arg(long, default_value = "0.0")]
    pub sharpen: f32,
}

/// Execute the enhance command.
pub async fn execute(args: EnhanceArgs) -> anyhow::Result<()> {
    let config = batch::load_config(&args.batch)?;

    let params = EnhanceParams {
        brightness: args.brightness,
        contrast: args.contrast,
        sharpen: args.sharpen,
    };
    // All-neutral parameters degrade to a plain decode/re-encode pass
    let stages = if params.is_identity() {
        Vec::new()
    } else {
        vec![StageSpec::Enhance(params)]
    };

    batch::run_batch(config, &args.batch, stages).await
}

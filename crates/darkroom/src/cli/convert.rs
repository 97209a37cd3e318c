//! The `darkroom convert` command.

use clap::Args;
use darkroom_core::{ConvertParams, StageSpec};

use super::batch::{self, BatchArgs};
use super::types::FormatArg;

/// Arguments for the `convert` command.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub batch: BatchArgs,

    /// Target format
    #[arg(long, value_enum)]
    pub to: FormatArg,

    /// JPEG quality override (1-100)
    #[arg(long)]
    pub quality: Option<u8>,
}

/// Execute the convert command.
pub async fn execute(args: ConvertArgs) -> anyhow::Result<()> {
    let config = batch::load_config(&args.batch)?;

    tracing::debug!("Converting to {}", args.to);
    let stage = StageSpec::Convert(ConvertParams {
        format: args.to.to_kind(),
        jpeg_quality: args.quality,
    });

    batch::run_batch(config, &args.batch, vec![stage]).await
}

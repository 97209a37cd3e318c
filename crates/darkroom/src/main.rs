//! Darkroom CLI - batch watermark removal, format conversion, and enhancement.
//!
//! Darkroom takes image files or directories as input and pushes every file
//! through a bounded worker pool. Each file runs as its own job, so one bad
//! file never takes down the batch, and the run ends with a per-file report.
//!
//! # Usage
//!
//! ```bash
//! # Remove an auto-detected watermark from every image in a directory
//! darkroom remove-watermark ./photos/ --output ./clean/
//!
//! # Remove a known watermark rectangle
//! darkroom remove-watermark photo.png --region 840,1020,180,60
//!
//! # Convert a directory to WebP
//! darkroom convert ./photos/ --to webp --recursive
//!
//! # Brighten and sharpen a single file
//! darkroom enhance portrait.jpg --brightness 20 --sharpen 1.5
//!
//! # View configuration
//! darkroom config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Darkroom - batch watermark removal, format conversion, and enhancement.
#[derive(Parser, Debug)]
#[command(name = "darkroom")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Remove a watermark region from images
    RemoveWatermark(cli::watermark::WatermarkArgs),

    /// Convert images to another format
    Convert(cli::convert::ConvertArgs),

    /// Adjust brightness, contrast, and sharpness
    Enhance(cli::enhance::EnhanceArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging from config, with CLI overrides.
    // Note: logging isn't initialized yet, so use eprintln for config warnings.
    let config = match darkroom_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `darkroom config path`."
            );
            darkroom_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Darkroom v{}", darkroom_core::VERSION);

    // Dispatch to the appropriate command handler
    match cli.command {
        Commands::RemoveWatermark(args) => cli::watermark::execute(args).await,
        Commands::Convert(args) => cli::convert::execute(args).await,
        Commands::Enhance(args) => cli::enhance::execute(args).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}

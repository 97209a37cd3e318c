//! Shared batch mechanics: job construction, engine driving, report output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use darkroom_core::{
    discovery, BatchSummary, Config, ConvertParams, ImageKind, JobDescriptor, JobStatus,
    PipelineEngine, ReportFormat, ReportWriter, StageSpec,
};

use super::types::{CollisionArg, ReportArg};

/// Arguments shared by every processing command.
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Image file or directory to process
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output directory (defaults to the configured directory, then to each
    /// source file's own directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Recurse into subdirectories when the input is a directory
    #[arg(short, long)]
    pub recursive: bool,

    /// Number of parallel workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// What to do when a destination file already exists
    #[arg(long, value_enum)]
    pub on_collision: Option<CollisionArg>,

    /// Write a machine-readable report to stdout
    #[arg(long, value_enum)]
    pub report: Option<ReportArg>,

    /// Write the report to a file instead of stdout
    #[arg(long, requires = "report")]
    pub report_file: Option<PathBuf>,
}

/// Load configuration and fold in the CLI overrides.
pub fn load_config(args: &BatchArgs) -> anyhow::Result<Config> {
    let mut config = Config::load()?;
    if let Some(workers) = args.workers {
        config.engine.workers = workers;
    }
    if let Some(policy) = args.on_collision {
        config.output.on_collision = policy.to_policy().to_string();
    }
    Ok(config)
}

/// Run one batch: discover sources, build jobs, drive the engine, report.
pub async fn run_batch(
    config: Config,
    args: &BatchArgs,
    stages: Vec<StageSpec>,
) -> anyhow::Result<()> {
    if !args.input.exists() {
        anyhow::bail!(
            "Input path does not exist: {:?}\n\n  Hint: Check the file path and try again.",
            args.input
        );
    }

    let sources = discovery::discover(&args.input, args.recursive);
    if sources.is_empty() {
        tracing::warn!("No supported image files found at {:?}", args.input);
        return Ok(());
    }
    tracing::info!("Found {} image(s) to process", sources.len());

    let stages = effective_stages(&config, stages);
    let jobs = build_jobs(&config, args, &sources, &stages);

    // Open the report sink up front so a bad --report-file path fails
    // before any work happens
    let mut report_sink = open_report_sink(args)?;

    let total = jobs.len() as u64;
    let progress = create_progress_bar(total);
    let start_time = Instant::now();
    let mut succeeded: u64 = 0;
    let mut failed: u64 = 0;

    let engine = PipelineEngine::new(&config)?;
    let mut handle = engine.submit(jobs);

    // Ctrl-C finishes in-flight jobs and skips the rest
    let canceller = handle.canceller();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received: finishing in-flight jobs, skipping the rest");
            canceller.cancel();
        }
    });

    while let Some(outcome) = handle.next_event().await {
        match outcome.status {
            JobStatus::Succeeded => succeeded += 1,
            JobStatus::Failed => {
                failed += 1;
                tracing::error!(
                    "Failed: {:?} - {}",
                    outcome.job.source,
                    outcome.reason.as_deref().unwrap_or("unknown error")
                );
            }
            JobStatus::Skipped => {}
        }
        for warning in &outcome.warnings {
            tracing::warn!("{:?}: {}", outcome.job.source, warning);
        }

        if let Some(sink) = &mut report_sink {
            if sink.streaming() {
                sink.writer.write_outcome(&outcome)?;
            }
        }

        // Update progress bar with rate
        progress.inc(1);
        let elapsed = start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            let rate = (succeeded + failed) as f64 / elapsed;
            progress.set_message(format!("{:.1} img/sec", rate));
        }
    }

    let report = handle.finish().await?;
    progress.finish_and_clear();

    if let Some(mut sink) = report_sink {
        match sink.format {
            ReportFormat::Json => sink.writer.write_report(&report)?,
            ReportFormat::JsonLines => sink.writer.write_summary(&report.summary)?,
        }
        sink.writer.flush()?;
        if let Some(path) = &args.report_file {
            tracing::info!("Report written to {:?}", path);
        }
    }

    print_summary(&report.summary);

    if report.summary.failed > 0 && report.summary.succeeded == 0 {
        anyhow::bail!(
            "{} of {} job(s) failed, nothing succeeded",
            report.summary.failed,
            report.summary.total
        );
    }
    Ok(())
}

/// Append a conversion to the configured default format when the chain has
/// no explicit conversion of its own.
fn effective_stages(config: &Config, mut stages: Vec<StageSpec>) -> Vec<StageSpec> {
    let has_convert = stages
        .iter()
        .any(|stage| matches!(stage, StageSpec::Convert(_)));
    if !has_convert {
        if let Some(format) = config.output.default_format_kind() {
            stages.push(StageSpec::Convert(ConvertParams {
                format,
                jpeg_quality: None,
            }));
        }
    }
    stages
}

/// Build one job per source file. Every job carries the same stage chain.
fn build_jobs(
    config: &Config,
    args: &BatchArgs,
    sources: &[PathBuf],
    stages: &[StageSpec],
) -> Vec<JobDescriptor> {
    let output_dir = args
        .output
        .as_deref()
        .map(expand_tilde)
        .or_else(|| config.output_dir());

    let target_format = stages.iter().rev().find_map(|stage| match stage {
        StageSpec::Convert(params) => Some(params.format),
        _ => None,
    });

    sources
        .iter()
        .map(|source| JobDescriptor {
            source: source.clone(),
            dest: derive_destination(source, output_dir.as_deref(), target_format),
            stages: stages.to_vec(),
        })
        .collect()
}

/// Destination path for one source: same file name, extension switched when
/// the chain converts to another format.
fn derive_destination(
    source: &Path,
    output_dir: Option<&Path>,
    target_format: Option<ImageKind>,
) -> PathBuf {
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| source.parent().map(Path::to_path_buf))
        .unwrap_or_default();

    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());

    let file_name = match target_format {
        Some(format) => format!("{stem}.{}", format.extension()),
        None => match source.extension() {
            Some(ext) => format!("{stem}.{}", ext.to_string_lossy()),
            None => stem,
        },
    };

    dir.join(file_name)
}

fn expand_tilde(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).into_owned())
}

/// Where a `--report` ends up, plus whether outcomes stream as they finish.
struct ReportSink {
    writer: ReportWriter<Box<dyn Write>>,
    format: ReportFormat,
}

impl ReportSink {
    fn streaming(&self) -> bool {
        self.format == ReportFormat::JsonLines
    }
}

fn open_report_sink(args: &BatchArgs) -> anyhow::Result<Option<ReportSink>> {
    let Some(arg) = args.report else {
        return Ok(None);
    };
    let format = arg.to_format();
    let (writer, pretty): (Box<dyn Write>, bool) = match &args.report_file {
        Some(path) => (Box::new(BufWriter::new(File::create(path)?)), false),
        None => (Box::new(std::io::stdout()), format == ReportFormat::Json),
    };
    Ok(Some(ReportSink {
        writer: ReportWriter::new(writer, format, pretty),
        format,
    }))
}

/// Create a progress bar for batch processing.
fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
            )
            .unwrap()
            .progress_chars("##-"),
    );
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary table after batch processing.
fn print_summary(summary: &BatchSummary) {
    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Succeeded:    {:>8}", summary.succeeded);
    if summary.failed > 0 {
        eprintln!("    Failed:       {:>8}", summary.failed);
    }
    if summary.skipped > 0 {
        eprintln!("    Skipped:      {:>8}", summary.skipped);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", summary.total);
    eprintln!("    Duration:     {:>7.1}s", summary.elapsed_ms as f64 / 1000.0);
    eprintln!("    Rate:         {:>7.1} img/sec", summary.jobs_per_second);
    eprintln!("    Peak workers: {:>8}", summary.peak_workers);
    eprintln!("  ====================================");
}

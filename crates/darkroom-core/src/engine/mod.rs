//! Bounded worker-pool engine driving jobs from submission to outcome.
//!
//! Workers pull from a shared FIFO queue, run one job to completion, and
//! report through an outcome channel. A failure terminates only its own job;
//! the rest of the batch is unaffected. The engine lives for one batch: its
//! tasks exit once the queue drains and the report is finalized.

mod handle;

pub use handle::{BatchHandle, CancelHandle};

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

use crate::codec::{plan_destination, CollisionPolicy, DestinationPlan, ImageCodec, Raster};
use crate::config::Config;
use crate::error::{EngineError, JobError};
use crate::job::{EncodeWarning, JobDescriptor, JobOutcome, JobStatus};
use crate::report::ReportBuilder;

/// Bounded worker pool executing submitted jobs.
pub struct PipelineEngine {
    workers: usize,
    collision: CollisionPolicy,
    codec: Arc<ImageCodec>,
}

impl PipelineEngine {
    /// Build an engine from configuration.
    pub fn new(config: &Config) -> Result<Self, EngineError> {
        let workers = config.engine.workers;
        if workers == 0 {
            return Err(EngineError::NoWorkers);
        }
        Ok(Self {
            workers,
            collision: config.output.collision_policy(),
            codec: Arc::new(ImageCodec::new(config)),
        })
    }

    /// Submit a batch of jobs.
    ///
    /// All descriptors are accepted immediately; concurrency is bounded by
    /// the worker count, not the queue depth. The returned handle streams
    /// per-job outcomes and resolves to the final report.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, jobs: Vec<JobDescriptor>) -> BatchHandle {
        let total = jobs.len();
        let (event_tx, event_rx) = mpsc::channel(total.max(1));
        let (report_tx, report_rx) = oneshot::channel();
        let cancelled = Arc::new(AtomicBool::new(false));

        if total == 0 {
            debug!("empty submission, finalizing immediately");
            let _ = report_tx.send(ReportBuilder::new(Vec::new()).finalize());
            drop(event_tx);
            return BatchHandle::new(event_rx, report_rx, cancelled);
        }

        let queue: Arc<Mutex<VecDeque<(usize, JobDescriptor)>>> =
            Arc::new(Mutex::new(jobs.iter().cloned().enumerate().collect()));
        let builder = ReportBuilder::new(jobs);

        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        // Capacity covers every job, so workers and the aggregator never
        // block on a slow consumer
        let (outcome_tx, mut outcome_rx) = mpsc::channel::<JobOutcome>(total);

        let workers = self.workers.min(total);
        info!(jobs = total, workers, "starting batch");

        for worker_id in 0..workers {
            let ctx = WorkerContext {
                queue: queue.clone(),
                codec: self.codec.clone(),
                collision: self.collision,
                cancelled: cancelled.clone(),
                in_flight: in_flight.clone(),
                peak: peak.clone(),
                outcomes: outcome_tx.clone(),
            };
            tokio::spawn(worker_loop(worker_id, ctx));
        }
        drop(outcome_tx);

        let peak_gauge = peak.clone();
        tokio::spawn(async move {
            let mut builder = builder;
            while let Some(outcome) = outcome_rx.recv().await {
                let _ = event_tx.send(outcome.clone()).await;
                builder.record(outcome);
            }
            builder.set_peak_workers(peak_gauge.load(Ordering::SeqCst));
            let _ = report_tx.send(builder.finalize());
        });

        BatchHandle::new(event_rx, report_rx, cancelled)
    }
}

struct WorkerContext {
    queue: Arc<Mutex<VecDeque<(usize, JobDescriptor)>>>,
    codec: Arc<ImageCodec>,
    collision: CollisionPolicy,
    cancelled: Arc<AtomicBool>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    outcomes: mpsc::Sender<JobOutcome>,
}

async fn worker_loop(worker_id: usize, ctx: WorkerContext) {
    loop {
        let next = { ctx.queue.lock().await.pop_front() };
        let Some((index, job)) = next else { break };

        // Cancellation skips queued jobs; a job past this point runs to
        // completion so no partially-written output is left behind
        if ctx.cancelled.load(Ordering::SeqCst) {
            let outcome =
                JobOutcome::skipped(index, job, "batch cancelled before this job started");
            if ctx.outcomes.send(outcome).await.is_err() {
                break;
            }
            continue;
        }

        let running = ctx.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        ctx.peak.fetch_max(running, Ordering::SeqCst);

        debug!(
            worker = worker_id,
            index,
            source = %job.source.display(),
            "job started"
        );
        let started = Instant::now();
        let outcome = run_job(&ctx, index, job, started).await;
        ctx.in_flight.fetch_sub(1, Ordering::SeqCst);

        match outcome.status {
            JobStatus::Succeeded => debug!(
                worker = worker_id,
                index,
                elapsed_ms = outcome.elapsed_ms,
                "job succeeded"
            ),
            JobStatus::Failed => warn!(
                worker = worker_id,
                index,
                reason = outcome.reason.as_deref().unwrap_or("unknown"),
                "job failed"
            ),
            JobStatus::Skipped => debug!(
                worker = worker_id,
                index,
                reason = outcome.reason.as_deref().unwrap_or(""),
                "job skipped"
            ),
        }

        if ctx.outcomes.send(outcome).await.is_err() {
            break;
        }
    }
}

enum JobEnd {
    Written {
        path: PathBuf,
        warnings: Vec<EncodeWarning>,
    },
    SkippedExisting,
}

async fn run_job(
    ctx: &WorkerContext,
    index: usize,
    job: JobDescriptor,
    started: Instant,
) -> JobOutcome {
    match execute(ctx, &job).await {
        Ok(JobEnd::Written { path, warnings }) => {
            JobOutcome::succeeded(index, job, path, warnings, started.elapsed())
        }
        Ok(JobEnd::SkippedExisting) => {
            let dest = job.dest.display().to_string();
            JobOutcome::skipped(index, job, format!("destination {} already exists", dest))
        }
        Err(error) => JobOutcome::failed(index, job, &error, started.elapsed()),
    }
}

/// Decode, run the stage chain, resolve the destination, encode.
/// The first error ends the job.
async fn execute(ctx: &WorkerContext, job: &JobDescriptor) -> Result<JobEnd, JobError> {
    let mut raster = ctx.codec.decode(&job.source).await?;

    if !job.stages.is_empty() {
        let stages = job.stages.clone();
        let stage_result = tokio::task::spawn_blocking(move || -> Result<Raster, JobError> {
            let mut raster = raster;
            for stage in &stages {
                raster = stage.apply(raster)?;
            }
            Ok(raster)
        })
        .await;

        raster = match stage_result {
            Ok(Ok(raster)) => raster,
            Ok(Err(e)) => return Err(e),
            Err(e) => {
                return Err(JobError::Processing {
                    stage: "stages",
                    message: format!("Task join error: {}", e),
                })
            }
        };
    }

    let dest = match plan_destination(&job.dest, ctx.collision) {
        DestinationPlan::Write(path) => path,
        DestinationPlan::SkipExisting => return Ok(JobEnd::SkippedExisting),
    };

    let warnings = ctx.codec.encode(raster, dest.clone()).await?;
    Ok(JobEnd::Written {
        path: dest,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    fn engine() -> PipelineEngine {
        PipelineEngine::new(&Config::default()).unwrap()
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = Config::default();
        config.engine.workers = 0;
        assert!(matches!(
            PipelineEngine::new(&config),
            Err(EngineError::NoWorkers)
        ));
    }

    #[tokio::test]
    async fn test_empty_submission_yields_empty_report() {
        let mut handle = engine().submit(Vec::new());
        assert!(handle.next_event().await.is_none());

        let report = handle.finish().await.unwrap();
        assert!(report.outcomes.is_empty());
        assert_eq!(report.summary.total, 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_cancel_before_start_skips_every_job() {
        // On a current-thread runtime no worker task runs until the first
        // await, so cancelling right after submit is race-free
        let jobs: Vec<JobDescriptor> = (0..4)
            .map(|i| JobDescriptor::new(format!("/no/such/in_{i}.png"), format!("out_{i}.png")))
            .collect();

        let handle = engine().submit(jobs);
        handle.cancel();

        let report = handle.finish().await.unwrap();
        assert_eq!(report.summary.total, 4);
        assert_eq!(report.summary.skipped, 4);
        for outcome in &report.outcomes {
            assert_eq!(outcome.status, JobStatus::Skipped);
            assert!(outcome.reason.as_deref().unwrap().contains("cancelled"));
        }
    }

    #[tokio::test]
    async fn test_missing_source_is_an_io_failure() {
        let jobs = vec![JobDescriptor::new("/no/such/missing.png", "/tmp/out.png")];
        let report = engine().submit(jobs).finish().await.unwrap();

        assert_eq!(report.summary.failed, 1);
        let outcome = &report.outcomes[0];
        assert_eq!(outcome.status, JobStatus::Failed);
        assert_eq!(outcome.failure, Some(FailureKind::Io));
        assert!(outcome.written_to.is_none());
    }

    #[tokio::test]
    async fn test_events_stream_one_per_job() {
        let jobs: Vec<JobDescriptor> = (0..3)
            .map(|i| JobDescriptor::new(format!("/no/such/{i}.png"), format!("out_{i}.png")))
            .collect();

        let mut handle = engine().submit(jobs);
        let mut seen = Vec::new();
        while let Some(outcome) = handle.next_event().await {
            seen.push(outcome.index);
        }
        assert_eq!(seen.len(), 3);

        let report = handle.finish().await.unwrap();
        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.failed, 3);
    }
}

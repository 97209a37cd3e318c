//! Caller's view of a running batch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::error::EngineError;
use crate::job::JobOutcome;
use crate::report::BatchReport;

/// Streams per-job outcomes as they complete and resolves to the final
/// report once every job reaches a terminal status.
pub struct BatchHandle {
    events: mpsc::Receiver<JobOutcome>,
    report: oneshot::Receiver<BatchReport>,
    cancelled: Arc<AtomicBool>,
}

/// Clonable cancellation trigger, detached from the event stream so a
/// signal handler can request cancellation while the handle drains events.
#[derive(Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Request cancellation of the batch.
    pub fn cancel(&self) {
        request_cancel(&self.cancelled);
    }
}

fn request_cancel(flag: &AtomicBool) {
    if !flag.swap(true, Ordering::SeqCst) {
        debug!("batch cancellation requested");
    }
}

impl BatchHandle {
    pub(crate) fn new(
        events: mpsc::Receiver<JobOutcome>,
        report: oneshot::Receiver<BatchReport>,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            events,
            report,
            cancelled,
        }
    }

    /// Next finished job, in completion order.
    ///
    /// Returns `None` once every job has reported. Events are buffered, so a
    /// slow consumer never stalls the workers.
    pub async fn next_event(&mut self) -> Option<JobOutcome> {
        self.events.recv().await
    }

    /// Request cancellation of the batch.
    ///
    /// Queued jobs are marked skipped and never dispatched; in-flight jobs
    /// run to completion so no partially-written output is left behind.
    pub fn cancel(&self) {
        request_cancel(&self.cancelled);
    }

    /// A detached trigger for cancelling from another task.
    pub fn canceller(&self) -> CancelHandle {
        CancelHandle {
            cancelled: self.cancelled.clone(),
        }
    }

    /// Wait for the batch to finish and take the report.
    pub async fn finish(self) -> Result<BatchReport, EngineError> {
        let BatchHandle { events, report, .. } = self;
        drop(events);
        report.await.map_err(|_| EngineError::Interrupted)
    }
}

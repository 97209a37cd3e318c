//! Batch reports: every submitted job accounted for exactly once.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::JobError;
use crate::job::{JobDescriptor, JobOutcome, JobStatus};

/// Summary counts for a finished batch.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BatchSummary {
    /// Jobs that produced an output file
    pub succeeded: usize,

    /// Jobs that failed
    pub failed: usize,

    /// Jobs ended by cancellation or the skip collision policy
    pub skipped: usize,

    /// Jobs submitted
    pub total: usize,

    /// Wall-clock duration of the batch in milliseconds
    pub elapsed_ms: u64,

    /// Processing rate in jobs per second
    pub jobs_per_second: f64,

    /// Highest number of jobs in flight at once
    pub peak_workers: usize,
}

/// Final report for one batch run.
///
/// Outcomes sit in submission order, one per submitted descriptor, regardless
/// of the order jobs actually finished in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: Vec<JobOutcome>,
    pub summary: BatchSummary,
}

impl BatchReport {
    /// Outcome recorded for a descriptor.
    ///
    /// Descriptors compare by value; with duplicate submissions this returns
    /// the earliest.
    pub fn outcome_for(&self, job: &JobDescriptor) -> Option<&JobOutcome> {
        self.outcomes.iter().find(|outcome| &outcome.job == job)
    }

    pub fn summary(&self) -> &BatchSummary {
        &self.summary
    }

    /// True when every job succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.summary.failed == 0 && self.summary.skipped == 0
    }
}

/// Accumulates outcomes while a batch runs; only the engine writes to it.
pub(crate) struct ReportBuilder {
    jobs: Vec<JobDescriptor>,
    slots: Vec<Option<JobOutcome>>,
    started: Instant,
    peak_workers: usize,
}

impl ReportBuilder {
    pub(crate) fn new(jobs: Vec<JobDescriptor>) -> Self {
        let slots = vec![None; jobs.len()];
        Self {
            jobs,
            slots,
            started: Instant::now(),
            peak_workers: 0,
        }
    }

    /// Record an outcome into its submission slot.
    pub(crate) fn record(&mut self, outcome: JobOutcome) {
        let index = outcome.index;
        if index < self.slots.len() {
            self.slots[index] = Some(outcome);
        }
    }

    pub(crate) fn set_peak_workers(&mut self, peak: usize) {
        self.peak_workers = peak;
    }

    /// Close the batch and produce the report.
    ///
    /// A slot left empty means its worker went away without reporting; the
    /// job is recorded as failed so the 1:1 correspondence holds.
    pub(crate) fn finalize(self) -> BatchReport {
        let elapsed = self.started.elapsed();
        let total = self.jobs.len();

        let mut outcomes = Vec::with_capacity(total);
        for (index, slot) in self.slots.into_iter().enumerate() {
            match slot {
                Some(outcome) => outcomes.push(outcome),
                None => {
                    let job = self.jobs[index].clone();
                    let error = JobError::Processing {
                        stage: "worker",
                        message: "worker terminated before reporting an outcome".to_string(),
                    };
                    outcomes.push(JobOutcome::failed(index, job, &error, Duration::ZERO));
                }
            }
        }

        let succeeded = outcomes
            .iter()
            .filter(|o| o.status == JobStatus::Succeeded)
            .count();
        let failed = outcomes
            .iter()
            .filter(|o| o.status == JobStatus::Failed)
            .count();
        let skipped = outcomes
            .iter()
            .filter(|o| o.status == JobStatus::Skipped)
            .count();

        let seconds = elapsed.as_secs_f64();
        let jobs_per_second = if seconds > 0.0 {
            total as f64 / seconds
        } else {
            0.0
        };

        BatchReport {
            outcomes,
            summary: BatchSummary {
                succeeded,
                failed,
                skipped,
                total,
                elapsed_ms: elapsed.as_millis() as u64,
                jobs_per_second,
                peak_workers: self.peak_workers,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn jobs(n: usize) -> Vec<JobDescriptor> {
        (0..n)
            .map(|i| JobDescriptor::new(format!("in_{i}.png"), format!("out_{i}.png")))
            .collect()
    }

    #[test]
    fn test_report_keeps_submission_order() {
        let descriptors = jobs(3);
        let mut builder = ReportBuilder::new(descriptors.clone());

        // Completion order differs from submission order
        builder.record(JobOutcome::skipped(2, descriptors[2].clone(), "cancelled"));
        builder.record(JobOutcome::succeeded(
            0,
            descriptors[0].clone(),
            PathBuf::from("out_0.png"),
            Vec::new(),
            Duration::from_millis(4),
        ));
        builder.record(JobOutcome::succeeded(
            1,
            descriptors[1].clone(),
            PathBuf::from("out_1.png"),
            Vec::new(),
            Duration::from_millis(9),
        ));

        let report = builder.finalize();
        assert_eq!(report.outcomes.len(), 3);
        for (index, outcome) in report.outcomes.iter().enumerate() {
            assert_eq!(outcome.index, index);
        }
        assert_eq!(report.summary.succeeded, 2);
        assert_eq!(report.summary.skipped, 1);
        assert_eq!(report.summary.total, 3);
    }

    #[test]
    fn test_missing_slot_becomes_failure() {
        let descriptors = jobs(2);
        let mut builder = ReportBuilder::new(descriptors.clone());
        builder.record(JobOutcome::succeeded(
            0,
            descriptors[0].clone(),
            PathBuf::from("out_0.png"),
            Vec::new(),
            Duration::from_millis(1),
        ));

        let report = builder.finalize();
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.outcomes[1].status, JobStatus::Failed);
        assert!(report.outcomes[1]
            .reason
            .as_deref()
            .unwrap()
            .contains("worker terminated"));
    }

    #[test]
    fn test_outcome_for_finds_by_descriptor() {
        let descriptors = jobs(2);
        let mut builder = ReportBuilder::new(descriptors.clone());
        for (i, job) in descriptors.iter().enumerate() {
            builder.record(JobOutcome::skipped(i, job.clone(), "cancelled"));
        }
        let report = builder.finalize();

        let found = report.outcome_for(&descriptors[1]).unwrap();
        assert_eq!(found.index, 1);
        assert!(report
            .outcome_for(&JobDescriptor::new("other.png", "x.png"))
            .is_none());
    }

    #[test]
    fn test_empty_batch_report() {
        let report = ReportBuilder::new(Vec::new()).finalize();
        assert!(report.outcomes.is_empty());
        assert_eq!(report.summary.total, 0);
        assert!(report.all_succeeded());
    }

    #[test]
    fn test_report_serializes() {
        let descriptors = jobs(1);
        let mut builder = ReportBuilder::new(descriptors.clone());
        builder.record(JobOutcome::succeeded(
            0,
            descriptors[0].clone(),
            PathBuf::from("out_0.png"),
            Vec::new(),
            Duration::from_millis(2),
        ));
        builder.set_peak_workers(4);

        let report = builder.finalize();
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"peak_workers\":4"));

        let parsed: BatchReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.summary.succeeded, 1);
    }
}

//! Report serialization for JSON and JSONL output.
//!
//! JSON emits the whole report as one document; JSON Lines emits one outcome
//! per line followed by a summary line, which also supports streaming
//! outcomes while a batch is still running.

use std::io::{self, Write};

use serde::Serialize;

use crate::job::JobOutcome;
use crate::report::{BatchReport, BatchSummary};

/// Report output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Single JSON document
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

#[derive(Serialize)]
struct SummaryLine<'a> {
    summary: &'a BatchSummary,
}

/// Serializes batch reports to a writer.
pub struct ReportWriter<W: Write> {
    writer: W,
    format: ReportFormat,
    pretty: bool,
    items_written: usize,
}

impl<W: Write> ReportWriter<W> {
    /// Create a report writer.
    ///
    /// `pretty` only affects the JSON format; JSONL stays one object per
    /// line.
    pub fn new(writer: W, format: ReportFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            items_written: 0,
        }
    }

    /// Write one outcome. In JSONL this is a streamable line; in JSON it is
    /// a standalone document.
    pub fn write_outcome(&mut self, outcome: &JobOutcome) -> io::Result<()> {
        self.write_value(outcome)
    }

    /// Write the closing summary line (JSONL streaming mode).
    pub fn write_summary(&mut self, summary: &BatchSummary) -> io::Result<()> {
        self.write_value(&SummaryLine { summary })
    }

    /// Write a complete report.
    pub fn write_report(&mut self, report: &BatchReport) -> io::Result<()> {
        match self.format {
            ReportFormat::Json => self.write_value(report),
            ReportFormat::JsonLines => {
                for outcome in &report.outcomes {
                    self.write_value(outcome)?;
                }
                self.write_summary(&report.summary)
            }
        }
    }

    fn write_value<T: Serialize>(&mut self, value: &T) -> io::Result<()> {
        match self.format {
            ReportFormat::Json if self.pretty => {
                serde_json::to_writer_pretty(&mut self.writer, value).map_err(io::Error::other)?;
            }
            _ => {
                serde_json::to_writer(&mut self.writer, value).map_err(io::Error::other)?;
            }
        }
        writeln!(self.writer)?;
        self.items_written += 1;
        Ok(())
    }

    /// Number of objects written so far.
    pub fn items_written(&self) -> usize {
        self.items_written
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Consume the writer and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

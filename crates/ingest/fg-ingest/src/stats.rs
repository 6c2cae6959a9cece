//! Statistics for analysis runs.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Statistics collected during one analysis run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisStats {
    /// When the run started
    pub started_at: Option<DateTime<Utc>>,

    /// When the run completed
    pub completed_at: Option<DateTime<Utc>>,

    /// Objects returned by the listing (before window filtering)
    pub objects_listed: usize,

    /// Objects outside the sample window (never fetched)
    pub objects_outside_window: usize,

    /// Objects fully processed
    pub objects_processed: usize,

    /// Objects skipped because their fetch failed
    pub objects_failed: usize,

    /// Objects skipped because the run was cancelled before their fetch
    pub objects_cancelled: usize,

    /// Bytes of object bodies read
    pub bytes_read: u64,

    /// Rows that matched the filter predicate
    pub records_matched: usize,

    /// Well-formed rows that did not match the predicate
    pub records_filtered: usize,

    /// Rows skipped as malformed
    pub records_malformed: usize,

    /// Errors encountered (per-object and per-sink; never fatal ones)
    pub errors: Vec<String>,
}

impl AnalysisStats {
    /// Create a new stats tracker with the current time as start time.
    pub fn new() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Mark the run as complete with the current time.
    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    /// Record an object that was listed but fell outside the window.
    pub fn record_outside_window(&mut self) {
        self.objects_listed += 1;
        self.objects_outside_window += 1;
    }

    /// Record an object that entered processing.
    pub fn record_in_window(&mut self) {
        self.objects_listed += 1;
    }

    /// Fold in the outcome of one processed object.
    pub fn record_object(&mut self, outcome: &ObjectStats) {
        self.objects_processed += 1;
        self.bytes_read += outcome.bytes_read;
        self.records_matched += outcome.records_matched;
        self.records_filtered += outcome.records_filtered;
        self.records_malformed += outcome.records_malformed;
    }

    /// Record an object whose fetch failed and was skipped.
    pub fn record_object_failure(&mut self, error: impl ToString) {
        self.objects_failed += 1;
        self.errors.push(error.to_string());
    }

    /// Record a non-fatal error (e.g. a failed report sink).
    pub fn record_error(&mut self, error: impl ToString) {
        self.errors.push(error.to_string());
    }

    /// Duration of the run, if it completed.
    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Throughput in records per second over the whole run.
    pub fn records_per_second(&self) -> Option<f64> {
        self.duration().map(|d| {
            let secs = d.num_milliseconds() as f64 / 1000.0;
            if secs > 0.0 {
                self.records_matched as f64 / secs
            } else {
                0.0
            }
        })
    }
}

/// Per-object processing counters, folded into [`AnalysisStats`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectStats {
    /// Bytes of the object body consumed
    pub bytes_read: u64,

    /// Rows that matched the filter predicate
    pub records_matched: usize,

    /// Well-formed rows that did not match the predicate
    pub records_filtered: usize,

    /// Rows skipped as malformed
    pub records_malformed: usize,
}

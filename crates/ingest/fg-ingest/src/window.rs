//! Trailing sample window for object inclusion.
//!
//! Only objects modified strictly after `now - sample_days` are fetched.

use chrono::{DateTime, Duration, Utc};

use crate::FlowLogObject;

/// A trailing time window anchored at a fixed cutoff.
///
/// The cutoff is computed once when the window is constructed, so every
/// object in a run is judged against the same instant regardless of how
/// long listing takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleWindow {
    cutoff: DateTime<Utc>,
}

impl SampleWindow {
    /// Create a window covering the trailing `days` days from now.
    pub fn trailing_days(days: u32) -> Self {
        Self::ending_at(Utc::now(), days)
    }

    /// Create a window of `days` days ending at an explicit instant.
    pub fn ending_at(end: DateTime<Utc>, days: u32) -> Self {
        Self {
            cutoff: end - Duration::days(i64::from(days)),
        }
    }

    /// The cutoff instant. Objects modified at or before this are excluded.
    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }

    /// Check whether an object's modification time falls inside the window.
    ///
    /// Objects without a timestamp are excluded: the window invariant
    /// (every fetched object was modified after the cutoff) cannot be
    /// established for them.
    pub fn contains(&self, obj: &FlowLogObject) -> bool {
        match obj.last_modified {
            Some(modified) => modified > self.cutoff,
            None => false,
        }
    }
}

impl std::fmt::Display for SampleWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "modified after {}", self.cutoff.format("%Y-%m-%d %H:%M:%S"))
    }
}

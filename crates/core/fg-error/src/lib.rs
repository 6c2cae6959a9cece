//! Error types and classification for FlowGuard.
//!
//! This crate provides:
//! - [`FgError`] - Top-level error enum for the ingestion pipeline
//! - [`Severity`] for abort/skip decision making
//! - [`classify_error`] mapping each error to its containment scope

use thiserror::Error;

/// Top-level error type for FlowGuard.
#[derive(Error, Debug)]
pub enum FgError {
    /// The input locator could not be decomposed into (bucket, prefix).
    ///
    /// Always fatal; raised before any I/O happens.
    #[error("Invalid locator '{locator}': {reason}")]
    Locator { locator: String, reason: String },

    /// The object store failed while listing a page of objects.
    ///
    /// Fatal: an incomplete listing would produce a silently partial profile.
    #[error("Listing failed for bucket '{bucket}': {reason}")]
    Listing { bucket: String, reason: String },

    /// Retrieval of one object's body failed or was interrupted.
    ///
    /// The object is skipped and the run continues.
    #[error("Fetch failed for object '{key}': {reason}")]
    Fetch { key: String, reason: String },

    /// A row did not align with the object's header schema.
    ///
    /// The row is skipped and the object continues.
    #[error("Malformed record in '{key}': {reason}")]
    MalformedRecord { key: String, reason: String },

    /// One report sink failed to accept the rendering.
    ///
    /// Other sinks are still attempted.
    #[error("Report sink '{sink}' failed: {reason}")]
    RenderSink { sink: String, reason: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors (wrapped anyhow)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FgError {
    /// Build a fetch error for a specific object key.
    pub fn fetch(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fetch {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a malformed-record error for a row within an object.
    pub fn malformed(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::MalformedRecord {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a sink error for a named report sink.
    pub fn sink(sink: impl Into<String>, reason: impl ToString) -> Self {
        Self::RenderSink {
            sink: sink.into(),
            reason: reason.to_string(),
        }
    }
}

/// Containment scope for an error.
///
/// Determines how far an error propagates: the whole run, the current
/// object, the current row, or a single output sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Abort the run. Nothing is rendered.
    ///
    /// Examples: bad locator, listing failure.
    Fatal,

    /// Skip the current object, continue with the next one.
    ///
    /// Examples: interrupted GET, fetch timeout.
    ObjectSkipped,

    /// Skip the current row, continue with the object.
    ///
    /// Examples: row with the wrong field count.
    RecordSkipped,

    /// Skip the failing sink, still attempt the others.
    SinkSkipped,
}

/// Classify an error into its containment scope.
pub fn classify_error(error: &FgError) -> Severity {
    match error {
        FgError::Locator { .. } => Severity::Fatal,
        FgError::Listing { .. } => Severity::Fatal,
        FgError::Config(_) => Severity::Fatal,
        FgError::Other(_) => Severity::Fatal,
        FgError::Fetch { .. } => Severity::ObjectSkipped,
        FgError::MalformedRecord { .. } => Severity::RecordSkipped,
        FgError::RenderSink { .. } => Severity::SinkSkipped,
    }
}

/// Result type alias using FgError.
pub type Result<T> = std::result::Result<T, FgError>;

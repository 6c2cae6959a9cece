//! fg-ingest - streaming flow-log ingestion and aggregation for FlowGuard.
//!
//! This crate implements the pipeline that turns S3-hosted VPC flow-log
//! objects into a per-source-address traffic profile:
//!
//! - Paginated S3 listing under a trailing time window
//! - Chunked object retrieval with bounded memory
//! - Line reassembly across chunk boundaries
//! - Header-driven record parsing with a declarative row predicate
//! - Multi-valued set aggregation keyed by source address
//! - Fixed-width table rendering to console and file sinks
//!
//! # Example
//!
//! ```ignore
//! use fg_ingest::{Analyzer, AnalyzerConfig, SampleWindow};
//! use fg_ingest::locator::BucketLocator;
//! use fg_ingest::s3::{S3Config, create_s3_client};
//!
//! let locator = BucketLocator::parse("arn:aws:s3:::flow-logs/vpc/")?;
//! let client = create_s3_client(&S3Config::new()).await?;
//! let window = SampleWindow::trailing_days(7);
//!
//! let analyzer = Analyzer::new(client, locator, window, AnalyzerConfig::default());
//! let outcome = analyzer.run().await?;
//! println!("{}", fg_ingest::report::render_table(&outcome.pattern));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod aggregate;
pub mod analyzer;
pub mod fetch;
pub mod lines;
pub mod locator;
pub mod record;
pub mod report;
pub mod s3;
pub mod stats;
pub mod window;

pub use aggregate::TrafficPattern;
pub use analyzer::{Analyzer, AnalyzerConfig, AnalysisOutcome, ProgressObserver};
pub use lines::LineAssembler;
pub use locator::BucketLocator;
pub use record::{FlowRecord, RecordSchema, RowOutcome, RowPredicate};
pub use report::{ConsoleSink, FileSink, ReportSink};
pub use s3::{S3Config, create_s3_client, list_objects};
pub use stats::AnalysisStats;
pub use window::SampleWindow;

/// A flow-log object discovered in S3.
///
/// Produced by the lister; only objects whose modification time falls
/// inside the sample window are ever fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowLogObject {
    /// The object key (full path within the bucket)
    pub key: String,

    /// Size of the object in bytes
    pub size: u64,

    /// Last modified timestamp (if the store reported one)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

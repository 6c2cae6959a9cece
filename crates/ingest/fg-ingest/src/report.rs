//! Traffic profile rendering and output sinks.
//!
//! Renders the aggregated [`TrafficPattern`] once as a fixed-width table
//! and delivers the same rendering to each configured sink. Sink failures
//! are isolated: a full disk must not suppress the console output, and
//! vice versa.

use async_trait::async_trait;
use fg_error::{FgError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::aggregate::TrafficPattern;
use crate::record::TRACKED_ATTRIBUTES;

/// Default path for the durable report file.
pub const DEFAULT_REPORT_PATH: &str = "traffic_pattern.txt";

/// Fixed column widths: srcaddr plus one column per tracked attribute.
const SRCADDR_WIDTH: usize = 18;
const ATTRIBUTE_WIDTHS: &[usize] = &[30, 14, 12, 22, 26, 21, 12];

/// Render the traffic profile as a fixed-width text table.
///
/// One row per distinct source address; multi-valued columns are
/// comma-joined in lexicographic order, so the rendering is reproducible
/// for a given profile. An empty profile renders as the header with a note
/// instead of rows.
pub fn render_table(pattern: &TrafficPattern) -> String {
    let mut out = String::new();

    out.push_str(&format!("{:<SRCADDR_WIDTH$}", "srcaddr"));
    for (&attr, &width) in TRACKED_ATTRIBUTES.iter().zip(ATTRIBUTE_WIDTHS) {
        let label = match attr {
            "dstaddr" => "dstaddr(s)".to_string(),
            "dstport" => "dstport(s)".to_string(),
            "protocol" => "protocol(s)".to_string(),
            other => other.to_string(),
        };
        out.push_str(&format!("{label:<width$}"));
    }
    out.push('\n');

    let total_width = SRCADDR_WIDTH + ATTRIBUTE_WIDTHS.iter().sum::<usize>();
    out.push_str(&"-".repeat(total_width));
    out.push('\n');

    if pattern.is_empty() {
        out.push_str("(no matching flow records)\n");
        return out;
    }

    for (srcaddr, attrs) in pattern.iter() {
        out.push_str(&format!("{srcaddr:<SRCADDR_WIDTH$}"));
        for (&attr, &width) in TRACKED_ATTRIBUTES.iter().zip(ATTRIBUTE_WIDTHS) {
            let joined = attrs
                .get(attr)
                .map(|values| values.iter().cloned().collect::<Vec<_>>().join(","))
                .unwrap_or_default();
            out.push_str(&format!("{joined:<width$}"));
        }
        out.push('\n');
    }

    out
}

/// A destination for the rendered report.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Deliver the complete rendering to this sink.
    async fn write(&self, rendering: &str) -> Result<()>;

    /// Sink name for diagnostics.
    fn name(&self) -> String;
}

/// Interactive sink: writes the table to standard output.
#[derive(Debug, Default)]
pub struct ConsoleSink;

#[async_trait]
impl ReportSink for ConsoleSink {
    async fn write(&self, rendering: &str) -> Result<()> {
        use std::io::Write;

        let mut stdout = std::io::stdout();
        stdout
            .write_all(rendering.as_bytes())
            .and_then(|_| stdout.flush())
            .map_err(|e| FgError::sink(self.name(), e))
    }

    fn name(&self) -> String {
        "console".to_string()
    }
}

/// Durable sink: persists the table to a file.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ReportSink for FileSink {
    async fn write(&self, rendering: &str) -> Result<()> {
        tokio::fs::write(&self.path, rendering)
            .await
            .map_err(|e| FgError::sink(self.name(), e))?;
        debug!(path = %self.path.display(), "Wrote report file");
        Ok(())
    }

    fn name(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// Write one rendering to every sink, attempting all of them.
///
/// Returns the sink errors encountered; an empty vec means every sink
/// accepted the report.
pub async fn write_report(pattern: &TrafficPattern, sinks: &[Box<dyn ReportSink>]) -> Vec<FgError> {
    let rendering = render_table(pattern);
    let mut failures = Vec::new();

    for sink in sinks {
        if let Err(e) = sink.write(&rendering).await {
            warn!(sink = %sink.name(), error = %e, "Report sink failed");
            failures.push(e);
        }
    }

    failures
}

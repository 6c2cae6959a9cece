//! Pipeline orchestration.
//!
//! The analyzer wires the stages together: list objects under the locator,
//! keep those inside the sample window, stream each one through line
//! reassembly and record parsing, and fold matched records into one shared
//! [`TrafficPattern`]. Objects are processed with bounded concurrency;
//! the aggregator is the only cross-object state and is serialized behind
//! a mutex. Listing failures abort the run; a failed fetch skips only its
//! object; a malformed row skips only itself.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aws_sdk_s3::Client;
use bytes::Bytes;
use fg_error::{FgError, Result, Severity, classify_error};
use futures::{Stream, StreamExt, pin_mut};
use tracing::{debug, info, warn};

use crate::FlowLogObject;
use crate::aggregate::TrafficPattern;
use crate::fetch::fetch_chunks;
use crate::lines::LineAssembler;
use crate::locator::BucketLocator;
use crate::record::{RecordSchema, RowOutcome, RowPredicate, parse_row};
use crate::s3::list_objects;
use crate::stats::{AnalysisStats, ObjectStats};
use crate::window::SampleWindow;

/// Tuning knobs for an analysis run.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Objects processed concurrently. Kept low to respect store rate limits.
    pub concurrency: usize,

    /// Per-object fetch/processing deadline. Exceeding it skips the object.
    pub fetch_timeout: Duration,

    /// Row filter predicate.
    pub predicate: RowPredicate,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            fetch_timeout: Duration::from_secs(300),
            predicate: RowPredicate::accepted_egress(),
        }
    }
}

/// Observer notified as objects complete, for live progress reporting.
pub trait ProgressObserver: Send + Sync {
    /// One object finished processing.
    fn object_completed(&self, stats: &ObjectStats);

    /// One object's fetch failed and was skipped.
    fn object_failed(&self);
}

/// The result of one analysis run.
#[derive(Debug)]
pub struct AnalysisOutcome {
    /// The aggregated traffic profile.
    pub pattern: TrafficPattern,

    /// Run statistics.
    pub stats: AnalysisStats,
}

/// Coordinates listing, window filtering, per-object processing, and
/// aggregation for one run.
pub struct Analyzer {
    client: Client,
    locator: BucketLocator,
    window: SampleWindow,
    config: AnalyzerConfig,
    progress: Option<Arc<dyn ProgressObserver>>,
    cancel: Arc<AtomicBool>,
}

impl Analyzer {
    pub fn new(
        client: Client,
        locator: BucketLocator,
        window: SampleWindow,
        config: AnalyzerConfig,
    ) -> Self {
        Self {
            client,
            locator,
            window,
            config,
            progress: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Attach a progress observer.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressObserver>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Share a cancellation flag (e.g. set from a Ctrl-C handler).
    ///
    /// Once set, no new fetches are issued; in-flight objects drain, and
    /// whatever was aggregated so far is still returned and renderable.
    pub fn with_cancellation(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the pipeline to completion.
    ///
    /// Returns the aggregated profile and statistics. Only locator and
    /// listing failures surface as `Err`; per-object and per-row failures
    /// are contained, counted, and reported through the stats.
    pub async fn run(&self) -> Result<AnalysisOutcome> {
        let mut stats = AnalysisStats::new();

        info!(
            locator = %self.locator,
            window = %self.window,
            concurrency = self.config.concurrency,
            "Starting analysis"
        );

        // Phase 1: each listing page flows through the window gate as it
        // arrives; out-of-window objects are dropped without buffering the
        // whole listing first. A listing error here is fatal - an
        // incomplete listing would silently skew the profile.
        let to_fetch = self.list_in_window(&mut stats).await?;

        debug!(
            listed = stats.objects_listed,
            outside_window = stats.objects_outside_window,
            "Listing complete"
        );

        // Phase 2: bounded-concurrency object processing into one shared
        // aggregator. The mutex serializes inserts; content is arrival-order
        // independent so interleaving does not matter.
        let pattern = Mutex::new(TrafficPattern::new());

        process_batch(
            to_fetch,
            self.config.concurrency,
            &self.cancel,
            self.progress.as_deref(),
            &mut stats,
            |obj| self.process_object(obj, &pattern),
        )
        .await?;

        stats.complete();

        info!(
            objects = stats.objects_processed,
            failed = stats.objects_failed,
            matched = stats.records_matched,
            malformed = stats.records_malformed,
            bytes = stats.bytes_read,
            "Analysis completed"
        );

        Ok(AnalysisOutcome {
            pattern: pattern.into_inner().unwrap_or_else(|e| e.into_inner()),
            stats,
        })
    }

    async fn list_in_window(&self, stats: &mut AnalysisStats) -> Result<Vec<FlowLogObject>> {
        let stream = list_objects(&self.client, self.locator.bucket(), self.locator.prefix());
        pin_mut!(stream);

        let mut in_window = Vec::new();
        while let Some(result) = stream.next().await {
            if let Some(obj) = admit_to_window(result?, &self.window, stats) {
                in_window.push(obj);
            }
        }
        Ok(in_window)
    }

    async fn process_object(
        &self,
        obj: FlowLogObject,
        pattern: &Mutex<TrafficPattern>,
    ) -> Result<ObjectStats> {
        debug!(key = %obj.key, size = obj.size, "Processing object");

        let chunks = fetch_chunks(&self.client, self.locator.bucket(), &obj.key);
        process_with_deadline(
            &obj.key,
            chunks,
            self.config.fetch_timeout,
            &self.config.predicate,
            pattern,
        )
        .await
    }
}

/// Window gate applied to each listed object as it arrives.
///
/// Out-of-window objects are counted and dropped; they never reach the
/// fetch stage.
fn admit_to_window(
    obj: FlowLogObject,
    window: &SampleWindow,
    stats: &mut AnalysisStats,
) -> Option<FlowLogObject> {
    if window.contains(&obj) {
        stats.record_in_window();
        Some(obj)
    } else {
        debug!(key = %obj.key, modified = ?obj.last_modified, "Outside sample window");
        stats.record_outside_window();
        None
    }
}

/// Drive the in-window objects through `process` with bounded concurrency,
/// folding every outcome into `stats`.
///
/// The cancel flag is consulted before each fetch is issued; objects
/// already in flight drain normally. Failures are handled by containment
/// scope: a fatal classification aborts the batch, anything else skips
/// the one object and is recorded.
async fn process_batch<F, Fut>(
    to_fetch: Vec<FlowLogObject>,
    concurrency: usize,
    cancel: &AtomicBool,
    progress: Option<&dyn ProgressObserver>,
    stats: &mut AnalysisStats,
    process: F,
) -> Result<()>
where
    F: Fn(FlowLogObject) -> Fut,
    Fut: Future<Output = Result<ObjectStats>>,
{
    let outcomes: Vec<(String, Option<Result<ObjectStats>>)> = futures::stream::iter(to_fetch)
        .map(|obj| {
            let process = &process;
            async move {
                if cancel.load(Ordering::Relaxed) {
                    return (obj.key, None);
                }

                let key = obj.key.clone();
                let result = process(obj).await;
                if let Some(progress) = progress {
                    match &result {
                        Ok(object_stats) => progress.object_completed(object_stats),
                        Err(_) => progress.object_failed(),
                    }
                }
                (key, Some(result))
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    for (key, result) in outcomes {
        match result {
            Some(Ok(object_stats)) => stats.record_object(&object_stats),
            Some(Err(e)) => match classify_error(&e) {
                Severity::Fatal => return Err(e),
                _ => {
                    warn!(key = %key, error = %e, "Skipping object");
                    stats.record_object_failure(e);
                }
            },
            None => {
                debug!(key = %key, "Cancelled before fetch");
                stats.objects_cancelled += 1;
            }
        }
    }

    Ok(())
}

/// Apply the per-object deadline to one chunk stream.
///
/// A stalled or slow fetch surfaces as a `Fetch` error, skipping just
/// this object.
async fn process_with_deadline<S>(
    key: &str,
    chunks: S,
    deadline: Duration,
    predicate: &RowPredicate,
    pattern: &Mutex<TrafficPattern>,
) -> Result<ObjectStats>
where
    S: Stream<Item = Result<Bytes>>,
{
    let work = process_chunks(key, chunks, predicate, pattern);

    match tokio::time::timeout(deadline, work).await {
        Ok(result) => result,
        Err(_) => Err(FgError::fetch(key, format!("timed out after {deadline:?}"))),
    }
}

/// Stream one object's chunks through reassembly, parsing, and aggregation.
///
/// The first complete line establishes the object's schema; each later line
/// is parsed against it, and matched records are folded into the shared
/// pattern. A chunk error aborts the object; rows already aggregated from
/// fully assembled lines stay, per the default partial-read policy.
///
/// Separated from the S3 fetch so the chunk-boundary and determinism
/// properties can be exercised with synthetic streams.
pub async fn process_chunks<S>(
    key: &str,
    chunks: S,
    predicate: &RowPredicate,
    pattern: &Mutex<TrafficPattern>,
) -> Result<ObjectStats>
where
    S: Stream<Item = Result<Bytes>>,
{
    pin_mut!(chunks);

    let mut assembler = LineAssembler::new();
    let mut schema: Option<RecordSchema> = None;
    let mut counters = ObjectStats::default();

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        counters.bytes_read += chunk.len() as u64;

        for line in assembler.push(&chunk) {
            consume_line(key, &line, &mut schema, predicate, pattern, &mut counters);
        }
    }

    if let Some(line) = assembler.finish() {
        consume_line(key, &line, &mut schema, predicate, pattern, &mut counters);
    }

    Ok(counters)
}

fn consume_line(
    key: &str,
    line: &str,
    schema: &mut Option<RecordSchema>,
    predicate: &RowPredicate,
    pattern: &Mutex<TrafficPattern>,
    counters: &mut ObjectStats,
) {
    if line.trim().is_empty() {
        return;
    }

    let Some(schema) = schema.as_ref() else {
        // First non-empty line is this object's header
        *schema = Some(RecordSchema::from_header(line));
        return;
    };

    match parse_row(schema, predicate, line) {
        RowOutcome::Matched(record) => {
            let mut pattern = pattern.lock().unwrap_or_else(|e| e.into_inner());
            pattern.insert(&record);
            counters.records_matched += 1;
        }
        RowOutcome::Filtered => {
            counters.records_filtered += 1;
        }
        RowOutcome::Malformed { reason, srcaddr } => {
            let err = FgError::malformed(key, reason);
            warn!(srcaddr = ?srcaddr, raw = %line, "Skipping row: {err}");
            counters.records_malformed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};

    const OBJECT_A: &str = "action,flow-direction,srcaddr,dstaddr,dstport,protocol\n\
                            ACCEPT,egress,10.0.0.1,8.8.8.8,443,tcp\n\
                            REJECT,egress,10.0.0.1,1.1.1.1,80,tcp\n";
    const OBJECT_B: &str = "action,flow-direction,srcaddr,dstaddr,dstport,protocol\n\
                            ACCEPT,egress,10.0.0.1,9.9.9.9,443,tcp\n";

    fn chunk_stream(data: &[u8], chunk_size: usize) -> impl Stream<Item = Result<Bytes>> {
        let chunks: Vec<Result<Bytes>> = data
            .chunks(chunk_size.max(1))
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        futures::stream::iter(chunks)
    }

    async fn run_object(
        key: &str,
        data: &str,
        chunk_size: usize,
        pattern: &Mutex<TrafficPattern>,
    ) -> ObjectStats {
        process_chunks(
            key,
            chunk_stream(data.as_bytes(), chunk_size),
            &RowPredicate::accepted_egress(),
            pattern,
        )
        .await
        .unwrap()
    }

    fn sorted_values(pattern: &TrafficPattern, srcaddr: &str, attr: &str) -> Vec<String> {
        pattern
            .values(srcaddr, attr)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_end_to_end_two_objects() {
        let pattern = Mutex::new(TrafficPattern::new());

        run_object("a.log", OBJECT_A, 1024, &pattern).await;
        run_object("b.log", OBJECT_B, 1024, &pattern).await;

        let pattern = pattern.into_inner().unwrap();
        assert_eq!(pattern.len(), 1);
        assert_eq!(
            sorted_values(&pattern, "10.0.0.1", "dstaddr"),
            vec!["8.8.8.8", "9.9.9.9"]
        );
        assert_eq!(sorted_values(&pattern, "10.0.0.1", "dstport"), vec!["443"]);
        assert_eq!(sorted_values(&pattern, "10.0.0.1", "protocol"), vec!["tcp"]);

        // The rendered table has exactly one row for 10.0.0.1
        let table = crate::report::render_table(&pattern);
        let rows: Vec<&str> = table
            .lines()
            .filter(|l| l.starts_with("10.0.0.1"))
            .collect();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].contains("8.8.8.8,9.9.9.9"));
    }

    #[tokio::test]
    async fn test_pattern_independent_of_chunk_size() {
        let reference = {
            let pattern = Mutex::new(TrafficPattern::new());
            run_object("a.log", OBJECT_A, OBJECT_A.len(), &pattern).await;
            pattern.into_inner().unwrap()
        };

        for chunk_size in 1..=OBJECT_A.len() {
            let pattern = Mutex::new(TrafficPattern::new());
            run_object("a.log", OBJECT_A, chunk_size, &pattern).await;
            assert_eq!(
                pattern.into_inner().unwrap(),
                reference,
                "chunk size {chunk_size} changed the aggregate"
            );
        }
    }

    #[tokio::test]
    async fn test_pattern_independent_of_object_order() {
        let forward = {
            let pattern = Mutex::new(TrafficPattern::new());
            run_object("a.log", OBJECT_A, 7, &pattern).await;
            run_object("b.log", OBJECT_B, 7, &pattern).await;
            pattern.into_inner().unwrap()
        };

        let backward = {
            let pattern = Mutex::new(TrafficPattern::new());
            run_object("b.log", OBJECT_B, 7, &pattern).await;
            run_object("a.log", OBJECT_A, 7, &pattern).await;
            pattern.into_inner().unwrap()
        };

        assert_eq!(forward, backward);
    }

    #[tokio::test]
    async fn test_rejected_rows_never_reach_pattern() {
        let data = "action,flow-direction,srcaddr,dstaddr,dstport,protocol\n\
                    REJECT,egress,10.0.0.5,1.1.1.1,80,tcp\n\
                    ACCEPT,ingress,10.0.0.6,2.2.2.2,22,tcp\n";

        let pattern = Mutex::new(TrafficPattern::new());
        let stats = run_object("x.log", data, 16, &pattern).await;

        assert!(pattern.into_inner().unwrap().is_empty());
        assert_eq!(stats.records_matched, 0);
        assert_eq!(stats.records_filtered, 2);
    }

    #[tokio::test]
    async fn test_malformed_row_between_good_rows() {
        let data = "action,flow-direction,srcaddr,dstaddr,dstport,protocol\n\
                    ACCEPT,egress,10.0.0.1,8.8.8.8,443,tcp\n\
                    this-row-is-broken\n\
                    ACCEPT,egress,10.0.0.1,9.9.9.9,443,tcp\n";

        let pattern = Mutex::new(TrafficPattern::new());
        let stats = run_object("x.log", data, 32, &pattern).await;

        // Both well-formed rows land, exactly one diagnostic, no failure
        assert_eq!(stats.records_matched, 2);
        assert_eq!(stats.records_malformed, 1);

        let pattern = pattern.into_inner().unwrap();
        assert_eq!(
            sorted_values(&pattern, "10.0.0.1", "dstaddr"),
            vec!["8.8.8.8", "9.9.9.9"]
        );
    }

    #[tokio::test]
    async fn test_record_split_across_chunk_boundary_at_every_offset() {
        let data = OBJECT_B.as_bytes();

        let reference = {
            let pattern = Mutex::new(TrafficPattern::new());
            run_object("b.log", OBJECT_B, data.len(), &pattern).await;
            pattern.into_inner().unwrap()
        };

        for split in 1..data.len() {
            let chunks = vec![
                Ok(Bytes::copy_from_slice(&data[..split])),
                Ok(Bytes::copy_from_slice(&data[split..])),
            ];
            let pattern = Mutex::new(TrafficPattern::new());
            process_chunks(
                "b.log",
                futures::stream::iter(chunks),
                &RowPredicate::accepted_egress(),
                &pattern,
            )
            .await
            .unwrap();

            assert_eq!(
                pattern.into_inner().unwrap(),
                reference,
                "split at byte {split} corrupted the aggregate"
            );
        }
    }

    #[tokio::test]
    async fn test_chunk_error_aborts_object_keeps_prior_rows() {
        let chunks: Vec<Result<Bytes>> = vec![
            Ok(Bytes::from_static(
                b"action,flow-direction,srcaddr,dstaddr,dstport,protocol\n\
                  ACCEPT,egress,10.0.0.1,8.8.8.8,443,tcp\n",
            )),
            Err(FgError::fetch("x.log", "connection reset")),
        ];

        let pattern = Mutex::new(TrafficPattern::new());
        let result = process_chunks(
            "x.log",
            futures::stream::iter(chunks),
            &RowPredicate::accepted_egress(),
            &pattern,
        )
        .await;

        assert!(matches!(result, Err(FgError::Fetch { .. })));
        // Rows from fully assembled lines before the failure remain valid
        let pattern = pattern.into_inner().unwrap();
        assert!(pattern.values("10.0.0.1", "dstaddr").is_some());
    }

    #[tokio::test]
    async fn test_file_without_trailing_newline() {
        let data = "action,flow-direction,srcaddr,dstaddr,dstport,protocol\n\
                    ACCEPT,egress,10.0.0.1,8.8.8.8,443,tcp";

        let pattern = Mutex::new(TrafficPattern::new());
        let stats = run_object("x.log", data, 10, &pattern).await;

        assert_eq!(stats.records_matched, 1);
    }

    #[tokio::test]
    async fn test_header_only_object_matches_nothing() {
        let data = "action,flow-direction,srcaddr,dstaddr,dstport,protocol\n";

        let pattern = Mutex::new(TrafficPattern::new());
        let stats = run_object("x.log", data, 8, &pattern).await;

        assert_eq!(stats.records_matched, 0);
        assert!(pattern.into_inner().unwrap().is_empty());
    }

    #[test]
    fn test_out_of_window_objects_never_enter_fetch_set() {
        let now = Utc::now();
        let window = SampleWindow::ending_at(now, 7);

        let fresh = FlowLogObject {
            key: "fresh.log".to_string(),
            size: 10,
            last_modified: Some(now - ChronoDuration::hours(1)),
        };
        let stale = FlowLogObject {
            key: "stale.log".to_string(),
            size: 10,
            last_modified: Some(now - ChronoDuration::days(30)),
        };

        let mut stats = AnalysisStats::new();
        let to_fetch: Vec<FlowLogObject> = vec![fresh, stale]
            .into_iter()
            .filter_map(|obj| admit_to_window(obj, &window, &mut stats))
            .collect();

        // The stale object is excluded before fetching: zero fetch calls for it
        let keys: Vec<&str> = to_fetch.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["fresh.log"]);
        assert_eq!(stats.objects_listed, 2);
        assert_eq!(stats.objects_outside_window, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_fetch_times_out_as_fetch_error() {
        let pattern = Mutex::new(TrafficPattern::new());
        let stalled = futures::stream::pending::<Result<Bytes>>();

        let result = process_with_deadline(
            "slow.log",
            stalled,
            Duration::from_secs(300),
            &RowPredicate::accepted_egress(),
            &pattern,
        )
        .await;

        assert!(matches!(result, Err(FgError::Fetch { .. })));
        assert!(pattern.into_inner().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_within_deadline_is_unaffected() {
        let pattern = Mutex::new(TrafficPattern::new());

        let stats = process_with_deadline(
            "b.log",
            chunk_stream(OBJECT_B.as_bytes(), 16),
            Duration::from_secs(300),
            &RowPredicate::accepted_egress(),
            &pattern,
        )
        .await
        .unwrap();

        assert_eq!(stats.records_matched, 1);
    }

    #[tokio::test]
    async fn test_cancel_flag_skips_pending_fetches_keeps_aggregate() {
        let pattern = Mutex::new(TrafficPattern::new());
        run_object("a.log", OBJECT_A, 64, &pattern).await;

        let cancel = AtomicBool::new(true);
        let fetches_issued = std::sync::atomic::AtomicUsize::new(0);
        let mut stats = AnalysisStats::new();
        let queued = vec![
            FlowLogObject {
                key: "b.log".to_string(),
                size: 10,
                last_modified: None,
            },
            FlowLogObject {
                key: "c.log".to_string(),
                size: 10,
                last_modified: None,
            },
        ];

        process_batch(queued, 2, &cancel, None, &mut stats, |_obj| {
            fetches_issued.fetch_add(1, Ordering::Relaxed);
            async { Ok(ObjectStats::default()) }
        })
        .await
        .unwrap();

        assert_eq!(fetches_issued.load(Ordering::Relaxed), 0);
        assert_eq!(stats.objects_cancelled, 2);
        assert_eq!(stats.objects_processed, 0);

        // What was aggregated before the interrupt stays renderable
        let pattern = pattern.into_inner().unwrap();
        assert_eq!(
            sorted_values(&pattern, "10.0.0.1", "dstaddr"),
            vec!["8.8.8.8"]
        );
    }

    #[tokio::test]
    async fn test_batch_skips_fetch_errors_but_aborts_on_fatal() {
        let cancel = AtomicBool::new(false);
        let obj = FlowLogObject {
            key: "a.log".to_string(),
            size: 1,
            last_modified: None,
        };

        // A fetch failure skips the one object and the batch continues
        let mut stats = AnalysisStats::new();
        process_batch(vec![obj.clone()], 1, &cancel, None, &mut stats, |obj| {
            async move { Err(FgError::fetch(&obj.key, "connection reset")) }
        })
        .await
        .unwrap();
        assert_eq!(stats.objects_failed, 1);

        // A fatally classified error aborts the whole batch
        let mut stats = AnalysisStats::new();
        let result = process_batch(vec![obj], 1, &cancel, None, &mut stats, |_obj| async {
            Err(FgError::Listing {
                bucket: "flow-logs".to_string(),
                reason: "access denied".to_string(),
            })
        })
        .await;
        assert!(matches!(result, Err(FgError::Listing { .. })));
    }

    #[test]
    fn test_analyzer_config_defaults() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.fetch_timeout, Duration::from_secs(300));
    }
}

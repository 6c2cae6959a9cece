//! Progress reporting for flowguard.

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use fg_ingest::analyzer::ProgressObserver;
use fg_ingest::stats::ObjectStats;

/// Periodic stderr progress reporter for analysis runs.
pub struct ProgressReporter {
    /// Whether progress reporting is enabled
    enabled: bool,
    /// Reporting interval
    interval: Duration,
    /// Shared state for progress tracking
    state: Arc<ProgressState>,
    /// Handle to the background reporter task
    handle: Option<JoinHandle<()>>,
}

/// Shared state for progress tracking.
struct ProgressState {
    /// Objects fully processed
    objects_processed: AtomicUsize,
    /// Objects skipped after a failed fetch
    objects_failed: AtomicUsize,
    /// Records that matched the filter
    records_matched: AtomicUsize,
    /// Bytes of object bodies read
    bytes_read: AtomicU64,
    /// Whether to stop reporting
    stop: AtomicBool,
    /// Start time
    start_time: Instant,
}

impl ProgressReporter {
    /// Create a new progress reporter.
    pub fn new(enabled: bool, interval_secs: u64) -> Self {
        Self {
            enabled,
            interval: Duration::from_secs(interval_secs),
            state: Arc::new(ProgressState {
                objects_processed: AtomicUsize::new(0),
                objects_failed: AtomicUsize::new(0),
                records_matched: AtomicUsize::new(0),
                bytes_read: AtomicU64::new(0),
                stop: AtomicBool::new(false),
                start_time: Instant::now(),
            }),
            handle: None,
        }
    }

    /// Observer handle to hand to the analyzer.
    pub fn observer(&self) -> Arc<dyn ProgressObserver> {
        Arc::new(Observer {
            state: Arc::clone(&self.state),
        })
    }

    /// Start the background progress reporter.
    pub fn start(&mut self) {
        if !self.enabled {
            return;
        }

        let state = Arc::clone(&self.state);
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.tick().await; // Skip first immediate tick

            loop {
                interval_timer.tick().await;

                if state.stop.load(Ordering::Relaxed) {
                    break;
                }

                let objects = state.objects_processed.load(Ordering::Relaxed);
                let failed = state.objects_failed.load(Ordering::Relaxed);
                let records = state.records_matched.load(Ordering::Relaxed);
                let bytes = state.bytes_read.load(Ordering::Relaxed);
                let elapsed = state.start_time.elapsed();

                let _ = writeln!(
                    io::stderr(),
                    "[Progress] {} objects processed ({} failed), {} records matched, {} read ({:.1}s elapsed)",
                    objects,
                    failed,
                    records,
                    format_bytes(bytes),
                    elapsed.as_secs_f64()
                );
            }
        });

        self.handle = Some(handle);
    }

    /// Stop the progress reporter and print final stats.
    pub async fn stop(mut self) {
        if !self.enabled {
            return;
        }

        self.state.stop.store(true, Ordering::Relaxed);

        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }

        let objects = self.state.objects_processed.load(Ordering::Relaxed);
        let records = self.state.records_matched.load(Ordering::Relaxed);
        let bytes = self.state.bytes_read.load(Ordering::Relaxed);
        let elapsed = self.state.start_time.elapsed();

        let _ = writeln!(
            io::stderr(),
            "[Progress] Complete: {} objects processed, {} records matched, {} ({:.1}s)",
            objects,
            records,
            format_bytes(bytes),
            elapsed.as_secs_f64()
        );
    }
}

struct Observer {
    state: Arc<ProgressState>,
}

impl ProgressObserver for Observer {
    fn object_completed(&self, stats: &ObjectStats) {
        self.state.objects_processed.fetch_add(1, Ordering::Relaxed);
        self.state
            .records_matched
            .fetch_add(stats.records_matched, Ordering::Relaxed);
        self.state
            .bytes_read
            .fetch_add(stats.bytes_read, Ordering::Relaxed);
    }

    fn object_failed(&self) {
        self.state.objects_failed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Format bytes as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

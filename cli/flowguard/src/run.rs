//! Main execution logic for the flowguard CLI.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use fg_ingest::report::{ConsoleSink, FileSink, ReportSink, write_report};
use fg_ingest::{
    Analyzer, AnalyzerConfig, AnalysisOutcome, BucketLocator, S3Config, SampleWindow,
    create_s3_client,
};
use tracing::Level;
use tracing_subscriber::fmt;

use crate::args::{Cli, LogLevel};
use crate::progress::ProgressReporter;

/// Initialize logging.
///
/// Logs go to stderr so stdout stays clean for the rendered table.
pub fn init_logging(level: LogLevel) -> Result<()> {
    let level: Level = level.into();

    let subscriber = fmt::Subscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr);

    subscriber.init();

    Ok(())
}

/// Execute the analyzer with the provided arguments.
pub async fn execute(args: Cli) -> Result<AnalysisOutcome> {
    // Locator and window are parsed once here and threaded explicitly into
    // the pipeline; nothing reads them from ambient state.
    let locator = BucketLocator::parse(&args.locator)?;
    let window = SampleWindow::trailing_days(args.sample_days);

    let mut s3_config = S3Config::new().with_region(&args.region);

    if let Some(endpoint) = &args.s3_endpoint {
        s3_config = s3_config.with_endpoint(endpoint);
    }

    if let (Some(access_key), Some(secret_key)) = (&args.access_key, &args.secret_key) {
        s3_config = s3_config.with_credentials(access_key, secret_key);
    }

    if let Some(profile) = &args.profile {
        s3_config = s3_config.with_profile(profile);
    }

    let client = create_s3_client(&s3_config).await?;

    let config = AnalyzerConfig {
        concurrency: args.concurrency,
        fetch_timeout: Duration::from_secs(args.fetch_timeout_secs),
        ..AnalyzerConfig::default()
    };

    let mut progress = ProgressReporter::new(!args.no_progress, args.progress_interval_secs);
    progress.start();

    // Ctrl-C stops new fetches; in-flight objects drain and whatever was
    // aggregated so far still makes it into the report.
    let cancel = Arc::new(AtomicBool::new(false));
    let signal_cancel = Arc::clone(&cancel);
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted; finishing in-flight objects...");
            signal_cancel.store(true, Ordering::Relaxed);
        }
    });

    let analyzer = Analyzer::new(client, locator, window, config)
        .with_progress(progress.observer())
        .with_cancellation(cancel);

    let run_result = analyzer.run().await;
    signal_task.abort();
    progress.stop().await;
    let mut outcome = run_result?;

    // Render once, deliver to both sinks; a sink failure is reported but
    // never suppresses the other sink.
    let sinks: Vec<Box<dyn ReportSink>> = vec![
        Box::new(ConsoleSink),
        Box::new(FileSink::new(&args.output)),
    ];

    for failure in write_report(&outcome.pattern, &sinks).await {
        outcome.stats.record_error(failure);
    }

    Ok(outcome)
}

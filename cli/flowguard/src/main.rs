//! flowguard CLI
//!
//! VPC flow-log traffic profiler.

use clap::Parser;

mod args;
mod progress;
mod run;

use args::Cli;
use progress::format_bytes;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    // Logging goes to stderr so stdout is clean for the rendered table
    if let Err(e) = run::init_logging(args.log_level) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(2);
    }

    let outcome = match run::execute(args).await {
        Ok(outcome) => outcome,
        Err(e) => {
            // Fatal: bad locator or a failed listing
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };

    let stats = &outcome.stats;

    eprintln!();
    eprintln!("Analysis completed:");
    eprintln!("  Objects listed:    {}", stats.objects_listed);
    eprintln!("  Outside window:    {}", stats.objects_outside_window);
    eprintln!("  Objects processed: {}", stats.objects_processed);
    eprintln!("  Objects failed:    {}", stats.objects_failed);
    if stats.objects_cancelled > 0 {
        eprintln!("  Cancelled:         {}", stats.objects_cancelled);
    }
    eprintln!("  Records matched:   {}", stats.records_matched);
    eprintln!("  Records filtered:  {}", stats.records_filtered);
    eprintln!("  Records malformed: {}", stats.records_malformed);
    eprintln!("  Bytes read:        {}", format_bytes(stats.bytes_read));
    eprintln!("  Source addresses:  {}", outcome.pattern.len());
    eprintln!("  Errors:            {}", stats.error_count());

    if let Some(duration) = stats.duration() {
        eprintln!(
            "  Duration:          {:.2}s",
            duration.num_milliseconds() as f64 / 1000.0
        );

        if let Some(rps) = stats.records_per_second() {
            eprintln!("  Throughput:        {:.1} records/sec", rps);
        }
    }

    // Skipped objects, rows, and sinks are reported but do not fail the
    // run; only locator and listing failures exit non-zero.
    for error in &stats.errors {
        eprintln!("  Error: {}", error);
    }
}

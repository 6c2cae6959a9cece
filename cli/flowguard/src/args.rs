//! CLI argument definitions for flowguard.

use clap::{Parser, ValueEnum};

/// FlowGuard: VPC flow-log traffic profiler.
///
/// Streams flow-log objects from an S3 bucket, keeps accepted egress
/// records from the trailing sample window, and aggregates them into a
/// per-source-address traffic profile written to stdout and a report file.
///
/// ## Examples
///
/// Basic usage:
///   flowguard arn:aws:s3:::flow-logs/vpc/ --sample-days 7
///
/// Against LocalStack:
///   flowguard s3://flow-logs/vpc/ --s3-endpoint http://localhost:4566 \
///       --access-key test --secret-key test
#[derive(Parser, Debug)]
#[command(name = "flowguard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Bucket locator: an ARN (arn:aws:s3:::bucket/prefix) or s3:// URI
    pub locator: String,

    /// Trailing window in days for object inclusion
    #[arg(short = 'd', long, default_value = "7", value_parser = parse_positive_u32)]
    pub sample_days: u32,

    // === S3 Configuration ===
    /// AWS region
    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    pub region: String,

    /// Custom S3 endpoint URL (for LocalStack)
    #[arg(long, env = "FG_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS access key ID
    #[arg(long, env = "AWS_ACCESS_KEY_ID")]
    pub access_key: Option<String>,

    /// AWS secret access key
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY")]
    pub secret_key: Option<String>,

    /// AWS profile name
    #[arg(long, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    // === Processing Options ===
    /// Objects processed concurrently (must be >= 1)
    #[arg(long, default_value = "3", value_parser = parse_positive_usize)]
    pub concurrency: usize,

    /// Per-object fetch timeout in seconds
    #[arg(long, default_value = "300")]
    pub fetch_timeout_secs: u64,

    // === Output Options ===
    /// Path for the durable report file
    #[arg(short, long, default_value = fg_ingest::report::DEFAULT_REPORT_PATH)]
    pub output: String,

    /// Disable periodic progress reporting on stderr
    #[arg(long)]
    pub no_progress: bool,

    /// Progress reporting interval in seconds
    #[arg(long, default_value = "5")]
    pub progress_interval_secs: u64,

    // === Logging Options ===
    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

/// Log level argument.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Trace level (most verbose)
    Trace,
    /// Debug level
    Debug,
    /// Info level (default)
    Info,
    /// Warning level
    Warn,
    /// Error level (least verbose)
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Parse a positive usize (>= 1).
fn parse_positive_usize(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if value < 1 {
        return Err(format!("{} is not in 1..", value));
    }
    Ok(value)
}

/// Parse a positive u32 (>= 1).
fn parse_positive_u32(s: &str) -> Result<u32, String> {
    let value: u32 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if value < 1 {
        return Err(format!("{} is not in 1..", value));
    }
    Ok(value)
}

//! Configuration constants and CLI options.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Fixed unit for moving body bytes between the receive buffer and a
/// body-stream sink or sized memory object.
pub const TRANSFER_CHUNK_SIZE: usize = 64 * 1024;

/// In-flight capacity of the streamed-body pipe. The pump suspends once the
/// consumer lags by more than this.
pub const STREAM_WINDOW: usize = TRANSFER_CHUNK_SIZE;

/// Default port for `http` URLs.
pub const DEFAULT_HTTP_PORT: u16 = 80;
/// Default port for `https` URLs.
pub const DEFAULT_HTTPS_PORT: u16 = 443;

/// Maximum number of redirect hops the loader follows.
/// Prevents infinite redirect loops.
pub const MAX_REDIRECT_HOPS: usize = 10;

/// DNS query timeout in seconds.
pub const DNS_TIMEOUT_SECS: u64 = 10;

/// Logging level for the CLI binary.
///
/// Controls the verbosity of log output, from most restrictive (Error) to
/// most verbose (Trace). Used with the `--log-level` option.
#[derive(Clone, Debug, ValueEnum)]
#[allow(missing_docs)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Command-line options for the CLI binary.
///
/// Generated by `clap` from the field attributes.
#[derive(Debug, Parser)]
#[command(
    name = "http_loader",
    about = "Fetches a URL with the built-in HTTP/1.1 client."
)]
pub struct Opt {
    /// URL to fetch (http or https)
    #[arg(value_parser)]
    pub url: String,

    /// HTTP method
    #[arg(long, default_value = "GET")]
    pub method: String,

    /// Extra request header as "Name: value" (repeatable)
    #[arg(long = "header", short = 'H')]
    pub headers: Vec<String>,

    /// Request body as a literal string
    #[arg(long)]
    pub data: Option<String>,

    /// Request body read from a file (appended after --data)
    #[arg(long)]
    pub data_file: Option<PathBuf>,

    /// Deliver the response body as a live stream instead of buffering it
    #[arg(long)]
    pub stream: bool,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,
}

use clap::Parser;
use std::time::Duration;

use super::defaults::DEFAULT_TOTAL_REQUESTS;
use super::parsers::{
    parse_bool_env, parse_duration_arg, parse_header, parse_http_method, parse_positive_usize,
};
use super::types::{AverageMode, HttpMethod, OutputFormat, PositiveUsize, TransportErrorPolicy};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Fixed-count async HTTP/1.1 load tester - bounded worker pool, per-request connect/TTFB tracing, connection reuse stats."
)]
pub struct RunArgs {
    /// Endpoint URL for load testing
    #[arg(long, short)]
    pub url: Option<String>,

    /// Total number of requests to make
    #[arg(short = 'n', long = "requests", default_value_t = DEFAULT_TOTAL_REQUESTS)]
    pub total_requests: u64,

    /// Number of concurrent requests (workers and connection pool size)
    #[arg(
        short = 'c',
        long = "concurrency",
        default_value = "1",
        value_parser = parse_positive_usize
    )]
    pub concurrency: PositiveUsize,

    /// HTTP method to use (GET, HEAD, POST, PUT, PATCH, DELETE, CONNECT, OPTIONS, TRACE)
    #[arg(long, short = 'X', default_value = "GET", value_parser = parse_http_method)]
    pub method: HttpMethod,

    /// Request body sent with each request
    #[arg(long, short = 'd')]
    pub body: Option<String>,

    /// Extra HTTP headers in 'Key: Value' format (repeatable)
    #[arg(long = "header", short = 'H', value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Per-request timeout covering connect, response and body (supports ms/s/m/h)
    #[arg(long = "timeout", value_parser = parse_duration_arg)]
    pub request_timeout: Option<Duration>,

    /// Timeout for establishing a new connection (supports ms/s/m/h)
    #[arg(long = "connect-timeout", value_parser = parse_duration_arg)]
    pub connect_timeout: Option<Duration>,

    /// What a transport error does to the run: abort it, or record a failed request
    #[arg(long = "on-transport-error", value_enum, default_value = "abort")]
    pub on_transport_error: TransportErrorPolicy,

    /// Latency averaging: 'running' halves toward each new sample, 'mean' is arithmetic
    #[arg(long = "average", value_enum, default_value = "running")]
    pub average: AverageMode,

    /// Format of the final report
    #[arg(long = "output-format", value_enum, default_value = "text")]
    pub output_format: OutputFormat,

    /// Disable the progress bar
    #[arg(long = "no-progress")]
    pub no_progress: bool,

    /// Disable colored output
    #[arg(long = "no-color", env = "NO_COLOR", value_parser = parse_bool_env)]
    pub no_color: bool,

    /// Path to a TOML/JSON config file (defaults to ./volley.toml or ./volley.json)
    #[arg(long)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(long, short)]
    pub verbose: bool,
}

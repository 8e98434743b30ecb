//! CLI argument types and parsing helpers.
mod cli;
mod defaults;
pub(crate) mod parsers;
mod types;

#[cfg(test)]
mod tests;

pub use cli::RunArgs;
pub use defaults::{DEFAULT_CONCURRENCY, DEFAULT_TOTAL_REQUESTS, DEFAULT_USER_AGENT};
pub use types::{AverageMode, HttpMethod, OutputFormat, PositiveUsize, TransportErrorPolicy};

pub(crate) use parsers::{parse_duration_arg, parse_header};

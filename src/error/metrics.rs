use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Result channel closed after {received} of {expected} results.")]
    ResultsClosed { received: u64, expected: u64 },
}

use thiserror::Error;

use super::{ConfigError, HttpError, MetricsError, ValidationError};

/// Exit code for any failure that is neither a configuration nor a transport error.
pub const EXIT_FAILURE: u8 = 1;
/// Exit code for configuration and validation failures (no requests were sent).
pub const EXIT_CONFIG_ERROR: u8 = 2;
/// Exit code for a fatal transport error that aborted a run.
pub const EXIT_TRANSPORT_ERROR: u8 = 3;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("CLI error: {source}")]
    Clap {
        #[from]
        source: clap::Error,
    },
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
    #[error("Join error: {source}")]
    Join {
        #[from]
        source: tokio::task::JoinError,
    },
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),
    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation<E>(error: E) -> Self
    where
        E: Into<ValidationError>,
    {
        error.into().into()
    }

    pub fn config<E>(error: E) -> Self
    where
        E: Into<ConfigError>,
    {
        error.into().into()
    }

    pub fn http<E>(error: E) -> Self
    where
        E: Into<HttpError>,
    {
        error.into().into()
    }

    pub fn metrics<E>(error: E) -> Self
    where
        E: Into<MetricsError>,
    {
        error.into().into()
    }

    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            AppError::Clap { .. } | AppError::Validation(_) | AppError::Config(_) => {
                EXIT_CONFIG_ERROR
            }
            AppError::Http(_) => EXIT_TRANSPORT_ERROR,
            AppError::Io { .. }
            | AppError::Json { .. }
            | AppError::Join { .. }
            | AppError::Metrics(_) => EXIT_FAILURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_separate_config_and_transport_failures() -> Result<(), String> {
        let config = AppError::validation(ValidationError::MissingUrl);
        if config.exit_code() != EXIT_CONFIG_ERROR {
            return Err(format!("Unexpected config exit code: {}", config.exit_code()));
        }
        let transport = AppError::http(HttpError::TlsUnavailable {
            host: "localhost".to_owned(),
        });
        if transport.exit_code() != EXIT_TRANSPORT_ERROR {
            return Err(format!(
                "Unexpected transport exit code: {}",
                transport.exit_code()
            ));
        }
        let metrics = AppError::metrics(MetricsError::ResultsClosed {
            received: 1,
            expected: 2,
        });
        if metrics.exit_code() != EXIT_FAILURE {
            return Err(format!("Unexpected metrics exit code: {}", metrics.exit_code()));
        }
        Ok(())
    }
}

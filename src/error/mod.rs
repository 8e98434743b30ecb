mod app;
mod config;
mod http;
mod metrics;
mod validation;

pub use app::{AppError, AppResult, EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_TRANSPORT_ERROR};
pub use config::ConfigError;
pub use http::{HttpError, TransportFailure};
pub use metrics::MetricsError;
pub use validation::ValidationError;

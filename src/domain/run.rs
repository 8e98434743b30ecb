use std::time::Duration;

use url::Url;

use crate::args::{AverageMode, HttpMethod, PositiveUsize, RunArgs, TransportErrorPolicy};
use crate::error::ValidationError;

/// Upper bound for `c`; one task and one pooled connection are created per unit.
pub const MAX_CONCURRENCY: usize = 1_000_000;

/// Everything one run needs, validated once before any task starts.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub url: Url,
    pub total_requests: u64,
    pub concurrency: PositiveUsize,
    pub method: HttpMethod,
    pub body: Option<String>,
    pub headers: Vec<(String, String)>,
    pub request_timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub error_policy: TransportErrorPolicy,
    pub average: AverageMode,
}

impl RunConfig {
    /// A GET run with default policies.
    ///
    /// # Errors
    ///
    /// Returns an error when `url` is not an absolute http(s) URL or when
    /// `concurrency` exceeds [`MAX_CONCURRENCY`].
    pub fn new(
        url: &str,
        total_requests: u64,
        concurrency: PositiveUsize,
    ) -> Result<Self, ValidationError> {
        if concurrency.get() > MAX_CONCURRENCY {
            return Err(ValidationError::ConcurrencyTooLarge {
                value: concurrency.get(),
                max: MAX_CONCURRENCY,
            });
        }
        Ok(Self {
            url: parse_target_url(url)?,
            total_requests,
            concurrency,
            method: HttpMethod::Get,
            body: None,
            headers: Vec::new(),
            request_timeout: None,
            connect_timeout: None,
            error_policy: TransportErrorPolicy::default(),
            average: AverageMode::default(),
        })
    }

    /// Builds the run configuration from parsed (and config-merged) arguments.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL is missing or invalid.
    pub fn from_args(args: &RunArgs) -> Result<Self, ValidationError> {
        let url = args.url.as_deref().ok_or(ValidationError::MissingUrl)?;
        let mut config = Self::new(url, args.total_requests, args.concurrency)?;
        config.method = args.method;
        config.body = args.body.clone();
        config.headers = args.headers.clone();
        config.request_timeout = args.request_timeout;
        config.connect_timeout = args.connect_timeout;
        config.error_policy = args.on_transport_error;
        config.average = args.average;
        Ok(config)
    }

    #[must_use]
    pub fn uses_tls(&self) -> bool {
        self.url.scheme() == "https"
    }
}

/// Parses an absolute endpoint URL; only http and https are accepted.
///
/// # Errors
///
/// Returns an error for relative, malformed, host-less or non-http URLs.
pub fn parse_target_url(value: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(value.trim()).map_err(|err| ValidationError::InvalidUrl {
        value: value.to_owned(),
        source: err,
    })?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ValidationError::UnsupportedScheme {
                scheme: other.to_owned(),
            });
        }
    }
    if url.host().is_none() {
        return Err(ValidationError::MissingHost {
            value: value.to_owned(),
        });
    }
    Ok(url)
}

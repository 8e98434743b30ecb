use std::time::Duration;

use serde::Deserialize;

use crate::args::{AverageMode, HttpMethod, OutputFormat, TransportErrorPolicy, parse_duration_arg};
use crate::error::ValidationError;

/// On-disk configuration. Every key is optional and mirrors a long CLI flag.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub url: Option<String>,
    #[serde(alias = "n")]
    pub requests: Option<u64>,
    #[serde(alias = "c")]
    pub concurrency: Option<usize>,
    pub method: Option<HttpMethod>,
    pub body: Option<String>,
    pub headers: Option<Vec<String>>,
    pub timeout: Option<DurationValue>,
    pub connect_timeout: Option<DurationValue>,
    pub on_transport_error: Option<TransportErrorPolicy>,
    pub average: Option<AverageMode>,
    pub output_format: Option<OutputFormat>,
    pub no_progress: Option<bool>,
    pub no_color: Option<bool>,
}

/// A duration given either as whole seconds or as text such as `"500ms"`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self) -> Result<Duration, ValidationError> {
        match self {
            DurationValue::Seconds(0) => Err(ValidationError::DurationZero),
            DurationValue::Seconds(secs) => Ok(Duration::from_secs(*secs)),
            DurationValue::Text(text) => parse_duration_arg(text),
        }
    }
}

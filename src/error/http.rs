use std::time::Duration;

use thiserror::Error;

/// Coarse classification of a failed exchange, carried in result records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    Connect,
    Tls,
    Handshake,
    Request,
    Body,
    Timeout,
}

impl TransportFailure {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TransportFailure::Connect => "connect",
            TransportFailure::Tls => "tls",
            TransportFailure::Handshake => "handshake",
            TransportFailure::Request => "request",
            TransportFailure::Body => "body",
            TransportFailure::Timeout => "timeout",
        }
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Timed out connecting to {addr} after {after:?}.")]
    ConnectTimeout {
        addr: String,
        after: Duration,
        #[source]
        source: tokio::time::error::Elapsed,
    },
    #[error("Failed to build TLS connector: {source}")]
    TlsConnector {
        #[source]
        source: native_tls::Error,
    },
    #[error("TLS is not enabled for this transport (host {host}).")]
    TlsUnavailable { host: String },
    #[error("TLS handshake with {host} failed: {source}")]
    Tls {
        host: String,
        #[source]
        source: native_tls::Error,
    },
    #[error("HTTP/1.1 handshake failed: {source}")]
    Handshake {
        #[source]
        source: hyper::Error,
    },
    #[error("Connection pool for {addr} was closed.")]
    PoolClosed {
        addr: String,
        #[source]
        source: tokio::sync::AcquireError,
    },
    #[error("Request failed: {source}")]
    Request {
        #[source]
        source: hyper::Error,
    },
    #[error("Failed to read response body: {source}")]
    Body {
        #[source]
        source: hyper::Error,
    },
    #[error("Request timed out after {after:?}.")]
    Timeout {
        after: Duration,
        #[source]
        source: tokio::time::error::Elapsed,
    },
}

impl HttpError {
    #[must_use]
    pub const fn failure(&self) -> TransportFailure {
        match self {
            HttpError::Connect { .. } | HttpError::PoolClosed { .. } => TransportFailure::Connect,
            HttpError::ConnectTimeout { .. } | HttpError::Timeout { .. } => {
                TransportFailure::Timeout
            }
            HttpError::TlsConnector { .. }
            | HttpError::TlsUnavailable { .. }
            | HttpError::Tls { .. } => TransportFailure::Tls,
            HttpError::Handshake { .. } => TransportFailure::Handshake,
            HttpError::Request { .. } => TransportFailure::Request,
            HttpError::Body { .. } => TransportFailure::Body,
        }
    }
}

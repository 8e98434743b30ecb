use std::fmt;
use std::time::Duration;

use crate::error::TransportFailure;

/// What happened to one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Status(u16),
    TransportError(TransportFailure),
}

impl Outcome {
    /// Only an exact 200 counts as success.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Outcome::Status(200))
    }
}

/// How a request got its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionUse {
    New,
    Reused,
}

/// Timings captured for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestTrace {
    /// Zero when the connection was reused.
    pub time_to_connect: Duration,
    /// From request start to the response head.
    pub time_to_first_byte: Duration,
    /// From request start to the end of the body.
    pub total: Duration,
    /// `None` when the request failed before a connection was obtained.
    pub connection: Option<ConnectionUse>,
    pub response_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultRecord {
    pub outcome: Outcome,
    pub trace: RequestTrace,
}

impl ResultRecord {
    #[must_use]
    pub const fn new(outcome: Outcome, trace: RequestTrace) -> Self {
        Self { outcome, trace }
    }
}

/// Requests per second in hundredths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct RequestRate(u64);

impl RequestRate {
    /// `count / elapsed`, zero when no time has elapsed.
    #[must_use]
    pub fn from_count(count: u64, elapsed: Duration) -> Self {
        let micros = elapsed.as_micros();
        let scaled = u128::from(count)
            .saturating_mul(100)
            .saturating_mul(1_000_000)
            .checked_div(micros)
            .unwrap_or(0);
        Self(u64::try_from(scaled).unwrap_or(u64::MAX))
    }

    #[must_use]
    pub const fn hundredths(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for RequestRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0.checked_div(100).unwrap_or(0);
        let fraction = self.0.checked_rem(100).unwrap_or(0);
        write!(f, "{}.{:02}", whole, fraction)
    }
}

/// Transport failures broken down by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransportErrorCounts {
    connect: u64,
    tls: u64,
    handshake: u64,
    request: u64,
    body: u64,
    timeout: u64,
}

impl TransportErrorCounts {
    pub const fn record(&mut self, kind: TransportFailure) {
        let slot = match kind {
            TransportFailure::Connect => &mut self.connect,
            TransportFailure::Tls => &mut self.tls,
            TransportFailure::Handshake => &mut self.handshake,
            TransportFailure::Request => &mut self.request,
            TransportFailure::Body => &mut self.body,
            TransportFailure::Timeout => &mut self.timeout,
        };
        *slot = slot.saturating_add(1);
    }

    #[must_use]
    pub const fn get(&self, kind: TransportFailure) -> u64 {
        match kind {
            TransportFailure::Connect => self.connect,
            TransportFailure::Tls => self.tls,
            TransportFailure::Handshake => self.handshake,
            TransportFailure::Request => self.request,
            TransportFailure::Body => self.body,
            TransportFailure::Timeout => self.timeout,
        }
    }

    /// Every kind with its count, in a stable order.
    #[must_use]
    pub const fn by_kind(&self) -> [(TransportFailure, u64); 6] {
        [
            (TransportFailure::Connect, self.connect),
            (TransportFailure::Tls, self.tls),
            (TransportFailure::Handshake, self.handshake),
            (TransportFailure::Request, self.request),
            (TransportFailure::Body, self.body),
            (TransportFailure::Timeout, self.timeout),
        ]
    }
}

/// Final snapshot of a run; immutable once the evaluator is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateStats {
    pub total_requests: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Subset of `failed` that never produced a status code.
    pub transport_errors: u64,
    pub transport_error_kinds: TransportErrorCounts,
    pub elapsed: Duration,
    pub requests_per_second: RequestRate,
    pub avg_latency: Duration,
    pub min_latency: Duration,
    pub max_latency: Duration,
    pub avg_time_to_first_byte: Duration,
    pub new_connections: u64,
    pub reused_connections: u64,
    pub time_connecting: Duration,
    pub bytes_received: u64,
}

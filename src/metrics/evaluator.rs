use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use crate::args::AverageMode;
use crate::error::MetricsError;

use super::{
    AggregateStats, ConnectionUse, Outcome, ProgressCounter, RequestRate, ResultRecord,
    RunningAverage, TransportErrorCounts,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluatorState {
    Running,
    Finalizing,
    Done,
}

/// Single owner of the run's aggregate; consumes exactly `total` records.
#[derive(Debug)]
pub struct Evaluator {
    total: u64,
    state: EvaluatorState,
    progress: ProgressCounter,
    received: u64,
    succeeded: u64,
    failed: u64,
    transport_errors: u64,
    transport_error_kinds: TransportErrorCounts,
    latency: RunningAverage,
    time_to_first_byte: RunningAverage,
    min_latency: Option<Duration>,
    max_latency: Duration,
    new_connections: u64,
    reused_connections: u64,
    time_connecting: Duration,
    bytes_received: u64,
}

impl Evaluator {
    #[must_use]
    pub fn new(total: u64, average: AverageMode, progress: ProgressCounter) -> Self {
        let state = if total == 0 {
            EvaluatorState::Finalizing
        } else {
            EvaluatorState::Running
        };
        Self {
            total,
            state,
            progress,
            received: 0,
            succeeded: 0,
            failed: 0,
            transport_errors: 0,
            transport_error_kinds: TransportErrorCounts::default(),
            latency: RunningAverage::new(average),
            time_to_first_byte: RunningAverage::new(average),
            min_latency: None,
            max_latency: Duration::ZERO,
            new_connections: 0,
            reused_connections: 0,
            time_connecting: Duration::ZERO,
            bytes_received: 0,
        }
    }

    #[must_use]
    pub const fn state(&self) -> EvaluatorState {
        self.state
    }

    #[must_use]
    pub const fn received(&self) -> u64 {
        self.received
    }

    /// Folds one record into the aggregate. Records past `total` are ignored.
    pub fn record(&mut self, record: &ResultRecord) {
        if self.state != EvaluatorState::Running {
            debug!("Ignoring result received after completion.");
            return;
        }

        if record.outcome.is_success() {
            self.succeeded = self.succeeded.saturating_add(1);
        } else {
            self.failed = self.failed.saturating_add(1);
            if let Outcome::TransportError(kind) = record.outcome {
                self.transport_errors = self.transport_errors.saturating_add(1);
                self.transport_error_kinds.record(kind);
            }
        }

        let trace = &record.trace;
        self.latency.record(trace.total);
        self.time_to_first_byte.record(trace.time_to_first_byte);
        self.min_latency = Some(
            self.min_latency
                .map_or(trace.total, |current| current.min(trace.total)),
        );
        self.max_latency = self.max_latency.max(trace.total);
        match trace.connection {
            Some(ConnectionUse::New) => {
                self.new_connections = self.new_connections.saturating_add(1);
            }
            Some(ConnectionUse::Reused) => {
                self.reused_connections = self.reused_connections.saturating_add(1);
            }
            None => {}
        }
        self.time_connecting = self.time_connecting.saturating_add(trace.time_to_connect);
        self.bytes_received = self.bytes_received.saturating_add(trace.response_bytes);

        self.received = self.received.saturating_add(1);
        self.progress.increment();
        if self.received >= self.total {
            self.state = EvaluatorState::Finalizing;
        }
    }

    /// Produces the final snapshot; `elapsed` is the whole run's duration.
    pub fn finish(&mut self, elapsed: Duration) -> AggregateStats {
        self.state = EvaluatorState::Done;
        AggregateStats {
            total_requests: self.total,
            succeeded: self.succeeded,
            failed: self.failed,
            transport_errors: self.transport_errors,
            transport_error_kinds: self.transport_error_kinds,
            elapsed,
            requests_per_second: RequestRate::from_count(self.succeeded, elapsed),
            avg_latency: self.latency.value(),
            min_latency: self.min_latency.unwrap_or(Duration::ZERO),
            max_latency: self.max_latency,
            avg_time_to_first_byte: self.time_to_first_byte.value(),
            new_connections: self.new_connections,
            reused_connections: self.reused_connections,
            time_connecting: self.time_connecting,
            bytes_received: self.bytes_received,
        }
    }

    /// Consumes records until `total` have arrived, then finalizes.
    ///
    /// # Errors
    ///
    /// Returns an error when the result channel closes before `total` records.
    pub async fn evaluate(
        mut self,
        mut results_rx: mpsc::Receiver<ResultRecord>,
        run_start: Instant,
    ) -> Result<AggregateStats, MetricsError> {
        while self.state == EvaluatorState::Running {
            match results_rx.recv().await {
                Some(record) => self.record(&record),
                None => {
                    return Err(MetricsError::ResultsClosed {
                        received: self.received,
                        expected: self.total,
                    });
                }
            }
        }
        Ok(self.finish(run_start.elapsed()))
    }
}

use std::time::{Duration, Instant};

use crate::metrics::{ConnectionUse, RequestTrace};

/// Lifecycle hooks for one request; finished into a [`RequestTrace`].
#[derive(Debug)]
pub struct TraceRecorder {
    started: Instant,
    connect_started: Option<Instant>,
    time_to_connect: Duration,
    time_to_first_byte: Duration,
    connection: Option<ConnectionUse>,
    response_bytes: u64,
}

impl TraceRecorder {
    #[must_use]
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            connect_started: None,
            time_to_connect: Duration::ZERO,
            time_to_first_byte: Duration::ZERO,
            connection: None,
            response_bytes: 0,
        }
    }

    pub fn connect_start(&mut self) {
        self.connect_started = Some(Instant::now());
    }

    pub fn connect_done(&mut self) {
        if let Some(started) = self.connect_started.take() {
            self.time_to_connect = started.elapsed();
        }
    }

    pub const fn got_connection(&mut self, connection: ConnectionUse) {
        self.connection = Some(connection);
    }

    /// Marks the first response byte, measured from request start.
    pub fn first_byte(&mut self) {
        self.time_to_first_byte = self.started.elapsed();
    }

    pub const fn add_body_bytes(&mut self, len: u64) {
        self.response_bytes = self.response_bytes.saturating_add(len);
    }

    #[must_use]
    pub fn finish(&self) -> RequestTrace {
        RequestTrace {
            time_to_connect: self.time_to_connect,
            time_to_first_byte: self.time_to_first_byte,
            total: self.started.elapsed(),
            connection: self.connection,
            response_bytes: self.response_bytes,
        }
    }
}

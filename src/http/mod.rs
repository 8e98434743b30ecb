//! Request dispatch, the pooled HTTP/1.1 transport and the worker pool.
mod source;
mod trace;
mod transport;
mod worker;


pub use source::{dispatch, spawn_dispatcher};
pub use trace::TraceRecorder;
pub use transport::{ConnectionCounters, Exchange, Transport, TransportConfig};
pub use worker::{WorkerChannels, WorkerSettings, spawn_workers};

//! Core library for the `volley` CLI.
//!
//! A fixed number of requests is fed through a bounded channel to a pool of
//! workers sharing one pooled HTTP/1.1 transport. Each request is traced
//! (connect time, time to first byte, total latency, connection reuse) and a
//! single evaluator folds the results into [`metrics::AggregateStats`].
pub mod app;
pub mod args;
pub mod config;
pub mod domain;
pub mod entry;
pub mod error;
pub mod http;
pub mod logger;
pub mod metrics;
pub mod shutdown;

//! Immutable run inputs: validated configuration and request descriptors.
pub mod request;
pub mod run;

pub use request::{Endpoint, RequestDescriptor, RequestTemplate};
pub use run::{MAX_CONCURRENCY, RunConfig};

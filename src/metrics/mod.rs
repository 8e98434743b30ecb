//! Result aggregation: averages, completion detection and progress.
mod average;
mod evaluator;
mod progress;
mod types;


pub(crate) use average::RunningAverage;
pub use evaluator::{Evaluator, EvaluatorState};
pub use progress::{ProgressCounter, ProgressView};
pub use types::{
    AggregateStats, ConnectionUse, Outcome, RequestRate, RequestTrace, ResultRecord,
    TransportErrorCounts,
};

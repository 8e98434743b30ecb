//! Run orchestration and terminal output.
mod progress;
mod runner;
mod summary;

pub(crate) use progress::setup_progress_indicator;
pub use runner::{LoadTest, run_load_test};
pub(crate) use summary::print_summary;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Completed-request counter. Only the evaluator holds the writer.
#[derive(Debug, Default)]
pub struct ProgressCounter {
    completed: Arc<AtomicU64>,
}

/// Read-only handle for renderers; clone freely.
#[derive(Debug, Clone)]
pub struct ProgressView {
    completed: Arc<AtomicU64>,
}

impl ProgressCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn view(&self) -> ProgressView {
        ProgressView {
            completed: Arc::clone(&self.completed),
        }
    }

    pub(crate) fn increment(&self) {
        self.completed.fetch_add(1, Ordering::Release);
    }
}

impl ProgressView {
    #[must_use]
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }
}

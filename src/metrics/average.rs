use std::time::Duration;

use crate::args::AverageMode;

/// Latency average in either of the two supported modes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RunningAverage {
    mode: AverageMode,
    value_nanos: u128,
    sum_nanos: u128,
    count: u64,
}

impl RunningAverage {
    pub(crate) const fn new(mode: AverageMode) -> Self {
        Self {
            mode,
            value_nanos: 0,
            sum_nanos: 0,
            count: 0,
        }
    }

    pub(crate) fn record(&mut self, sample: Duration) {
        let nanos = sample.as_nanos();
        self.count = self.count.saturating_add(1);
        match self.mode {
            // Two-term average seeded with zero: the first sample counts half.
            AverageMode::Running => {
                self.value_nanos = self
                    .value_nanos
                    .saturating_add(nanos)
                    .checked_div(2)
                    .unwrap_or(0);
            }
            AverageMode::Mean => {
                self.sum_nanos = self.sum_nanos.saturating_add(nanos);
                self.value_nanos = self
                    .sum_nanos
                    .checked_div(u128::from(self.count))
                    .unwrap_or(0);
            }
        }
    }

    pub(crate) fn value(&self) -> Duration {
        Duration::from_nanos(u64::try_from(self.value_nanos).unwrap_or(u64::MAX))
    }
}

//! Time budgets for incremental indexing.

use std::time::{Duration, Instant};

/// Below this much remaining time, indexing stops at the next buffer row.
pub(crate) const MIN_TIME_REMAINING: Duration = Duration::from_millis(2);

/// A budget consulted between buffer rows while indexing.
pub trait Deadline {
    /// Time left before the caller wants control back.
    fn time_remaining(&self) -> Duration;
}

impl Deadline for Instant {
    fn time_remaining(&self) -> Duration {
        self.saturating_duration_since(Instant::now())
    }
}

/// A budget that never runs out.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbounded;

impl Deadline for Unbounded {
    fn time_remaining(&self) -> Duration {
        Duration::MAX
    }
}

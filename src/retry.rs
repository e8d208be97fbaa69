//! Fixed backoff table consulted by attempt index.

use std::time::Duration;

/// Delays used between handshake attempts, in order.
pub const DEFAULT_DELAYS: [Duration; 5] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(5),
    Duration::from_secs(10),
    Duration::from_secs(20),
];

/// Ordered, finite list of delays. No jitter and no growth beyond the table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetrySchedule {
    delays: Vec<Duration>,
}

impl RetrySchedule {
    pub fn new(delays: impl Into<Vec<Duration>>) -> Self {
        Self {
            delays: delays.into(),
        }
    }

    /// A schedule that never retries: the first retryable failure is final.
    pub fn none() -> Self {
        Self { delays: Vec::new() }
    }

    /// Delay to wait after the failure of attempt `index` (zero-based), or
    /// `None` once the table is exhausted.
    pub fn delay(&self, index: usize) -> Option<Duration> {
        self.delays.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.delays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delays.is_empty()
    }

    /// Upper bound on the number of handshakes one `connect()` performs.
    pub fn max_attempts(&self) -> usize {
        self.delays.len() + 1
    }

    /// Sum of every delay in the table.
    pub fn total(&self) -> Duration {
        self.delays.iter().sum()
    }
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self::new(DEFAULT_DELAYS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table() {
        let s = RetrySchedule::default();
        assert_eq!(s.len(), 5);
        assert_eq!(s.delay(0), Some(Duration::from_secs(1)));
        assert_eq!(s.delay(4), Some(Duration::from_secs(20)));
        assert_eq!(s.delay(5), None);
        assert_eq!(s.max_attempts(), 6);
        assert_eq!(s.total(), Duration::from_secs(38));
    }

    #[test]
    fn empty_schedule_is_exhausted_immediately() {
        let s = RetrySchedule::none();
        assert!(s.is_empty());
        assert_eq!(s.delay(0), None);
        assert_eq!(s.max_attempts(), 1);
    }
}

//! Fixed backoff schedule: one delay per attempt, clamped to the last entry.

use std::time::Duration;

/// Default schedule: 1s, 3s, 5s, then 5s for every later attempt.
pub const DEFAULT_DELAYS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(3),
    Duration::from_secs(5),
];

/// Ordered delays indexed by attempt number.
///
/// No exponential growth and no jitter: once the explicit entries run out the
/// last one repeats. An empty schedule means no wait at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffSchedule {
    delays: Vec<Duration>,
}

impl BackoffSchedule {
    pub fn new(delays: impl Into<Vec<Duration>>) -> Self {
        Self {
            delays: delays.into(),
        }
    }

    /// Schedule with no delays (resubmit immediately).
    pub fn none() -> Self {
        Self { delays: Vec::new() }
    }

    pub fn from_millis(ms: &[u64]) -> Self {
        Self::new(ms.iter().map(|&m| Duration::from_millis(m)).collect::<Vec<_>>())
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let Some(last) = self.delays.last() else {
            return Duration::ZERO;
        };
        let idx = attempt.saturating_sub(1) as usize;
        self.delays.get(idx).copied().unwrap_or(*last)
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    pub fn is_empty(&self) -> bool {
        self.delays.is_empty()
    }
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_DELAYS.to_vec())
    }
}

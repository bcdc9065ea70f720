use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::backoff::BackoffSchedule;
use crate::evaluator::{DefaultEvaluator, RetryEvaluator};

/// Default upper bound on resubmissions per request.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Retry configuration shared read-only by every request a stage handles.
///
/// Built once, then only read; cloning shares the same evaluator instance.
#[derive(Clone)]
pub struct RetryPolicy {
    /// Maximum number of resubmissions (not counting the first send).
    pub max_retries: u32,
    /// Delay before each resubmission.
    pub schedule: BackoffSchedule,
    /// Decides whether a given failure is retried.
    pub evaluator: Arc<dyn RetryEvaluator>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            schedule: BackoffSchedule::default(),
            evaluator: Arc::new(DefaultEvaluator::new()),
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("schedule", &self.schedule)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_schedule(mut self, schedule: BackoffSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_evaluator(mut self, evaluator: impl RetryEvaluator + 'static) -> Self {
        self.evaluator = Arc::new(evaluator);
        self
    }

    /// True when retry number `attempt` (1-based) is still allowed.
    pub fn within_budget(&self, attempt: u32) -> bool {
        attempt <= self.max_retries
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.schedule.delay_for(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_retries, 3);
        assert_eq!(p.delay_for(1), Duration::from_secs(1));
        assert_eq!(p.delay_for(3), Duration::from_secs(5));
    }

    #[test]
    fn respects_max_retries() {
        let p = RetryPolicy::default().with_max_retries(2);
        assert!(p.within_budget(1));
        assert!(p.within_budget(2));
        assert!(!p.within_budget(3));
    }

    #[test]
    fn zero_retries_allows_nothing() {
        let p = RetryPolicy::default().with_max_retries(0);
        assert!(!p.within_budget(1));
    }

    #[test]
    fn clones_share_evaluator() {
        let p = RetryPolicy::default();
        let q = p.clone();
        assert!(Arc::ptr_eq(&p.evaluator, &q.evaluator));
    }
}

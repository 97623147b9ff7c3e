// src/dag/budget.rs

//! Task-wide failure budget.

use crate::types::FailureCounting;

/// Counts failures against the task's `max_failures`.
///
/// Advisory only: the scheduler decides what an exceeded budget means.
#[derive(Debug, Clone)]
pub struct FailureBudget {
    limit: u32,
    counting: FailureCounting,
    failed_processes: u32,
    failed_attempts: u32,
}

impl FailureBudget {
    /// `limit = 0` disables the task-level limit entirely.
    pub fn new(limit: u32, counting: FailureCounting) -> Self {
        Self {
            limit,
            counting,
            failed_processes: 0,
            failed_attempts: 0,
        }
    }

    /// Record one failed attempt. `terminal` marks the attempt that made its
    /// process permanently FAILED.
    pub fn record_failure(&mut self, terminal: bool) {
        self.failed_attempts += 1;
        if terminal {
            self.failed_processes += 1;
        }
    }

    /// Distinct processes that reached terminal FAILED.
    pub fn failed_process_count(&self) -> u32 {
        self.failed_processes
    }

    pub fn failed_attempt_count(&self) -> u32 {
        self.failed_attempts
    }

    /// The figure compared against the limit under the configured counting.
    pub fn count(&self) -> u32 {
        match self.counting {
            FailureCounting::Processes => self.failed_processes,
            FailureCounting::Attempts => self.failed_attempts,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Always false when the limit is 0; otherwise true once the count is
    /// strictly greater than the limit.
    pub fn exceeded(&self) -> bool {
        self.limit != 0 && self.count() > self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_limit_is_never_exceeded() {
        let mut budget = FailureBudget::new(0, FailureCounting::Processes);
        for _ in 0..100 {
            budget.record_failure(true);
        }
        assert_eq!(budget.failed_process_count(), 100);
        assert!(!budget.exceeded());
    }

    #[test]
    fn exceeded_only_past_the_limit() {
        let mut budget = FailureBudget::new(1, FailureCounting::Processes);
        budget.record_failure(true);
        assert!(!budget.exceeded());
        budget.record_failure(true);
        assert!(budget.exceeded());
    }

    #[test]
    fn process_counting_ignores_retried_attempts() {
        let mut budget = FailureBudget::new(1, FailureCounting::Processes);
        for _ in 0..5 {
            budget.record_failure(false);
        }
        assert_eq!(budget.count(), 0);
        assert_eq!(budget.failed_attempt_count(), 5);
        assert!(!budget.exceeded());
    }

    #[test]
    fn attempt_counting_includes_retries() {
        let mut budget = FailureBudget::new(2, FailureCounting::Attempts);
        budget.record_failure(false);
        budget.record_failure(false);
        assert!(!budget.exceeded());
        budget.record_failure(false);
        assert!(budget.exceeded());
        assert_eq!(budget.failed_process_count(), 0);
    }
}

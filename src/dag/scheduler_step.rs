// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::attempt::ScheduledAttempt;
use crate::task::{ProcessName, ProcessTransition};
use crate::types::FailureReason;

/// Terminal decision for the whole task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskDecision {
    Success,
    Failed(FailureReason),
}

/// Structured result of a single scheduler "step".
///
/// Tests use it to step the scheduler by hand and assert on what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Attempts to hand to the executor, in launch order.
    pub launched: Vec<ScheduledAttempt>,
    /// Run transitions applied in this step, in order.
    pub transitions: Vec<ProcessTransition>,
    /// Processes that became permanently blocked in this step.
    pub newly_blocked: Vec<ProcessName>,
    /// Set only on the step that made the task-level decision.
    pub decision: Option<TaskDecision>,
    /// Attempts still in flight that should be asked to stop.
    pub to_stop: Vec<(ProcessName, u32)>,
}

impl SchedulerStep {
    pub fn launched_names(&self) -> Vec<&str> {
        self.launched.iter().map(|a| a.process.as_str()).collect()
    }
}

// src/task/record.rs

//! Run records, transition events and the final task result.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::task::model::ProcessName;
use crate::types::{AttemptOutcome, FailureReason, ProcessState, TaskStatus};

/// What the execution capability reports when an attempt ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttemptReport {
    pub outcome: AttemptOutcome,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl AttemptReport {
    /// Wall-clock run time; zero if the timestamps are out of order.
    pub fn elapsed(&self) -> std::time::Duration {
        (self.ended_at - self.started_at).to_std().unwrap_or_default()
    }
}

/// One execution attempt of a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessRun {
    pub process_name: ProcessName,
    /// 0-based attempt number.
    pub attempt_index: u32,
    pub state: ProcessState,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub exit_code: Option<i32>,
    /// Whether the attempt ran for at least the process's `min_duration`.
    /// `None` while the run is still open.
    pub min_duration_met: Option<bool>,
}

impl ProcessRun {
    pub(crate) fn launched(process_name: ProcessName, attempt_index: u32, at: DateTime<Utc>) -> Self {
        Self {
            process_name,
            attempt_index,
            state: ProcessState::Running,
            started_at: Some(at),
            ended_at: None,
            exit_code: None,
            min_duration_met: None,
        }
    }
}

/// A single state change of one run, in the order it was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessTransition {
    pub process_name: ProcessName,
    pub attempt_index: u32,
    pub old_state: ProcessState,
    pub new_state: ProcessState,
    pub timestamp: DateTime<Utc>,
}

/// One entry in the task status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskStateEvent {
    pub state: TaskStatus,
    pub timestamp: DateTime<Utc>,
    /// Set only on the FAILED event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
}

/// Final outcome of supervising a task.
///
/// A process name absent from `processes` was never attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskResult {
    pub task_state: TaskStatus,
    pub statuses: Vec<TaskStateEvent>,
    pub processes: BTreeMap<ProcessName, Vec<ProcessRun>>,
}

impl TaskResult {
    /// The reason recorded on the terminal FAILED event, if any.
    pub fn failure_reason(&self) -> Option<&FailureReason> {
        self.statuses.iter().rev().find_map(|s| s.reason.as_ref())
    }

    pub fn runs_of(&self, process: &str) -> Option<&[ProcessRun]> {
        self.processes.get(process).map(Vec::as_slice)
    }
}

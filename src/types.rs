use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// State of a single process, or of one of its runs.
///
/// A process starts `Pending`, moves to `Running` when an attempt is launched
/// and ends in exactly one of the two terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessState {
    Pending,
    Running,
    Success,
    Failed,
}

impl ProcessState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessState::Success | ProcessState::Failed)
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessState::Pending => "PENDING",
            ProcessState::Running => "RUNNING",
            ProcessState::Success => "SUCCESS",
            ProcessState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Task-level state as recorded in the task status history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// The task has started and no terminal decision has been made yet.
    Active,
    Success,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Active => "ACTIVE",
            TaskStatus::Success => "SUCCESS",
            TaskStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Exit outcome of one attempt, as reported by the execution capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    /// Non-zero exit, crash, kill or failure to start. `-1` when no exit
    /// code is available.
    Failed(i32),
}

impl AttemptOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, AttemptOutcome::Success)
    }
}

/// Why a task was declared FAILED.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// A process with declared dependents failed permanently.
    DependencyFailed { process: String },
    /// The task-wide failure budget was exceeded by this process's failure.
    BudgetExceeded {
        process: String,
        failures: u32,
        limit: u32,
    },
    /// Shutdown was requested before the task reached a decision.
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::DependencyFailed { process } => {
                write!(f, "process '{process}' failed and has dependents")
            }
            FailureReason::BudgetExceeded {
                process,
                failures,
                limit,
            } => write!(
                f,
                "failure budget exceeded by '{process}' ({failures} > {limit})"
            ),
            FailureReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// What the task failure budget counts.
///
/// - `Processes`: distinct processes that reached terminal FAILED (default).
/// - `Attempts`: every failed attempt, whether or not it was retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureCounting {
    #[default]
    Processes,
    Attempts,
}

impl FromStr for FailureCounting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "processes" => Ok(FailureCounting::Processes),
            "attempts" => Ok(FailureCounting::Attempts),
            other => Err(format!(
                "invalid failure_counting: {other} (expected \"processes\" or \"attempts\")"
            )),
        }
    }
}

/// How `min_duration` influences scheduling.
///
/// - `Observe`: only recorded on each run and logged (default).
/// - `DelayRestart`: a retry of an attempt that ended before `min_duration`
///   waits out the remainder before launching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MinDurationPolicy {
    #[default]
    Observe,
    DelayRestart,
}

impl FromStr for MinDurationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "observe" => Ok(MinDurationPolicy::Observe),
            "delay_restart" => Ok(MinDurationPolicy::DelayRestart),
            other => Err(format!(
                "invalid min_duration_policy: {other} (expected \"observe\" or \"delay_restart\")"
            )),
        }
    }
}

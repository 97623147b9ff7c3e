// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::dag::{ScheduledAttempt, Scheduler, SchedulerStep, TaskDecision};
use crate::engine::events::SupervisorEvent;
use crate::task::{AttemptReport, ProcessName, TaskStateEvent};
use crate::types::{AttemptOutcome, TaskStatus};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Hand these attempts to the executor.
    DispatchAttempts(Vec<ScheduledAttempt>),
    /// Ask the executor to stop these in-flight attempts.
    StopAttempts(Vec<(ProcessName, u32)>),
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone, Default)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Events to report to the sink, in the order they were applied.
    pub events: Vec<SupervisorEvent>,
    /// Whether the outer runtime loop should keep consuming events.
    pub keep_running: bool,
}

/// Handle an attempt completion reported by the executor.
pub fn handle_attempt_completed(
    scheduler: &mut Scheduler,
    statuses: &mut Vec<TaskStateEvent>,
    process: &str,
    attempt_index: u32,
    report: AttemptReport,
    now: DateTime<Utc>,
) -> CoreStep {
    let step = scheduler.step_completion(process, attempt_index, &report, now);
    into_core_step(scheduler, statuses, step, now)
}

/// Handle an attempt the executor could not start.
///
/// Counts exactly like an attempt that failed instantly.
pub fn handle_start_failure(
    scheduler: &mut Scheduler,
    statuses: &mut Vec<TaskStateEvent>,
    process: &str,
    attempt_index: u32,
    reason: &str,
    now: DateTime<Utc>,
) -> CoreStep {
    warn!(
        process = %process,
        attempt = attempt_index,
        %reason,
        "attempt could not be started; counting as failed attempt"
    );
    let report = AttemptReport {
        outcome: AttemptOutcome::Failed(-1),
        started_at: now,
        ended_at: now,
    };
    handle_attempt_completed(scheduler, statuses, process, attempt_index, report, now)
}

/// Handle a shutdown request: fail the task (if still undecided) and stop
/// whatever is running.
pub fn handle_shutdown(
    scheduler: &mut Scheduler,
    statuses: &mut Vec<TaskStateEvent>,
    now: DateTime<Utc>,
) -> CoreStep {
    let step = scheduler.cancel();
    into_core_step(scheduler, statuses, step, now)
}

/// Translate a scheduler step into commands and outbound events, recording
/// the terminal task status if the step made the decision.
pub fn into_core_step(
    scheduler: &Scheduler,
    statuses: &mut Vec<TaskStateEvent>,
    step: SchedulerStep,
    now: DateTime<Utc>,
) -> CoreStep {
    let mut events: Vec<SupervisorEvent> = step
        .transitions
        .into_iter()
        .map(SupervisorEvent::Process)
        .collect();

    if let Some(decision) = step.decision {
        let status = match decision {
            TaskDecision::Success => TaskStateEvent {
                state: TaskStatus::Success,
                timestamp: now,
                reason: None,
            },
            TaskDecision::Failed(reason) => TaskStateEvent {
                state: TaskStatus::Failed,
                timestamp: now,
                reason: Some(reason),
            },
        };
        statuses.push(status.clone());
        events.push(SupervisorEvent::Task(status));
    }

    let mut commands = Vec::new();
    if !step.launched.is_empty() {
        commands.push(CoreCommand::DispatchAttempts(step.launched));
    }
    if !step.to_stop.is_empty() {
        commands.push(CoreCommand::StopAttempts(step.to_stop));
    }

    CoreStep {
        commands,
        events,
        keep_running: !scheduler.is_decided() || !scheduler.in_flight().is_empty(),
    }
}

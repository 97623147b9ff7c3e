// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//! - the outbound events to report
//!
//! The async/IO-heavy shell (`engine::runtime::TaskOrchestrator`) is
//! responsible for reading events from the channel, talking to the executor
//! and enforcing the drain timeout.
//!
//! Time comes from an injected [`Clock`], so the core can be unit tested
//! without any Tokio, channels or processes.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::clock::Clock;
use crate::dag::Scheduler;
use crate::engine::event_handlers::{
    handle_attempt_completed, handle_shutdown, handle_start_failure, into_core_step, CoreStep,
};
use crate::engine::events::SupervisorEvent;
use crate::engine::RuntimeEvent;
use crate::task::{TaskResult, TaskStateEvent};
use crate::types::TaskStatus;

/// Pure core runtime state.
///
/// This owns:
/// - the scheduler
/// - the task status history
/// - the clock used to stamp transitions
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
pub struct OrchestratorCore {
    scheduler: Scheduler,
    clock: Arc<dyn Clock>,
    statuses: Vec<TaskStateEvent>,
}

impl fmt::Debug for OrchestratorCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrchestratorCore")
            .field("scheduler", &self.scheduler)
            .field("statuses", &self.statuses)
            .finish_non_exhaustive()
    }
}

impl OrchestratorCore {
    pub fn new(scheduler: Scheduler, clock: Arc<dyn Clock>) -> Self {
        Self {
            scheduler,
            clock,
            statuses: Vec::new(),
        }
    }

    pub fn is_started(&self) -> bool {
        !self.statuses.is_empty()
    }

    pub fn is_decided(&self) -> bool {
        self.scheduler.is_decided()
    }

    /// Number of attempts still in flight.
    pub fn in_flight(&self) -> usize {
        self.scheduler.in_flight().len()
    }

    /// Read-only access to the scheduler (for tests and diagnostics).
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Mark the task ACTIVE and launch the initially eligible processes.
    pub fn start(&mut self) -> CoreStep {
        if self.is_started() {
            warn!("core already started; ignoring start");
            return CoreStep {
                keep_running: !self.is_decided() || self.in_flight() > 0,
                ..CoreStep::default()
            };
        }

        let now = self.clock.now();
        let active = TaskStateEvent {
            state: TaskStatus::Active,
            timestamp: now,
            reason: None,
        };
        self.statuses.push(active.clone());

        let step = self.scheduler.start(now);
        let mut core_step = into_core_step(&self.scheduler, &mut self.statuses, step, now);
        core_step.events.insert(0, SupervisorEvent::Task(active));
        core_step
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        let now = self.clock.now();
        match event {
            RuntimeEvent::AttemptCompleted {
                process,
                attempt_index,
                report,
            } => handle_attempt_completed(
                &mut self.scheduler,
                &mut self.statuses,
                &process,
                attempt_index,
                report,
                now,
            ),
            RuntimeEvent::AttemptStartFailed {
                process,
                attempt_index,
                reason,
            } => handle_start_failure(
                &mut self.scheduler,
                &mut self.statuses,
                &process,
                attempt_index,
                &reason,
                now,
            ),
            RuntimeEvent::ShutdownRequested => {
                info!("shutdown requested");
                handle_shutdown(&mut self.scheduler, &mut self.statuses, now)
            }
        }
    }

    /// Snapshot of the task result.
    ///
    /// `task_state` is the latest recorded status; it is ACTIVE only if the
    /// task has not been decided yet.
    pub fn result(&self) -> TaskResult {
        let task_state = self
            .statuses
            .last()
            .map(|s| s.state)
            .unwrap_or(TaskStatus::Active);

        TaskResult {
            task_state,
            statuses: self.statuses.clone(),
            processes: self.scheduler.records(),
        }
    }
}

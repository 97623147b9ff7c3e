// src/dag/process.rs

//! Per-process execution lifecycle with bounded retries.

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::task::{AttemptReport, ProcessName, ProcessRun, ProcessSpec, ProcessTransition};
use crate::types::{AttemptOutcome, MinDurationPolicy, ProcessState};

/// Rejected state-machine input.
///
/// These are never fatal to the task: the scheduler logs and drops them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("process '{process}' is already {state}")]
    AlreadyTerminal {
        process: ProcessName,
        state: ProcessState,
    },

    #[error("process '{process}' already has attempt {attempt} in flight")]
    AttemptInFlight { process: ProcessName, attempt: u32 },

    #[error("process '{process}' has no attempt in flight")]
    NoOpenAttempt { process: ProcessName },

    #[error("stale completion for process '{process}': attempt {got}, expected {expected}")]
    StaleAttempt {
        process: ProcessName,
        expected: u32,
        got: u32,
    },
}

/// What happens after an attempt completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptVerdict {
    /// Terminal SUCCESS; no further attempts.
    Succeeded,
    /// The attempt failed but budget remains: launch `next_attempt` after
    /// `restart_delay`.
    Retry {
        next_attempt: u32,
        restart_delay: Duration,
    },
    /// Terminal FAILED; the process never retries again.
    PermanentlyFailed,
}

/// Lifecycle of one process: PENDING -> RUNNING -> (retry RUNNING)* ->
/// SUCCESS | FAILED.
///
/// While waiting to relaunch after a tolerated failure the process stays
/// RUNNING with no open run.
#[derive(Debug, Clone)]
pub struct ProcessStateMachine {
    name: ProcessName,
    max_failures: u32,
    min_duration: Duration,
    state: ProcessState,
    failures: u32,
    runs: Vec<ProcessRun>,
}

impl ProcessStateMachine {
    pub fn new(spec: &ProcessSpec) -> Self {
        Self {
            name: spec.name.clone(),
            max_failures: spec.max_failures.max(1),
            min_duration: spec.min_duration,
            state: ProcessState::Pending,
            failures: 0,
            runs: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Failed attempts so far.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn runs(&self) -> &[ProcessRun] {
        &self.runs
    }

    /// Attempt index of the run currently in flight, if any.
    pub fn open_attempt(&self) -> Option<u32> {
        self.runs
            .last()
            .filter(|run| run.state == ProcessState::Running)
            .map(|run| run.attempt_index)
    }

    /// Create the next run and mark it RUNNING.
    pub fn launch(&mut self, now: DateTime<Utc>) -> Result<ProcessTransition, TransitionError> {
        if self.state.is_terminal() {
            return Err(TransitionError::AlreadyTerminal {
                process: self.name.clone(),
                state: self.state,
            });
        }
        if let Some(attempt) = self.open_attempt() {
            return Err(TransitionError::AttemptInFlight {
                process: self.name.clone(),
                attempt,
            });
        }

        let attempt_index = self.runs.len() as u32;
        self.runs
            .push(ProcessRun::launched(self.name.clone(), attempt_index, now));
        self.state = ProcessState::Running;

        debug!(process = %self.name, attempt = attempt_index, "attempt launched");

        Ok(ProcessTransition {
            process_name: self.name.clone(),
            attempt_index,
            old_state: ProcessState::Pending,
            new_state: ProcessState::Running,
            timestamp: now,
        })
    }

    /// Apply the outcome of the attempt in flight and decide what comes next.
    ///
    /// A success is terminal regardless of remaining budget. A failure counts
    /// toward `max_failures` however short the attempt was.
    pub fn complete(
        &mut self,
        attempt_index: u32,
        report: &AttemptReport,
        policy: MinDurationPolicy,
    ) -> Result<(ProcessTransition, AttemptVerdict), TransitionError> {
        let transition = self.close_run(attempt_index, report)?;
        let elapsed = report.elapsed();

        if report.outcome.is_success() {
            self.state = ProcessState::Success;
            info!(process = %self.name, attempt = attempt_index, "process succeeded");
            return Ok((transition, AttemptVerdict::Succeeded));
        }

        self.failures += 1;
        let short_lived = elapsed < self.min_duration;
        if short_lived {
            warn!(
                process = %self.name,
                attempt = attempt_index,
                elapsed_ms = elapsed.as_millis() as u64,
                min_duration_ms = self.min_duration.as_millis() as u64,
                "attempt failed before min_duration"
            );
        }

        if self.failures >= self.max_failures {
            self.state = ProcessState::Failed;
            warn!(
                process = %self.name,
                attempt = attempt_index,
                failures = self.failures,
                max_failures = self.max_failures,
                "process failed permanently"
            );
            return Ok((transition, AttemptVerdict::PermanentlyFailed));
        }

        let restart_delay = match policy {
            MinDurationPolicy::DelayRestart if short_lived => self.min_duration - elapsed,
            _ => Duration::ZERO,
        };

        info!(
            process = %self.name,
            attempt = attempt_index,
            failures = self.failures,
            max_failures = self.max_failures,
            restart_delay_ms = restart_delay.as_millis() as u64,
            "attempt failed; retrying"
        );

        Ok((
            transition,
            AttemptVerdict::Retry {
                next_attempt: attempt_index + 1,
                restart_delay,
            },
        ))
    }

    /// Record a completion that arrives after the task already reached its
    /// terminal decision. The run is closed with its reported outcome; no
    /// retry is considered and failure counts are left alone.
    pub fn complete_after_decision(
        &mut self,
        attempt_index: u32,
        report: &AttemptReport,
    ) -> Result<ProcessTransition, TransitionError> {
        let transition = self.close_run(attempt_index, report)?;
        self.state = transition.new_state;
        debug!(
            process = %self.name,
            attempt = attempt_index,
            state = %self.state,
            "recorded completion after task decision"
        );
        Ok(transition)
    }

    fn close_run(
        &mut self,
        attempt_index: u32,
        report: &AttemptReport,
    ) -> Result<ProcessTransition, TransitionError> {
        let expected = match self.open_attempt() {
            Some(attempt) => attempt,
            None if self.state.is_terminal() => {
                return Err(TransitionError::AlreadyTerminal {
                    process: self.name.clone(),
                    state: self.state,
                });
            }
            None => {
                return Err(TransitionError::NoOpenAttempt {
                    process: self.name.clone(),
                });
            }
        };
        if expected != attempt_index {
            return Err(TransitionError::StaleAttempt {
                process: self.name.clone(),
                expected,
                got: attempt_index,
            });
        }

        let min_duration = self.min_duration;
        let Some(run) = self.runs.last_mut() else {
            return Err(TransitionError::NoOpenAttempt {
                process: self.name.clone(),
            });
        };

        let new_state = if report.outcome.is_success() {
            ProcessState::Success
        } else {
            ProcessState::Failed
        };

        run.state = new_state;
        run.started_at = Some(report.started_at);
        run.ended_at = Some(report.ended_at);
        run.exit_code = Some(match report.outcome {
            AttemptOutcome::Success => 0,
            AttemptOutcome::Failed(code) => code,
        });
        run.min_duration_met = Some(report.elapsed() >= min_duration);

        Ok(ProcessTransition {
            process_name: self.name.clone(),
            attempt_index,
            old_state: ProcessState::Running,
            new_state,
            timestamp: report.ended_at,
        })
    }
}

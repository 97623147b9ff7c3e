// src/engine/runtime.rs

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::dag::ScheduledAttempt;
use crate::errors::{Result, TaskwardenError};
use crate::exec::ExecutorBackend;
use crate::task::{ProcessName, TaskResult};

use super::core::OrchestratorCore;
use super::events::EventSink;
use super::{CoreCommand, CoreStep, RuntimeEvent};

/// Drives the scheduler in response to `RuntimeEvent`s and delegates actual
/// command execution to an `ExecutorBackend`.
///
/// This is a pure IO shell around `OrchestratorCore`, which contains all the
/// scheduling semantics. Completions from every in-flight attempt arrive on
/// one channel and are applied strictly one at a time.
pub struct TaskOrchestrator<E: ExecutorBackend> {
    core: OrchestratorCore,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    sink: Box<dyn EventSink>,
    drain_timeout: Duration,
}

impl<E: ExecutorBackend> fmt::Debug for TaskOrchestrator<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskOrchestrator")
            .field("core", &self.core)
            .field("drain_timeout", &self.drain_timeout)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> TaskOrchestrator<E> {
    pub fn new(
        core: OrchestratorCore,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
        sink: Box<dyn EventSink>,
        drain_timeout: Duration,
    ) -> Self {
        Self {
            core,
            event_rx,
            executor,
            sink,
            drain_timeout,
        }
    }

    /// Main event loop.
    ///
    /// - Starts the task and dispatches the initially eligible processes.
    /// - Consumes `RuntimeEvent`s until the task is decided and every
    ///   in-flight attempt has reported, or the drain timeout elapses.
    /// - Returns the final [`TaskResult`].
    pub async fn run(mut self) -> Result<TaskResult> {
        info!("task orchestrator started");

        // Start failures are fed back through here before reading the channel.
        let mut backlog: VecDeque<RuntimeEvent> = VecDeque::new();
        let mut drain_deadline: Option<Instant> = None;

        let step = self.core.start();
        let mut keep_running = self.apply(step, &mut backlog).await;

        while keep_running {
            if self.core.is_decided() && drain_deadline.is_none() {
                debug!(
                    in_flight = self.core.in_flight(),
                    timeout_ms = self.drain_timeout.as_millis() as u64,
                    "task decided; draining in-flight attempts"
                );
                drain_deadline = Some(Instant::now() + self.drain_timeout);
            }

            let event = match backlog.pop_front() {
                Some(event) => event,
                None => match self.next_event(drain_deadline).await {
                    NextEvent::Event(event) => event,
                    NextEvent::DrainTimedOut => {
                        warn!(
                            in_flight = self.core.in_flight(),
                            "drain timeout elapsed; reporting without remaining completions"
                        );
                        break;
                    }
                    NextEvent::Closed => {
                        if self.core.is_decided() {
                            warn!("runtime event channel closed while draining");
                            break;
                        }
                        return Err(TaskwardenError::Other(anyhow::anyhow!(
                            "runtime event channel closed before the task was decided"
                        )));
                    }
                },
            };

            debug!(?event, "orchestrator received event");

            let step = self.core.step(event);
            keep_running = self.apply(step, &mut backlog).await;
        }

        let result = self.core.result();
        info!(state = %result.task_state, "task orchestrator finished");
        Ok(result)
    }

    async fn next_event(&mut self, deadline: Option<Instant>) -> NextEvent {
        let received = match deadline {
            Some(deadline) => {
                match tokio::time::timeout_at(deadline, self.event_rx.recv()).await {
                    Ok(received) => received,
                    Err(_) => return NextEvent::DrainTimedOut,
                }
            }
            None => self.event_rx.recv().await,
        };

        match received {
            Some(event) => NextEvent::Event(event),
            None => NextEvent::Closed,
        }
    }

    /// Report the step's events, then execute its commands.
    async fn apply(&mut self, step: CoreStep, backlog: &mut VecDeque<RuntimeEvent>) -> bool {
        for event in &step.events {
            if let Err(e) = self.sink.record(event) {
                warn!(error = %e, "event sink rejected event");
            }
        }

        for command in step.commands {
            match command {
                CoreCommand::DispatchAttempts(attempts) => {
                    self.dispatch(attempts, backlog).await;
                }
                CoreCommand::StopAttempts(attempts) => {
                    self.stop(attempts).await;
                }
            }
        }

        step.keep_running
    }

    async fn dispatch(&mut self, attempts: Vec<ScheduledAttempt>, backlog: &mut VecDeque<RuntimeEvent>) {
        let names: Vec<_> = attempts.iter().map(|a| a.process.as_str()).collect();
        debug!(?names, "dispatching attempts");

        for attempt in attempts {
            let process = attempt.process.clone();
            let attempt_index = attempt.attempt_index;
            if let Err(e) = self.executor.start_attempt(attempt).await {
                backlog.push_back(RuntimeEvent::AttemptStartFailed {
                    process,
                    attempt_index,
                    reason: e.to_string(),
                });
            }
        }
    }

    async fn stop(&mut self, attempts: Vec<(ProcessName, u32)>) {
        info!(?attempts, "requesting stop of in-flight attempts");
        if let Err(e) = self.executor.stop_attempts(attempts).await {
            warn!(error = %e, "executor failed to stop attempts");
        }
    }
}

enum NextEvent {
    Event(RuntimeEvent),
    DrainTimedOut,
    Closed,
}

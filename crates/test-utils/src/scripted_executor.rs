use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use taskwarden::clock::Clock;
use taskwarden::dag::ScheduledAttempt;
use taskwarden::engine::RuntimeEvent;
use taskwarden::errors::{Result, TaskwardenError};
use taskwarden::exec::ExecutorBackend;
use taskwarden::task::{AttemptReport, ProcessName};
use taskwarden::types::AttemptOutcome;

/// What a single scripted attempt does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Report this outcome immediately.
    Exit(AttemptOutcome),
    /// Never report on its own; only a stop request ends it.
    Hang,
}

/// Per-process, per-attempt outcome script.
///
/// Attempt `n` of a process uses its `n`-th step; the last step repeats.
/// Unscripted processes always succeed.
#[derive(Debug, Clone)]
pub struct Script {
    steps: HashMap<ProcessName, Vec<Step>>,
    durations: HashMap<ProcessName, Duration>,
    refused: HashSet<ProcessName>,
    report_on_stop: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            steps: HashMap::new(),
            durations: HashMap::new(),
            refused: HashSet::new(),
            report_on_stop: true,
        }
    }
}

/// Reported run time of an attempt unless overridden.
pub const DEFAULT_ATTEMPT_DURATION: Duration = Duration::from_secs(10);

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeed(self, process: &str) -> Self {
        self.outcomes(process, [AttemptOutcome::Success])
    }

    /// Every attempt exits with code 1.
    pub fn fail(self, process: &str) -> Self {
        self.outcomes(process, [AttemptOutcome::Failed(1)])
    }

    pub fn outcomes(
        mut self,
        process: &str,
        outcomes: impl IntoIterator<Item = AttemptOutcome>,
    ) -> Self {
        self.steps.insert(
            process.to_string(),
            outcomes.into_iter().map(Step::Exit).collect(),
        );
        self
    }

    pub fn steps(mut self, process: &str, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps
            .insert(process.to_string(), steps.into_iter().collect());
        self
    }

    pub fn hang(self, process: &str) -> Self {
        self.steps(process, [Step::Hang])
    }

    /// The executor refuses to start this process at all.
    pub fn refuse_start(mut self, process: &str) -> Self {
        self.refused.insert(process.to_string());
        self
    }

    /// Reported run time for every attempt of this process.
    pub fn duration(mut self, process: &str, duration: Duration) -> Self {
        self.durations.insert(process.to_string(), duration);
        self
    }

    /// Whether a stopped hung attempt reports `Failed(-1)` (default) or
    /// stays silent.
    pub fn report_on_stop(mut self, report: bool) -> Self {
        self.report_on_stop = report;
        self
    }

    pub fn step_for(&self, process: &str, attempt_index: u32) -> Step {
        match self.steps.get(process) {
            Some(steps) if !steps.is_empty() => {
                let idx = (attempt_index as usize).min(steps.len() - 1);
                steps[idx]
            }
            _ => Step::Exit(AttemptOutcome::Success),
        }
    }

    fn duration_of(&self, process: &str) -> Duration {
        self.durations
            .get(process)
            .copied()
            .unwrap_or(DEFAULT_ATTEMPT_DURATION)
    }
}

#[derive(Debug, Default)]
struct LogInner {
    started: Vec<ScheduledAttempt>,
    stopped: Vec<(ProcessName, u32)>,
}

/// Shared record of what the executor was asked to do.
#[derive(Debug, Clone, Default)]
pub struct ExecutorLog {
    inner: Arc<Mutex<LogInner>>,
}

impl ExecutorLog {
    pub fn started(&self) -> Vec<ScheduledAttempt> {
        self.inner.lock().unwrap().started.clone()
    }

    pub fn started_names(&self) -> Vec<ProcessName> {
        self.started().into_iter().map(|a| a.process).collect()
    }

    pub fn attempts_of(&self, process: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .started
            .iter()
            .filter(|a| a.process == process)
            .count()
    }

    pub fn stopped(&self) -> Vec<(ProcessName, u32)> {
        self.inner.lock().unwrap().stopped.clone()
    }
}

/// A fake executor that:
/// - records which attempts were started and stopped
/// - reports each attempt's scripted outcome straight back on the runtime
///   channel, with timestamps taken from the injected clock
pub struct ScriptedExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    script: Script,
    clock: Arc<dyn Clock>,
    log: ExecutorLog,
    hung: HashSet<(ProcessName, u32)>,
}

impl ScriptedExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, script: Script, clock: Arc<dyn Clock>) -> Self {
        Self {
            runtime_tx,
            script,
            clock,
            log: ExecutorLog::default(),
            hung: HashSet::new(),
        }
    }

    pub fn log(&self) -> ExecutorLog {
        self.log.clone()
    }

    fn report(&self, process: ProcessName, attempt_index: u32, outcome: AttemptOutcome) -> RuntimeEvent {
        let started_at = self.clock.now();
        let elapsed = chrono::Duration::from_std(self.script.duration_of(&process))
            .unwrap_or_else(|_| chrono::Duration::zero());
        RuntimeEvent::AttemptCompleted {
            process,
            attempt_index,
            report: AttemptReport {
                outcome,
                started_at,
                ended_at: started_at + elapsed,
            },
        }
    }
}

impl ExecutorBackend for ScriptedExecutor {
    fn start_attempt(
        &mut self,
        attempt: ScheduledAttempt,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if self.script.refused.contains(&attempt.process) {
                return Err(TaskwardenError::Other(anyhow::anyhow!(
                    "scripted refusal to start '{}'",
                    attempt.process
                )));
            }

            self.log.inner.lock().unwrap().started.push(attempt.clone());

            match self.script.step_for(&attempt.process, attempt.attempt_index) {
                Step::Exit(outcome) => {
                    debug!(process = %attempt.process, attempt = attempt.attempt_index, ?outcome, "scripted completion");
                    let event = self.report(attempt.process, attempt.attempt_index, outcome);
                    self.runtime_tx
                        .send(event)
                        .await
                        .map_err(anyhow::Error::from)?;
                }
                Step::Hang => {
                    self.hung.insert((attempt.process, attempt.attempt_index));
                }
            }
            Ok(())
        })
    }

    fn stop_attempts(
        &mut self,
        attempts: Vec<(ProcessName, u32)>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for (process, attempt_index) in attempts {
                self.log
                    .inner
                    .lock()
                    .unwrap()
                    .stopped
                    .push((process.clone(), attempt_index));

                let was_hung = self.hung.remove(&(process.clone(), attempt_index));
                if was_hung && self.script.report_on_stop {
                    let event = self.report(process, attempt_index, AttemptOutcome::Failed(-1));
                    self.runtime_tx
                        .send(event)
                        .await
                        .map_err(anyhow::Error::from)?;
                }
            }
            Ok(())
        })
    }
}

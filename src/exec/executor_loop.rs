// src/exec/executor_loop.rs

//! Main executor loop that manages running attempt processes.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::dag::ScheduledAttempt;
use crate::engine::RuntimeEvent;
use crate::exec::attempt_runner::run_attempt;
use crate::task::ProcessName;

/// Requests accepted by the executor loop.
#[derive(Debug)]
pub enum ExecutorCommand {
    Start(ScheduledAttempt),
    Stop {
        process: ProcessName,
        attempt_index: u32,
    },
}

/// Internal handle for a currently-running attempt.
///
/// - `cancel` is used to request that the process be stopped.
/// - `handle` is the Tokio task that is actually running the command.
struct ActiveAttempt {
    attempt_index: u32,
    cancel: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

/// Spawn the background executor loop.
///
/// The returned sender is what `RealExecutorBackend` uses to forward
/// requests. Each attempt runs in its own Tokio task; per process name there
/// is at most one attempt in flight, which the scheduler already guarantees.
pub fn spawn_executor(
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    clock: Arc<dyn Clock>,
) -> mpsc::Sender<ExecutorCommand> {
    let (tx, mut rx) = mpsc::channel::<ExecutorCommand>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        let mut active: HashMap<ProcessName, ActiveAttempt> = HashMap::new();

        while let Some(command) = rx.recv().await {
            match command {
                ExecutorCommand::Start(attempt) => {
                    start_attempt(attempt, &mut active, &runtime_tx, &clock);
                }
                ExecutorCommand::Stop {
                    process,
                    attempt_index,
                } => stop_attempt(&process, attempt_index, &mut active),
            }
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}

fn start_attempt(
    attempt: ScheduledAttempt,
    active: &mut HashMap<ProcessName, ActiveAttempt>,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
    clock: &Arc<dyn Clock>,
) {
    let name = attempt.process.clone();

    if let Some(existing) = active.get(&name) {
        if !existing.handle.is_finished() {
            warn!(
                process = %name,
                running = existing.attempt_index,
                requested = attempt.attempt_index,
                "previous attempt still running while a new one was requested"
            );
        }
    }

    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    let rt_tx = runtime_tx.clone();
    let clock = Arc::clone(clock);
    let attempt_index = attempt.attempt_index;
    let spawn_name = name.clone();

    let handle = tokio::spawn(async move {
        run_attempt(attempt, rt_tx, cancel_rx, clock).await;
        debug!(process = %spawn_name, attempt = attempt_index, "attempt runner future finished");
    });

    active.insert(
        name,
        ActiveAttempt {
            attempt_index,
            cancel: Some(cancel_tx),
            handle,
        },
    );
}

fn stop_attempt(
    process: &str,
    attempt_index: u32,
    active: &mut HashMap<ProcessName, ActiveAttempt>,
) {
    let Some(existing) = active.get_mut(process) else {
        debug!(process = %process, attempt = attempt_index, "stop for unknown attempt; ignoring");
        return;
    };

    if existing.attempt_index != attempt_index {
        debug!(
            process = %process,
            running = existing.attempt_index,
            requested = attempt_index,
            "stop for an attempt that is no longer current; ignoring"
        );
        return;
    }

    info!(process = %process, attempt = attempt_index, "stopping attempt");

    match existing.cancel.take() {
        Some(cancel) => {
            if cancel.send(()).is_err() {
                debug!(
                    process = %process,
                    attempt = attempt_index,
                    "attempt already finished while stopping"
                );
            }
        }
        None => debug!(
            process = %process,
            attempt = attempt_index,
            "no cancel sender present; attempt may already have been stopped"
        ),
    }
}

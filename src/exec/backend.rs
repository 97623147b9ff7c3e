// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of spawning processes
//! itself. This makes it easy to swap in a scripted executor in tests while
//! keeping the production implementation in [`executor_loop`].
//!
//! - `RealExecutorBackend` is the default implementation used by `taskwarden`.
//!   It forwards start/stop requests to the background executor loop.
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which attempts were started and directly emits `AttemptCompleted` events.
//!
//! [`executor_loop`]: super::executor_loop

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::clock::Clock;
use crate::dag::ScheduledAttempt;
use crate::engine::RuntimeEvent;
use crate::errors::{Error, Result};
use crate::task::ProcessName;

use super::executor_loop::{spawn_executor, ExecutorCommand};

/// The execution capability.
///
/// Completions are never returned from these calls: the implementation
/// reports each finished attempt as a `RuntimeEvent::AttemptCompleted` on the
/// runtime channel.
pub trait ExecutorBackend: Send {
    /// Start one attempt.
    ///
    /// An `Err` means the attempt could not be started at all; the runtime
    /// counts it as an instantly failed attempt.
    fn start_attempt(
        &mut self,
        attempt: ScheduledAttempt,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Request that the given in-flight attempts stop. Their completions are
    /// still expected on the runtime channel.
    fn stop_attempts(
        &mut self,
        attempts: Vec<(ProcessName, u32)>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Real executor backend used in production.
///
/// The runtime calls `start_attempt`/`stop_attempts`, which forward commands
/// to the background executor loop via an mpsc channel.
pub struct RealExecutorBackend {
    tx: mpsc::Sender<ExecutorCommand>,
}

impl RealExecutorBackend {
    /// Create a new real executor backend, wiring it to the given runtime
    /// event sender.
    ///
    /// This spawns the background executor loop immediately.
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, clock: Arc<dyn Clock>) -> Self {
        let tx = spawn_executor(runtime_tx, clock);
        Self { tx }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn start_attempt(
        &mut self,
        attempt: ScheduledAttempt,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();

        Box::pin(async move {
            tx.send(ExecutorCommand::Start(attempt))
                .await
                .map_err(Error::from)?;
            Ok(())
        })
    }

    fn stop_attempts(
        &mut self,
        attempts: Vec<(ProcessName, u32)>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.tx.clone();

        Box::pin(async move {
            for (process, attempt_index) in attempts {
                tx.send(ExecutorCommand::Stop {
                    process,
                    attempt_index,
                })
                .await
                .map_err(Error::from)?;
            }
            Ok(())
        })
    }
}

// src/engine/mod.rs

//! Orchestration engine for taskwarden.
//!
//! This module ties together:
//! - the scheduler (what launches, when the task is decided)
//! - the event stream reported to an [`EventSink`]
//! - the main runtime event loop that reacts to:
//!   - attempt completions
//!   - attempts that could not be started at all
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::time::Duration;

use crate::dag::SchedulerOptions;
use crate::task::{AttemptReport, ProcessName};

/// Options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorOptions {
    pub scheduler: SchedulerOptions,
    /// How long to keep collecting completions of still-running attempts
    /// after the task has been decided.
    pub drain_timeout: Duration,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            scheduler: SchedulerOptions::default(),
            drain_timeout: Duration::from_secs(5),
        }
    }
}

/// Events flowing into the runtime from executors and signal handlers.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// An attempt ran and exited.
    AttemptCompleted {
        process: ProcessName,
        attempt_index: u32,
        report: AttemptReport,
    },
    /// The execution capability could not start the attempt at all.
    AttemptStartFailed {
        process: ProcessName,
        attempt_index: u32,
        reason: String,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod events;
pub mod runtime;

pub use self::core::OrchestratorCore;
pub use event_handlers::{CoreCommand, CoreStep};
pub use events::{EventSink, FanOutSink, JsonLinesSink, LogSink, MemorySink, SupervisorEvent};
pub use runtime::TaskOrchestrator;

// src/dag/mod.rs

//! Dependency ordering, per-process lifecycles and the scheduling decision.
//!
//! - [`graph`] holds the ordering constraints and answers eligibility and
//!   blocking queries.
//! - [`process`] is the per-process retry state machine.
//! - [`budget`] counts failures against the task-wide limit.
//! - [`scheduler`] combines the three into one synchronous state machine that
//!   decides what launches next and when the task is done.
//! - [`attempt`] and [`scheduler_step`] are the values the scheduler hands
//!   back to its caller.

pub mod attempt;
pub mod budget;
pub mod graph;
pub mod process;
pub mod scheduler;
pub mod scheduler_step;

pub use attempt::ScheduledAttempt;
pub use budget::FailureBudget;
pub use graph::DependencyGraph;
pub use process::{AttemptVerdict, ProcessStateMachine, TransitionError};
pub use scheduler::{Scheduler, SchedulerOptions};
pub use scheduler_step::{SchedulerStep, TaskDecision};

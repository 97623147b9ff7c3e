// src/task/mod.rs

//! Task data model.
//!
//! - [`model`] holds the immutable, validated task description.
//! - [`record`] holds what supervision produces: runs, transitions and the
//!   final result.

pub mod model;
pub mod record;

pub use model::{Constraint, ProcessName, ProcessSpec, Resources, TaskSpec};
pub use record::{AttemptReport, ProcessRun, ProcessTransition, TaskResult, TaskStateEvent};

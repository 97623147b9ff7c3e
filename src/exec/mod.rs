// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running process command lines,
//! using `tokio::process::Command`, and reporting back to the orchestration
//! runtime via `RuntimeEvent`s.
//!
//! - [`backend`] provides the `ExecutorBackend` trait (the execution
//!   capability the orchestrator consumes) and the concrete
//!   `RealExecutorBackend`, which tests replace with a scripted one.
//! - [`executor_loop`] owns the loop that tracks in-flight attempts.
//! - [`attempt_runner`] runs one attempt's process.

pub mod attempt_runner;
pub mod backend;
pub mod executor_loop;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::{spawn_executor, ExecutorCommand};

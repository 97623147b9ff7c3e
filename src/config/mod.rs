// src/config/mod.rs

//! Task file loading and validation for taskwarden.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a task file from disk (`loader.rs`).
//! - Validate it into a `TaskSpec` plus supervisor options (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_task_path, load_and_validate, load_from_path};
pub use model::{
    ConfigSection, ConstraintConfig, ProcessConfig, RawTaskFile, ResourcesSection, TaskFile,
    TaskSection,
};

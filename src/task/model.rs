// src/task/model.rs

//! Immutable, validated task description.

use std::collections::HashSet;
use std::time::Duration;

use serde::Serialize;

use crate::dag::DependencyGraph;
use crate::errors::{Result, TaskwardenError};

/// Canonical process name type used throughout the supervisor.
pub type ProcessName = String;

/// Resource quantities requested by a task.
///
/// Opaque to scheduling; carried through for the surrounding system.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Resources {
    pub cpu: f64,
    pub ram_bytes: u64,
    pub disk_bytes: u64,
}

/// One named, independently retryable unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessSpec {
    pub name: ProcessName,
    /// Command description handed to the execution capability as-is.
    pub cmdline: String,
    /// Failed attempts tolerated before the process is permanently failed.
    /// `1` means the first failure is terminal.
    pub max_failures: u32,
    pub min_duration: Duration,
}

impl ProcessSpec {
    pub fn new(name: impl Into<String>, cmdline: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cmdline: cmdline.into(),
            max_failures: 1,
            min_duration: Duration::from_secs(5),
        }
    }
}

/// Ordering edge: `successor` may only start after `predecessor` succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Constraint {
    pub predecessor: ProcessName,
    pub successor: ProcessName,
}

impl Constraint {
    pub fn new(predecessor: impl Into<String>, successor: impl Into<String>) -> Self {
        Self {
            predecessor: predecessor.into(),
            successor: successor.into(),
        }
    }

    /// Expand an `order = [a, b, c]` chain into the edges `a -> b`, `b -> c`.
    pub fn chain<S: AsRef<str>>(order: &[S]) -> Vec<Constraint> {
        order
            .windows(2)
            .map(|pair| Constraint::new(pair[0].as_ref(), pair[1].as_ref()))
            .collect()
    }
}

/// Fully resolved task description.
///
/// Can only be obtained through [`TaskSpec::new`], so every instance is known
/// to have unique process names, positive per-process failure limits and an
/// acyclic constraint set over declared processes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSpec {
    name: String,
    resources: Resources,
    max_failures: u32,
    max_concurrency: usize,
    processes: Vec<ProcessSpec>,
    constraints: Vec<Constraint>,
}

impl TaskSpec {
    /// Validate and construct a task.
    ///
    /// `max_failures = 0` disables the task-level failure limit;
    /// `max_concurrency = 0` means no limit on concurrently running processes.
    pub fn new(
        name: impl Into<String>,
        resources: Resources,
        max_failures: u32,
        max_concurrency: usize,
        processes: Vec<ProcessSpec>,
        constraints: Vec<Constraint>,
    ) -> Result<Self> {
        let name = name.into();

        if processes.is_empty() {
            return Err(TaskwardenError::Config(format!(
                "task '{name}' must declare at least one process"
            )));
        }

        let mut seen = HashSet::new();
        for process in &processes {
            if !seen.insert(process.name.as_str()) {
                return Err(TaskwardenError::DuplicateProcess(process.name.clone()));
            }
            if process.max_failures == 0 {
                return Err(TaskwardenError::Config(format!(
                    "process '{}' must have max_failures >= 1",
                    process.name
                )));
            }
        }

        // Graph construction owns the unknown-name and cycle checks.
        DependencyGraph::new(processes.iter().map(|p| p.name.as_str()), &constraints)?;

        Ok(Self {
            name,
            resources,
            max_failures,
            max_concurrency,
            processes,
            constraints,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resources(&self) -> Resources {
        self.resources
    }

    pub fn max_failures(&self) -> u32 {
        self.max_failures
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Processes in declaration order.
    pub fn processes(&self) -> &[ProcessSpec] {
        &self.processes
    }

    pub fn process(&self, name: &str) -> Option<&ProcessSpec> {
        self.processes.iter().find(|p| p.name == name)
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }
}

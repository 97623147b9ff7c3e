#![allow(dead_code)]

use std::time::Duration;

use taskwarden::errors::Result;
use taskwarden::task::{Constraint, ProcessSpec, Resources, TaskSpec};

/// Builder for `TaskSpec` to simplify test setup.
///
/// Defaults: task `max_failures = 0` (no budget), no concurrency limit.
pub struct TaskSpecBuilder {
    name: String,
    resources: Resources,
    max_failures: u32,
    max_concurrency: usize,
    processes: Vec<ProcessSpec>,
    constraints: Vec<Constraint>,
}

impl TaskSpecBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            resources: Resources::default(),
            max_failures: 0,
            max_concurrency: 0,
            processes: vec![],
            constraints: vec![],
        }
    }

    pub fn max_failures(mut self, n: u32) -> Self {
        self.max_failures = n;
        self
    }

    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n;
        self
    }

    pub fn resources(mut self, cpu: f64, ram_bytes: u64, disk_bytes: u64) -> Self {
        self.resources = Resources {
            cpu,
            ram_bytes,
            disk_bytes,
        };
        self
    }

    pub fn with_process(mut self, process: ProcessSpecBuilder) -> Self {
        self.processes.push(process.build());
        self
    }

    /// Shorthand for a process with the given per-process failure limit.
    pub fn process(self, name: &str, max_failures: u32) -> Self {
        self.with_process(ProcessSpecBuilder::new(name).max_failures(max_failures))
    }

    /// `order = [a, b, c]` chain: `a -> b -> c`.
    pub fn order(mut self, names: &[&str]) -> Self {
        self.constraints.extend(Constraint::chain(names));
        self
    }

    pub fn try_build(self) -> Result<TaskSpec> {
        TaskSpec::new(
            self.name,
            self.resources,
            self.max_failures,
            self.max_concurrency,
            self.processes,
            self.constraints,
        )
    }

    pub fn build(self) -> TaskSpec {
        self.try_build()
            .expect("Failed to build valid task spec from builder")
    }
}

/// Builder for `ProcessSpec`.
///
/// Defaults: `cmdline = "true"`, `max_failures = 1`, `min_duration = 0`.
pub struct ProcessSpecBuilder {
    process: ProcessSpec,
}

impl ProcessSpecBuilder {
    pub fn new(name: &str) -> Self {
        let mut process = ProcessSpec::new(name, "true");
        process.min_duration = Duration::ZERO;
        Self { process }
    }

    pub fn cmdline(mut self, cmdline: &str) -> Self {
        self.process.cmdline = cmdline.to_string();
        self
    }

    pub fn max_failures(mut self, n: u32) -> Self {
        self.process.max_failures = n;
        self
    }

    pub fn min_duration(mut self, d: Duration) -> Self {
        self.process.min_duration = d;
        self
    }

    pub fn build(self) -> ProcessSpec {
        self.process
    }
}

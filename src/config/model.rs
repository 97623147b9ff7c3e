// src/config/model.rs

use serde::Deserialize;

use crate::engine::SupervisorOptions;
use crate::task::TaskSpec;
use crate::types::{FailureCounting, MinDurationPolicy};

/// Top-level task file as read from TOML, before validation.
///
/// ```toml
/// [config]
/// failure_counting = "processes"
/// min_duration_policy = "observe"
/// drain_timeout_secs = 5
///
/// [task]
/// name = "failing_task"
/// max_failures = 2
///
/// [[process]]
/// name = "a"
/// cmdline = "echo hello world"
///
/// [[constraint]]
/// order = ["a", "b"]
/// ```
///
/// Only `[task]` and at least one `[[process]]` are required.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTaskFile {
    /// Supervisor behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Task-level settings from `[task]`.
    pub task: TaskSection,

    /// Every `[[process]]` entry, in declaration order.
    #[serde(default)]
    pub process: Vec<ProcessConfig>,

    /// Every `[[constraint]]` entry.
    #[serde(default)]
    pub constraint: Vec<ConstraintConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// `"processes"` (default) or `"attempts"`.
    #[serde(default)]
    pub failure_counting: FailureCounting,

    /// `"observe"` (default) or `"delay_restart"`.
    #[serde(default)]
    pub min_duration_policy: MinDurationPolicy,

    /// Seconds to keep collecting completions after the task is decided.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

fn default_drain_timeout_secs() -> u64 {
    5
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            failure_counting: FailureCounting::default(),
            min_duration_policy: MinDurationPolicy::default(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

/// `[task]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskSection {
    pub name: String,

    /// Task-wide failure budget; `0` disables it.
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,

    /// Upper bound on simultaneously RUNNING processes; `0` = unlimited.
    #[serde(default)]
    pub max_concurrency: usize,

    #[serde(default)]
    pub resources: ResourcesSection,
}

/// `[task.resources]` section. Byte quantities.
#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct ResourcesSection {
    #[serde(default)]
    pub cpu: f64,
    #[serde(default)]
    pub ram: u64,
    #[serde(default)]
    pub disk: u64,
}

/// One `[[process]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessConfig {
    pub name: String,

    /// Command line, run through the platform shell.
    pub cmdline: String,

    /// Failed attempts tolerated before the process is terminal; must be >= 1.
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,

    /// Expected minimum healthy run time, in seconds.
    #[serde(default = "default_min_duration_secs")]
    pub min_duration: u64,
}

fn default_max_failures() -> u32 {
    1
}

fn default_min_duration_secs() -> u64 {
    5
}

/// One `[[constraint]]` entry: `order = ["a", "b", "c"]` means `a` before
/// `b` before `c`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConstraintConfig {
    pub order: Vec<String>,
}

/// Validated task file: supervisor options plus a fully checked [`TaskSpec`].
///
/// Obtained via `TaskFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct TaskFile {
    pub options: SupervisorOptions,
    pub task: TaskSpec,
}

// src/dag/attempt.rs

//! Attempts handed to the execution capability.

use std::time::Duration;

use crate::task::{ProcessName, ProcessSpec};

/// Description of an attempt that the scheduler wants launched now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledAttempt {
    pub process: ProcessName,
    /// 0-based attempt number; completions must echo it back.
    pub attempt_index: u32,
    pub cmdline: String,
    pub min_duration: Duration,
    /// How long the executor should wait before actually starting the
    /// attempt. Non-zero only for retries under `delay_restart`.
    pub restart_delay: Duration,
}

impl ScheduledAttempt {
    pub fn from_spec(spec: &ProcessSpec, attempt_index: u32, restart_delay: Duration) -> Self {
        Self {
            process: spec.name.clone(),
            attempt_index,
            cmdline: spec.cmdline.clone(),
            min_duration: spec.min_duration,
            restart_delay,
        }
    }
}

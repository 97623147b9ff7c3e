// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_task_path;
use crate::types::{FailureCounting, MinDurationPolicy};

/// Command-line arguments for `taskwarden`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskwarden",
    version,
    about = "Supervise a task's processes: ordering constraints, retries and a failure budget.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the task file (TOML).
    ///
    /// Default: `Task.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value_os_t = default_task_path())]
    pub task: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKWARDEN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the launch order, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Append every state transition to this file as JSON lines.
    #[arg(long, value_name = "PATH")]
    pub events: Option<PathBuf>,

    /// Override `[config].failure_counting` ("processes" or "attempts").
    #[arg(long, value_name = "MODE")]
    pub failure_counting: Option<FailureCounting>,

    /// Override `[config].min_duration_policy` ("observe" or "delay_restart").
    #[arg(long, value_name = "POLICY")]
    pub min_duration_policy: Option<MinDurationPolicy>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_task_toml() {
        let args = CliArgs::try_parse_from(["taskwarden"]).unwrap();
        assert_eq!(args.task, PathBuf::from("Task.toml"));
        assert!(!args.dry_run);
        assert!(args.events.is_none());
        assert!(args.failure_counting.is_none());
    }

    #[test]
    fn parses_policy_overrides() {
        let args = CliArgs::try_parse_from([
            "taskwarden",
            "--task",
            "jobs/build.toml",
            "--failure-counting",
            "attempts",
            "--min-duration-policy",
            "delay_restart",
            "--events",
            "events.jsonl",
        ])
        .unwrap();
        assert_eq!(args.task, PathBuf::from("jobs/build.toml"));
        assert_eq!(args.failure_counting, Some(FailureCounting::Attempts));
        assert_eq!(
            args.min_duration_policy,
            Some(MinDurationPolicy::DelayRestart)
        );
        assert_eq!(args.events, Some(PathBuf::from("events.jsonl")));
    }

    #[test]
    fn rejects_bad_policy() {
        assert!(CliArgs::try_parse_from(["taskwarden", "--failure-counting", "often"]).is_err());
    }
}

// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{ConstraintConfig, RawTaskFile, TaskFile};
use crate::dag::SchedulerOptions;
use crate::engine::SupervisorOptions;
use crate::errors::{Result, TaskwardenError};
use crate::task::{Constraint, ProcessSpec, Resources, TaskSpec};

impl TryFrom<RawTaskFile> for TaskFile {
    type Error = crate::errors::TaskwardenError;

    fn try_from(raw: RawTaskFile) -> std::result::Result<Self, Self::Error> {
        validate_task_section(&raw)?;
        let constraints = expand_constraints(&raw.constraint)?;

        let processes = raw
            .process
            .into_iter()
            .map(|p| ProcessSpec {
                name: p.name,
                cmdline: p.cmdline,
                max_failures: p.max_failures,
                min_duration: Duration::from_secs(p.min_duration),
            })
            .collect();

        let resources = Resources {
            cpu: raw.task.resources.cpu,
            ram_bytes: raw.task.resources.ram,
            disk_bytes: raw.task.resources.disk,
        };

        // Process-level checks (duplicates, unknown names, cycles) live in
        // `TaskSpec::new` so programmatic construction gets them too.
        let task = TaskSpec::new(
            raw.task.name,
            resources,
            raw.task.max_failures,
            raw.task.max_concurrency,
            processes,
            constraints,
        )?;

        let options = SupervisorOptions {
            scheduler: SchedulerOptions {
                failure_counting: raw.config.failure_counting,
                min_duration_policy: raw.config.min_duration_policy,
            },
            drain_timeout: Duration::from_secs(raw.config.drain_timeout_secs),
        };

        Ok(TaskFile { options, task })
    }
}

fn validate_task_section(raw: &RawTaskFile) -> Result<()> {
    if raw.task.name.trim().is_empty() {
        return Err(TaskwardenError::Config(
            "[task].name must not be empty".to_string(),
        ));
    }

    if raw.process.is_empty() {
        return Err(TaskwardenError::Config(
            "task file must contain at least one [[process]] section".to_string(),
        ));
    }

    if !raw.task.resources.cpu.is_finite() || raw.task.resources.cpu < 0.0 {
        return Err(TaskwardenError::Config(format!(
            "[task.resources].cpu must be a non-negative number (got {})",
            raw.task.resources.cpu
        )));
    }

    Ok(())
}

fn expand_constraints(entries: &[ConstraintConfig]) -> Result<Vec<Constraint>> {
    let mut constraints = Vec::new();
    for (idx, entry) in entries.iter().enumerate() {
        if entry.order.len() < 2 {
            return Err(TaskwardenError::Config(format!(
                "[[constraint]] #{} must list at least two processes in `order` (got {})",
                idx + 1,
                entry.order.len()
            )));
        }
        constraints.extend(Constraint::chain(&entry.order));
    }
    Ok(constraints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FailureCounting, MinDurationPolicy};

    fn parse(toml_str: &str) -> Result<TaskFile> {
        let raw: RawTaskFile = toml::from_str(toml_str)?;
        TaskFile::try_from(raw)
    }

    #[test]
    fn applies_defaults() {
        let file = parse(
            r#"
            [task]
            name = "t"

            [[process]]
            name = "a"
            cmdline = "true"
            "#,
        )
        .unwrap();

        assert_eq!(file.task.max_failures(), 1);
        assert_eq!(file.task.max_concurrency(), 0);
        let a = file.task.process("a").unwrap();
        assert_eq!(a.max_failures, 1);
        assert_eq!(a.min_duration, Duration::from_secs(5));
        assert_eq!(file.options, SupervisorOptions::default());
    }

    #[test]
    fn reads_every_section() {
        let file = parse(
            r#"
            [config]
            failure_counting = "attempts"
            min_duration_policy = "delay_restart"
            drain_timeout_secs = 1

            [task]
            name = "failing_task"
            max_failures = 2
            max_concurrency = 3
            [task.resources]
            cpu = 1.0
            ram = 16777216
            disk = 16384

            [[process]]
            name = "a"
            cmdline = "echo a"
            max_failures = 3
            min_duration = 1

            [[process]]
            name = "b"
            cmdline = "echo b"

            [[process]]
            name = "c"
            cmdline = "echo c"

            [[constraint]]
            order = ["a", "b", "c"]
            "#,
        )
        .unwrap();

        assert_eq!(
            file.options.scheduler.failure_counting,
            FailureCounting::Attempts
        );
        assert_eq!(
            file.options.scheduler.min_duration_policy,
            MinDurationPolicy::DelayRestart
        );
        assert_eq!(file.options.drain_timeout, Duration::from_secs(1));
        assert_eq!(file.task.name(), "failing_task");
        assert_eq!(file.task.max_failures(), 2);
        assert_eq!(file.task.max_concurrency(), 3);
        assert_eq!(file.task.resources().ram_bytes, 16_777_216);
        assert_eq!(
            file.task.constraints(),
            &[Constraint::new("a", "b"), Constraint::new("b", "c")]
        );
        let a = file.task.process("a").unwrap();
        assert_eq!(a.max_failures, 3);
        assert_eq!(a.min_duration, Duration::from_secs(1));
    }

    #[test]
    fn rejects_single_name_order() {
        let err = parse(
            r#"
            [task]
            name = "t"

            [[process]]
            name = "a"
            cmdline = "true"

            [[constraint]]
            order = ["a"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, TaskwardenError::Config(msg) if msg.contains("order")));
    }

    #[test]
    fn rejects_unknown_policy_value() {
        let err = parse(
            r#"
            [config]
            failure_counting = "sometimes"

            [task]
            name = "t"

            [[process]]
            name = "a"
            cmdline = "true"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, TaskwardenError::Toml(_)));
    }

    #[test]
    fn rejects_missing_processes() {
        let err = parse(
            r#"
            [task]
            name = "t"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, TaskwardenError::Config(msg) if msg.contains("[[process]]")));
    }
}

// tests/supervision_lifecycle.rs

use std::time::Duration;

use taskwarden::dag::SchedulerOptions;
use taskwarden::engine::SupervisorOptions;
use taskwarden::types::{
    AttemptOutcome, FailureCounting, FailureReason, MinDurationPolicy, ProcessState, TaskStatus,
};
use taskwarden_test_utils::{
    init_tracing, supervise, supervise_with_shutdown, ProcessSpecBuilder, Script,
    TaskSpecBuilder, SHORT_DRAIN,
};

fn options(counting: FailureCounting, policy: MinDurationPolicy) -> SupervisorOptions {
    SupervisorOptions {
        scheduler: SchedulerOptions {
            failure_counting: counting,
            min_duration_policy: policy,
        },
        drain_timeout: SHORT_DRAIN,
    }
}

#[tokio::test]
async fn shutdown_cancels_task_and_stops_running_attempts() {
    init_tracing();

    let spec = TaskSpecBuilder::new("cancel")
        .process("a", 1)
        .process("b", 1)
        .process("after_a", 1)
        .order(&["a", "after_a"])
        .build();
    let script = Script::new().hang("a").hang("b");

    let run = supervise_with_shutdown(&spec, SupervisorOptions::default(), script, true).await;

    assert_eq!(run.result.task_state, TaskStatus::Failed);
    assert_eq!(run.result.failure_reason(), Some(&FailureReason::Cancelled));
    assert_eq!(
        run.log.stopped(),
        vec![("a".to_string(), 0), ("b".to_string(), 0)]
    );

    // Stopped attempts still report, and their completions are recorded.
    for name in ["a", "b"] {
        let runs = run.result.runs_of(name).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].state, ProcessState::Failed);
        assert_eq!(runs[0].exit_code, Some(-1));
    }
    assert!(run.result.runs_of("after_a").is_none());
    assert_eq!(run.result.statuses.len(), 2);
}

#[tokio::test]
async fn drain_timeout_leaves_unreported_runs_open() {
    init_tracing();

    let spec = TaskSpecBuilder::new("drain")
        .process("a", 1)
        .process("slow", 1)
        .process("c", 1)
        .order(&["a", "c"])
        .build();
    let script = Script::new().fail("a").hang("slow").report_on_stop(false);

    let run = supervise(
        &spec,
        options(FailureCounting::Processes, MinDurationPolicy::Observe),
        script,
    )
    .await;

    assert_eq!(run.result.task_state, TaskStatus::Failed);
    assert_eq!(
        run.result.failure_reason(),
        Some(&FailureReason::DependencyFailed {
            process: "a".to_string()
        })
    );
    assert_eq!(run.log.stopped(), vec![("slow".to_string(), 0)]);

    let slow = run.result.runs_of("slow").unwrap();
    assert_eq!(slow.len(), 1);
    assert_eq!(slow[0].state, ProcessState::Running);
    assert!(slow[0].ended_at.is_none());
    assert!(run.result.runs_of("c").is_none());
}

#[tokio::test]
async fn late_completion_does_not_retry_or_change_decision() {
    init_tracing();

    let spec = TaskSpecBuilder::new("late")
        .max_failures(0)
        .process("a", 1)
        .process("slow", 3)
        .process("c", 1)
        .order(&["a", "c"])
        .build();
    let script = Script::new().fail("a").hang("slow");

    let run = supervise(
        &spec,
        options(FailureCounting::Processes, MinDurationPolicy::Observe),
        script,
    )
    .await;

    assert_eq!(run.result.task_state, TaskStatus::Failed);
    let slow = run.result.runs_of("slow").unwrap();
    assert_eq!(slow.len(), 1, "no retry after the task was decided");
    assert_eq!(slow[0].state, ProcessState::Failed);
    assert!(slow[0].ended_at.is_some());
    assert_eq!(run.log.attempts_of("slow"), 1);
    assert_eq!(
        run.result.failure_reason(),
        Some(&FailureReason::DependencyFailed {
            process: "a".to_string()
        })
    );
}

#[tokio::test]
async fn max_concurrency_launches_in_declaration_order() {
    init_tracing();

    let spec = TaskSpecBuilder::new("narrow")
        .max_concurrency(1)
        .process("p1", 1)
        .process("p2", 1)
        .process("p3", 1)
        .build();

    let run = supervise(&spec, SupervisorOptions::default(), Script::new()).await;

    assert_eq!(run.result.task_state, TaskStatus::Success);
    assert_eq!(run.log.started_names(), vec!["p1", "p2", "p3"]);
}

#[tokio::test]
async fn attempt_counting_fails_on_retried_attempts() {
    init_tracing();

    let spec = TaskSpecBuilder::new("counting")
        .max_failures(1)
        .process("flaky", 3)
        .build();
    let script = || {
        Script::new().outcomes(
            "flaky",
            [
                AttemptOutcome::Failed(1),
                AttemptOutcome::Failed(1),
                AttemptOutcome::Success,
            ],
        )
    };

    let by_process = supervise(
        &spec,
        options(FailureCounting::Processes, MinDurationPolicy::Observe),
        script(),
    )
    .await;
    assert_eq!(by_process.result.task_state, TaskStatus::Success);
    assert_eq!(by_process.log.attempts_of("flaky"), 3);

    let by_attempt = supervise(
        &spec,
        options(FailureCounting::Attempts, MinDurationPolicy::Observe),
        script(),
    )
    .await;
    assert_eq!(by_attempt.result.task_state, TaskStatus::Failed);
    assert_eq!(by_attempt.log.attempts_of("flaky"), 2);
    assert_eq!(
        by_attempt.result.failure_reason(),
        Some(&FailureReason::BudgetExceeded {
            process: "flaky".to_string(),
            failures: 2,
            limit: 1,
        })
    );
}

#[tokio::test]
async fn short_failures_are_recorded_and_optionally_delay_restart() {
    init_tracing();

    let spec = TaskSpecBuilder::new("flappy")
        .with_process(
            ProcessSpecBuilder::new("quick")
                .max_failures(2)
                .min_duration(Duration::from_secs(30)),
        )
        .build();
    let script = || {
        Script::new()
            .fail("quick")
            .duration("quick", Duration::from_secs(10))
    };

    let observed = supervise(
        &spec,
        options(FailureCounting::Processes, MinDurationPolicy::Observe),
        script(),
    )
    .await;
    let runs = observed.result.runs_of("quick").unwrap();
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().all(|r| r.min_duration_met == Some(false)));
    assert!(observed
        .log
        .started()
        .iter()
        .all(|a| a.restart_delay.is_zero()));

    let delayed = supervise(
        &spec,
        options(FailureCounting::Processes, MinDurationPolicy::DelayRestart),
        script(),
    )
    .await;
    let started = delayed.log.started();
    assert_eq!(started.len(), 2, "retry accounting is unchanged");
    assert_eq!(started[0].restart_delay, Duration::ZERO);
    assert_eq!(started[1].restart_delay, Duration::from_secs(20));
}

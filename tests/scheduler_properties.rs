// tests/scheduler_properties.rs

use std::collections::VecDeque;

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

use taskwarden::dag::{Scheduler, SchedulerOptions, TaskDecision};
use taskwarden::task::{AttemptReport, TaskResult, TaskSpec};
use taskwarden::types::{AttemptOutcome, FailureCounting, ProcessState};
use taskwarden_test_utils::TaskSpecBuilder;

const MAX_ATTEMPTS: usize = 4;

#[derive(Debug, Clone)]
struct Case {
    task_max_failures: u32,
    /// Per process: its `max_failures` and whether attempt `n` succeeds.
    processes: Vec<(u32, Vec<bool>)>,
    edges: Vec<(usize, usize)>,
}

fn name(i: usize) -> String {
    format!("p{i}")
}

// Acyclic by construction: process N may only depend on processes 0..N-1.
fn case_strategy(max_processes: usize, with_edges: bool) -> impl Strategy<Value = Case> {
    (1..=max_processes, 0u32..=3).prop_flat_map(move |(n, task_max_failures)| {
        let processes = proptest::collection::vec(
            (1u32..=MAX_ATTEMPTS as u32, proptest::collection::vec(any::<bool>(), MAX_ATTEMPTS)),
            n,
        );
        let raw_edges = proptest::collection::vec((any::<usize>(), any::<usize>()), 0..=n * 2);
        (processes, raw_edges).prop_map(move |(processes, raw_edges)| {
            let mut edges = Vec::new();
            if with_edges {
                for (a, b) in raw_edges {
                    let succ = b % n;
                    if succ == 0 {
                        continue;
                    }
                    let pred = a % succ;
                    if !edges.contains(&(pred, succ)) {
                        edges.push((pred, succ));
                    }
                }
            }
            Case {
                task_max_failures,
                processes,
                edges,
            }
        })
    })
}

fn build_spec(case: &Case) -> TaskSpec {
    let mut builder = TaskSpecBuilder::new("prop").max_failures(case.task_max_failures);
    for (i, (max_failures, _)) in case.processes.iter().enumerate() {
        builder = builder.process(&name(i), *max_failures);
    }
    for (a, b) in &case.edges {
        builder = builder.order(&[&name(*a), &name(*b)]);
    }
    builder.build()
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

/// Drive the scheduler to completion. `picks` chooses which in-flight attempt
/// completes next; an empty slice completes them in launch order.
fn simulate(
    case: &Case,
    counting: FailureCounting,
    picks: &[usize],
) -> (Option<TaskDecision>, TaskResult) {
    let spec = build_spec(case);
    let options = SchedulerOptions {
        failure_counting: counting,
        ..SchedulerOptions::default()
    };
    let mut scheduler = Scheduler::new(&spec, options).unwrap();

    let mut clock = 0i64;
    let mut in_flight: VecDeque<(String, u32)> = scheduler
        .start(at(clock))
        .launched
        .into_iter()
        .map(|a| (a.process, a.attempt_index))
        .collect();

    let mut steps = 0;
    while !in_flight.is_empty() {
        let pick = match picks {
            [] => 0,
            picks => picks[steps % picks.len()] % in_flight.len(),
        };
        let (process, attempt) = in_flight.remove(pick).unwrap();
        steps += 1;
        assert!(steps < 1_000, "simulation did not terminate");

        let idx: usize = process[1..].parse().unwrap();
        let succeeds = case.processes[idx].1[attempt as usize];
        clock += 1;
        let report = AttemptReport {
            outcome: if succeeds {
                AttemptOutcome::Success
            } else {
                AttemptOutcome::Failed(1)
            },
            started_at: at(clock - 1),
            ended_at: at(clock),
        };

        let step = scheduler.step_completion(&process, attempt, &report, at(clock));
        in_flight.extend(
            step.launched
                .into_iter()
                .map(|a| (a.process, a.attempt_index)),
        );
    }

    let result = TaskResult {
        task_state: match scheduler.decision() {
            Some(TaskDecision::Success) => taskwarden::types::TaskStatus::Success,
            Some(TaskDecision::Failed(_)) => taskwarden::types::TaskStatus::Failed,
            None => taskwarden::types::TaskStatus::Active,
        },
        statuses: vec![],
        processes: scheduler.records(),
    };
    (scheduler.decision().cloned(), result)
}

proptest! {
    #[test]
    fn run_count_bounded_and_stops_at_first_success(case in case_strategy(8, true)) {
        let (decision, result) = simulate(&case, FailureCounting::Processes, &[]);
        prop_assert!(decision.is_some(), "task must always reach a decision");

        for (i, (max_failures, _)) in case.processes.iter().enumerate() {
            let Some(runs) = result.runs_of(&name(i)) else { continue };
            prop_assert!(!runs.is_empty());
            prop_assert!(runs.len() <= *max_failures as usize);
            for (n, run) in runs.iter().enumerate() {
                prop_assert_eq!(run.attempt_index as usize, n);
                if run.state == ProcessState::Success {
                    prop_assert_eq!(n, runs.len() - 1, "success must be the last run");
                }
            }
        }
    }

    #[test]
    fn dependents_of_failed_processes_never_run(case in case_strategy(8, true)) {
        let (_, result) = simulate(&case, FailureCounting::Processes, &[]);

        for (pred, succ) in &case.edges {
            let pred_runs = result.runs_of(&name(*pred));
            let pred_failed = pred_runs
                .and_then(|r| r.last())
                .is_some_and(|r| r.state == ProcessState::Failed);
            let pred_succeeded = pred_runs
                .and_then(|r| r.last())
                .is_some_and(|r| r.state == ProcessState::Success);

            if pred_failed {
                prop_assert!(result.runs_of(&name(*succ)).is_none());
                prop_assert_eq!(result.task_state, taskwarden::types::TaskStatus::Failed);
            }
            if result.runs_of(&name(*succ)).is_some() {
                prop_assert!(pred_succeeded, "successor ran before predecessor succeeded");
            }
        }
    }

    #[test]
    fn unconstrained_tasks_without_budget_always_succeed(case in case_strategy(8, false)) {
        let case = Case { task_max_failures: 0, ..case };
        for counting in [FailureCounting::Processes, FailureCounting::Attempts] {
            let (decision, result) = simulate(&case, counting, &[]);
            prop_assert_eq!(decision, Some(TaskDecision::Success));
            prop_assert_eq!(result.processes.len(), case.processes.len());
        }
    }

    #[test]
    fn simulation_is_deterministic(case in case_strategy(6, true)) {
        let first = simulate(&case, FailureCounting::Processes, &[]);
        let second = simulate(&case, FailureCounting::Processes, &[]);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn completion_order_does_not_break_invariants(
        case in case_strategy(8, true),
        picks in proptest::collection::vec(any::<usize>(), 1..16),
    ) {
        for counting in [FailureCounting::Processes, FailureCounting::Attempts] {
            let (decision, result) = simulate(&case, counting, &picks);
            prop_assert!(decision.is_some(), "task must always reach a decision");

            for (i, (max_failures, _)) in case.processes.iter().enumerate() {
                let Some(runs) = result.runs_of(&name(i)) else { continue };
                prop_assert!(runs.len() <= *max_failures as usize);
                prop_assert!(runs.iter().all(|r| r.state != ProcessState::Running));
                for (n, run) in runs.iter().enumerate() {
                    if run.state == ProcessState::Success {
                        prop_assert_eq!(n, runs.len() - 1, "success must be the last run");
                    }
                }
            }

            for (pred, succ) in &case.edges {
                if result.runs_of(&name(*succ)).is_some() {
                    let pred_succeeded = result
                        .runs_of(&name(*pred))
                        .and_then(|r| r.last())
                        .is_some_and(|r| r.state == ProcessState::Success);
                    prop_assert!(pred_succeeded, "successor ran before predecessor succeeded");
                }
            }

            if decision == Some(TaskDecision::Success) {
                prop_assert_eq!(result.processes.len(), case.processes.len());
            }
        }
    }
}

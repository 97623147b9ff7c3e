use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::dag::attempt::ScheduledAttempt;
use crate::dag::budget::FailureBudget;
use crate::dag::graph::DependencyGraph;
use crate::dag::process::{AttemptVerdict, ProcessStateMachine};
use crate::dag::scheduler_step::{SchedulerStep, TaskDecision};
use crate::errors::Result;
use crate::task::{AttemptReport, ProcessName, ProcessRun, ProcessSpec, TaskSpec};
use crate::types::{FailureCounting, FailureReason, MinDurationPolicy, ProcessState};

/// Knobs for the open configuration points of the scheduling algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerOptions {
    pub failure_counting: FailureCounting,
    pub min_duration_policy: MinDurationPolicy,
}

/// Scheduler holds the immutable dependency graph plus all mutable per-task
/// state.
///
/// It is responsible for:
/// - launching PENDING processes whose predecessors all succeeded
/// - applying attempt outcomes to the per-process state machines
/// - relaunching processes that still have failure budget
/// - propagating permanent failures to dependents and the failure budget
/// - making the single terminal decision for the task
///
/// It is synchronous and performs no IO; every timestamp is passed in.
#[derive(Debug)]
pub struct Scheduler {
    graph: DependencyGraph,
    /// Process names in declaration order; launch order among eligible
    /// processes follows it.
    order: Vec<ProcessName>,
    specs: HashMap<ProcessName, ProcessSpec>,
    machines: HashMap<ProcessName, ProcessStateMachine>,
    budget: FailureBudget,
    max_concurrency: usize,
    options: SchedulerOptions,
    decision: Option<TaskDecision>,
}

impl Scheduler {
    /// Construct a scheduler for a validated [`TaskSpec`]. Every process
    /// starts PENDING.
    pub fn new(spec: &TaskSpec, options: SchedulerOptions) -> Result<Self> {
        let graph = DependencyGraph::new(
            spec.processes().iter().map(|p| p.name.as_str()),
            spec.constraints(),
        )?;

        let order = spec.processes().iter().map(|p| p.name.clone()).collect();
        let specs = spec
            .processes()
            .iter()
            .map(|p| (p.name.clone(), p.clone()))
            .collect();
        let machines = spec
            .processes()
            .iter()
            .map(|p| (p.name.clone(), ProcessStateMachine::new(p)))
            .collect();

        Ok(Self {
            graph,
            order,
            specs,
            machines,
            budget: FailureBudget::new(spec.max_failures(), options.failure_counting),
            max_concurrency: spec.max_concurrency(),
            options,
            decision: None,
        })
    }

    /// The terminal decision, once made.
    pub fn decision(&self) -> Option<&TaskDecision> {
        self.decision.as_ref()
    }

    pub fn is_decided(&self) -> bool {
        self.decision.is_some()
    }

    pub fn budget(&self) -> &FailureBudget {
        &self.budget
    }

    /// Current state of a process, `None` if unknown.
    pub fn state_of(&self, process: &str) -> Option<ProcessState> {
        self.machines.get(process).map(|m| m.state())
    }

    /// Attempts currently in flight, in declaration order.
    pub fn in_flight(&self) -> Vec<(ProcessName, u32)> {
        self.order
            .iter()
            .filter_map(|name| {
                let attempt = self.machines.get(name)?.open_attempt()?;
                Some((name.clone(), attempt))
            })
            .collect()
    }

    /// Runs of every process that was ever attempted.
    pub fn records(&self) -> BTreeMap<ProcessName, Vec<ProcessRun>> {
        self.machines
            .values()
            .filter(|m| !m.runs().is_empty())
            .map(|m| (m.name().to_string(), m.runs().to_vec()))
            .collect()
    }

    /// Launch every process that is eligible right now.
    pub fn start(&mut self, now: DateTime<Utc>) -> SchedulerStep {
        let mut step = SchedulerStep::default();
        if self.is_decided() {
            warn!("start called after the task was decided; ignoring");
            return step;
        }

        info!(processes = self.order.len(), "scheduler: starting task");
        self.collect_ready(now, &mut step);
        self.maybe_succeed(&mut step);
        step
    }

    /// Apply the completion of one attempt.
    pub fn step_completion(
        &mut self,
        process: &str,
        attempt_index: u32,
        report: &AttemptReport,
        now: DateTime<Utc>,
    ) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        let Some(machine) = self.machines.get_mut(process) else {
            warn!(process = %process, "completion for unknown process; ignoring");
            return step;
        };

        if self.decision.is_some() {
            match machine.complete_after_decision(attempt_index, report) {
                Ok(transition) => step.transitions.push(transition),
                Err(e) => warn!(error = %e, "ignoring completion after task decision"),
            }
            return step;
        }

        let (transition, verdict) =
            match machine.complete(attempt_index, report, self.options.min_duration_policy) {
                Ok(applied) => applied,
                Err(e) => {
                    warn!(error = %e, "ignoring completion");
                    return step;
                }
            };
        step.transitions.push(transition);

        match verdict {
            AttemptVerdict::Succeeded => {
                self.graph.record_success(process);
            }
            AttemptVerdict::Retry {
                next_attempt,
                restart_delay,
            } => {
                self.budget.record_failure(false);
                if self.budget.exceeded() {
                    let reason = self.budget_exceeded_reason(process);
                    self.decide_failed(reason, &mut step);
                    return step;
                }
                self.relaunch(process, next_attempt, restart_delay, now, &mut step);
            }
            AttemptVerdict::PermanentlyFailed => {
                self.budget.record_failure(true);
                step.newly_blocked = self.graph.record_failure(process);

                if self.graph.is_predecessor_of_any(process) {
                    let reason = FailureReason::DependencyFailed {
                        process: process.to_string(),
                    };
                    self.decide_failed(reason, &mut step);
                    return step;
                }
                if self.budget.exceeded() {
                    let reason = self.budget_exceeded_reason(process);
                    self.decide_failed(reason, &mut step);
                    return step;
                }
                debug!(
                    process = %process,
                    failures = self.budget.count(),
                    limit = self.budget.limit(),
                    "permanent failure tolerated"
                );
            }
        }

        self.collect_ready(now, &mut step);
        self.maybe_succeed(&mut step);
        step
    }

    /// Fail the task because shutdown was requested. No-op once decided.
    pub fn cancel(&mut self) -> SchedulerStep {
        let mut step = SchedulerStep::default();
        if self.decision.is_none() {
            self.decide_failed(FailureReason::Cancelled, &mut step);
        }
        step
    }

    fn relaunch(
        &mut self,
        process: &str,
        next_attempt: u32,
        restart_delay: Duration,
        now: DateTime<Utc>,
        step: &mut SchedulerStep,
    ) {
        let (Some(machine), Some(spec)) = (self.machines.get_mut(process), self.specs.get(process))
        else {
            return;
        };

        match machine.launch(now) {
            Ok(transition) => {
                debug_assert_eq!(transition.attempt_index, next_attempt);
                step.transitions.push(transition);
                step.launched.push(ScheduledAttempt::from_spec(
                    spec,
                    next_attempt,
                    restart_delay,
                ));
            }
            Err(e) => warn!(error = %e, "could not relaunch process"),
        }
    }

    /// Launch PENDING processes whose predecessors all succeeded, honouring
    /// `max_concurrency`.
    fn collect_ready(&mut self, now: DateTime<Utc>, step: &mut SchedulerStep) {
        let mut running = self
            .machines
            .values()
            .filter(|m| m.state() == ProcessState::Running)
            .count();

        // Decide first, then mutate to avoid borrowing issues.
        let candidates: Vec<ProcessName> = self
            .order
            .iter()
            .filter(|name| {
                self.state_of(name) == Some(ProcessState::Pending)
                    && self.graph.eligible(name)
                    && !self.graph.blocked(name)
            })
            .cloned()
            .collect();

        for name in candidates {
            if self.max_concurrency != 0 && running >= self.max_concurrency {
                debug!(
                    process = %name,
                    max_concurrency = self.max_concurrency,
                    "eligible but concurrency limit reached; staying PENDING"
                );
                break;
            }

            let (Some(machine), Some(spec)) = (self.machines.get_mut(&name), self.specs.get(&name))
            else {
                continue;
            };

            match machine.launch(now) {
                Ok(transition) => {
                    info!(process = %name, "dependencies satisfied; launching");
                    running += 1;
                    step.transitions.push(transition);
                    step.launched
                        .push(ScheduledAttempt::from_spec(spec, 0, Duration::ZERO));
                }
                Err(e) => warn!(error = %e, "could not launch process"),
            }
        }
    }

    /// Decide SUCCESS once nothing is running and nothing can still run.
    fn maybe_succeed(&mut self, step: &mut SchedulerStep) {
        if self.decision.is_some() {
            return;
        }

        let outstanding = self.machines.values().any(|m| match m.state() {
            ProcessState::Running => true,
            ProcessState::Pending => !self.graph.blocked(m.name()),
            ProcessState::Success | ProcessState::Failed => false,
        });

        if !outstanding {
            info!(
                tolerated_failures = self.budget.failed_process_count(),
                "scheduler: all processes settled; task succeeded"
            );
            self.decision = Some(TaskDecision::Success);
            step.decision = Some(TaskDecision::Success);
        }
    }

    fn decide_failed(&mut self, reason: FailureReason, step: &mut SchedulerStep) {
        let abandoned: Vec<&str> = self
            .order
            .iter()
            .filter(|name| self.state_of(name) == Some(ProcessState::Pending))
            .map(String::as_str)
            .collect();

        warn!(
            %reason,
            ?abandoned,
            "scheduler: task failed; abandoning pending processes"
        );

        step.to_stop = self.in_flight();
        self.decision = Some(TaskDecision::Failed(reason.clone()));
        step.decision = Some(TaskDecision::Failed(reason));
    }

    fn budget_exceeded_reason(&self, process: &str) -> FailureReason {
        FailureReason::BudgetExceeded {
            process: process.to_string(),
            failures: self.budget.count(),
            limit: self.budget.limit(),
        }
    }
}

// src/lib.rs

pub mod cli;
pub mod clock;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod task;
pub mod types;

use std::fs::OpenOptions;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::clock::{Clock, SystemClock};
use crate::config::loader::load_and_validate;
use crate::config::model::TaskFile;
use crate::dag::{DependencyGraph, Scheduler};
use crate::engine::{
    FanOutSink, JsonLinesSink, LogSink, OrchestratorCore, RuntimeEvent, SupervisorOptions,
    TaskOrchestrator,
};
use crate::exec::RealExecutorBackend;
use crate::task::TaskResult;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - task file loading and validation
/// - scheduler / core / runtime
/// - executor
/// - event sinks
/// - Ctrl-C handling
///
/// Returns `None` for `--dry-run`, otherwise the final task result.
pub async fn run(args: CliArgs) -> Result<Option<TaskResult>> {
    let file = load_and_validate(&args.task)
        .with_context(|| format!("loading task file '{}'", args.task.display()))?;
    let options = effective_options(&file, &args);

    if args.dry_run {
        print_dry_run(&file, &options)?;
        return Ok(None);
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let scheduler = Scheduler::new(&file.task, options.scheduler)?;

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    // Process executor backend (real implementation in production).
    let executor = RealExecutorBackend::new(rt_tx.clone(), Arc::clone(&clock));

    // Ctrl-C → fail the task as cancelled.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let mut sink = FanOutSink::new().with(LogSink);
    if let Some(path) = &args.events {
        let writer = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening event log '{}'", path.display()))?;
        sink = sink.with(JsonLinesSink::new(writer));
    }

    info!(
        task = %file.task.name(),
        processes = file.task.processes().len(),
        "starting task"
    );

    // Pure core (single source of truth for semantics) inside the async shell.
    let core = OrchestratorCore::new(scheduler, clock);
    let orchestrator = TaskOrchestrator::new(
        core,
        rt_rx,
        executor,
        Box::new(sink),
        options.drain_timeout,
    );
    let result = orchestrator.run().await?;
    Ok(Some(result))
}

/// `[config]` values with any CLI overrides applied.
fn effective_options(file: &TaskFile, args: &CliArgs) -> SupervisorOptions {
    let mut options = file.options;
    if let Some(counting) = args.failure_counting {
        options.scheduler.failure_counting = counting;
    }
    if let Some(policy) = args.min_duration_policy {
        options.scheduler.min_duration_policy = policy;
    }
    options
}

/// Simple dry-run output: print processes, constraints and a launch order.
fn print_dry_run(file: &TaskFile, options: &SupervisorOptions) -> Result<()> {
    let task = &file.task;
    let graph = DependencyGraph::new(
        task.processes().iter().map(|p| p.name.as_str()),
        task.constraints(),
    )?;

    println!("taskwarden dry-run");
    println!("  task = {}", task.name());
    println!("  task.max_failures = {}", task.max_failures());
    println!("  task.max_concurrency = {}", task.max_concurrency());
    let resources = task.resources();
    println!(
        "  task.resources = cpu {} / ram {} B / disk {} B",
        resources.cpu, resources.ram_bytes, resources.disk_bytes
    );
    println!(
        "  config.failure_counting = {:?}",
        options.scheduler.failure_counting
    );
    println!(
        "  config.min_duration_policy = {:?}",
        options.scheduler.min_duration_policy
    );
    println!("  config.drain_timeout = {:?}", options.drain_timeout);
    println!();

    println!("processes ({}):", task.processes().len());
    for process in task.processes() {
        println!("  - {}", process.name);
        println!("      cmdline: {}", process.cmdline);
        println!("      max_failures: {}", process.max_failures);
        println!("      min_duration: {:?}", process.min_duration);
        let deps = graph.dependencies_of(&process.name);
        if !deps.is_empty() {
            println!("      after: {:?}", deps);
        }
    }

    println!();
    println!("launch order: {}", graph.topological_order().join(" -> "));

    debug!("dry-run complete (no execution)");
    Ok(())
}

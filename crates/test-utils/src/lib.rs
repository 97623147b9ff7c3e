pub mod builders;
pub mod clock;
pub mod scripted_executor;

use std::sync::{Arc, Once};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing_subscriber::{fmt, EnvFilter};

use taskwarden::clock::Clock;
use taskwarden::dag::Scheduler;
use taskwarden::engine::{
    MemorySink, OrchestratorCore, RuntimeEvent, SupervisorEvent, SupervisorOptions,
    TaskOrchestrator,
};
use taskwarden::task::{TaskResult, TaskSpec};

pub use builders::{ProcessSpecBuilder, TaskSpecBuilder};
pub use clock::SteppingClock;
pub use scripted_executor::{ExecutorLog, Script, ScriptedExecutor};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Everything a scripted run produced.
#[derive(Debug)]
pub struct SupervisedRun {
    pub result: TaskResult,
    pub events: Vec<SupervisorEvent>,
    pub log: ExecutorLog,
}

/// Capacity of the runtime channel in scripted runs.
///
/// The scripted executor reports completions from inside `start_attempt`,
/// while the orchestrator is the only reader, so the channel must hold every
/// completion of one dispatch batch.
pub const SCRIPTED_CHANNEL_CAPACITY: usize = 1024;

/// Supervise `spec` end to end against a [`ScriptedExecutor`] with a fresh
/// [`SteppingClock`], collecting the result, the emitted events and what the
/// executor was asked to do.
pub async fn supervise(spec: &TaskSpec, options: SupervisorOptions, script: Script) -> SupervisedRun {
    supervise_with_shutdown(spec, options, script, false).await
}

/// Like [`supervise`], but optionally queues a `ShutdownRequested` before the
/// orchestrator starts reading the channel.
pub async fn supervise_with_shutdown(
    spec: &TaskSpec,
    options: SupervisorOptions,
    script: Script,
    shutdown: bool,
) -> SupervisedRun {
    let clock: Arc<dyn Clock> = Arc::new(SteppingClock::default());
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(SCRIPTED_CHANNEL_CAPACITY);

    if shutdown {
        tx.send(RuntimeEvent::ShutdownRequested)
            .await
            .expect("runtime channel open");
    }

    let executor = ScriptedExecutor::new(tx, script, Arc::clone(&clock));
    let log = executor.log();

    let sink = MemorySink::new();
    let scheduler = Scheduler::new(spec, options.scheduler).expect("valid task spec");
    let core = OrchestratorCore::new(scheduler, clock);
    let orchestrator = TaskOrchestrator::new(
        core,
        rx,
        executor,
        Box::new(sink.clone()),
        options.drain_timeout,
    );

    let result = with_timeout(orchestrator.run())
        .await
        .expect("orchestrator run");

    SupervisedRun {
        result,
        events: sink.events(),
        log,
    }
}

/// Drain timeout short enough to keep hung-attempt tests fast.
pub const SHORT_DRAIN: Duration = Duration::from_millis(50);

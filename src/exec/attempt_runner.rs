// src/exec/attempt_runner.rs

//! Individual attempt process runner.

use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::dag::ScheduledAttempt;
use crate::engine::RuntimeEvent;
use crate::task::AttemptReport;
use crate::types::AttemptOutcome;

/// Run a single attempt and report its completion.
///
/// Exactly one `AttemptCompleted` is sent per attempt, whatever happens:
/// - a process that cannot be spawned reports `Failed(-1)` immediately
/// - a stopped attempt is killed and reports whatever exit status it ends with
pub async fn run_attempt(
    attempt: ScheduledAttempt,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
    clock: Arc<dyn Clock>,
) {
    if !attempt.restart_delay.is_zero() {
        debug!(
            process = %attempt.process,
            attempt = attempt.attempt_index,
            delay_ms = attempt.restart_delay.as_millis() as u64,
            "waiting before restart"
        );
        tokio::select! {
            _ = tokio::time::sleep(attempt.restart_delay) => {}
            _ = &mut cancel_rx => {
                info!(
                    process = %attempt.process,
                    attempt = attempt.attempt_index,
                    "stopped before the attempt started"
                );
                let now = clock.now();
                report(&runtime_tx, &attempt, AttemptOutcome::Failed(-1), now, now).await;
                return;
            }
        }
    }

    let started_at = clock.now();
    let outcome = match execute(&attempt, &mut cancel_rx).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(
                process = %attempt.process,
                attempt = attempt.attempt_index,
                error = %err,
                "attempt execution error"
            );
            AttemptOutcome::Failed(-1)
        }
    };
    let ended_at = clock.now();

    report(&runtime_tx, &attempt, outcome, started_at, ended_at).await;
}

async fn report(
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
    attempt: &ScheduledAttempt,
    outcome: AttemptOutcome,
    started_at: chrono::DateTime<chrono::Utc>,
    ended_at: chrono::DateTime<chrono::Utc>,
) {
    let event = RuntimeEvent::AttemptCompleted {
        process: attempt.process.clone(),
        attempt_index: attempt.attempt_index,
        report: AttemptReport {
            outcome,
            started_at,
            ended_at,
        },
    };

    if runtime_tx.send(event).await.is_err() {
        debug!(
            process = %attempt.process,
            attempt = attempt.attempt_index,
            "runtime gone; dropping completion"
        );
    }
}

async fn execute(
    attempt: &ScheduledAttempt,
    cancel_rx: &mut oneshot::Receiver<()>,
) -> Result<AttemptOutcome> {
    info!(
        process = %attempt.process,
        attempt = attempt.attempt_index,
        cmdline = %attempt.cmdline,
        "starting attempt process"
    );

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&attempt.cmdline);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&attempt.cmdline);
        c
    };

    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process '{}'", attempt.process))?;

    // Always consume output so buffers don't fill; log at debug.
    if let Some(stdout) = child.stdout.take() {
        forward_lines(attempt, "stdout", stdout);
    }
    if let Some(stderr) = child.stderr.take() {
        forward_lines(attempt, "stderr", stderr);
    }

    // Either the process exits on its own (normal case), or a stop request
    // arrives and we kill it and collect the resulting status.
    let status = tokio::select! {
        status = child.wait() => status,
        cancel = &mut *cancel_rx => {
            if cancel.is_ok() {
                info!(
                    process = %attempt.process,
                    attempt = attempt.attempt_index,
                    "stop requested; killing process"
                );
                if let Err(e) = child.kill().await {
                    warn!(
                        process = %attempt.process,
                        attempt = attempt.attempt_index,
                        error = %e,
                        "failed to kill child process"
                    );
                }
            }
            child.wait().await
        }
    }
    .with_context(|| format!("waiting for process '{}'", attempt.process))?;

    let code = status.code().unwrap_or(-1);
    info!(
        process = %attempt.process,
        attempt = attempt.attempt_index,
        exit_code = code,
        success = status.success(),
        "attempt process exited"
    );

    Ok(if status.success() {
        AttemptOutcome::Success
    } else {
        AttemptOutcome::Failed(code)
    })
}

fn forward_lines<R>(attempt: &ScheduledAttempt, stream: &'static str, reader: R)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    let process = attempt.process.clone();
    let attempt_index = attempt.attempt_index;
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(process = %process, attempt = attempt_index, stream, "{}", line);
        }
    });
}

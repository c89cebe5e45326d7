// src/exec/monitor.rs

//! Per-task monitor.
//!
//! One monitor runs per spawned process. It owns the child, its attached
//! streams and the only sender of the task's state, so it is the single
//! writer: it decides the terminal outcome once, releases the streams once,
//! then publishes.

use std::process::ExitStatus;

use tokio::process::Child;
use tokio::sync::{mpsc, watch};
use tracing::{Level, debug, error, info, warn};

use crate::errors::TaskError;
use crate::io::AttachedStreams;
use crate::logger::log_best_effort;
use crate::task::TaskConfiguration;

use super::handle::{SignalRequest, Snapshot};
use super::outcome::{FailureKind, Outcome, TaskFailure};
use super::policy::{Termination, Verdict, exit_status_policy};
use super::signal::{self, SignalScope};

pub(crate) async fn watch_process(
    mut child: Child,
    streams: AttachedStreams,
    config: TaskConfiguration,
    status_tx: watch::Sender<Snapshot>,
    mut stop_rx: watch::Receiver<bool>,
    mut signal_rx: mpsc::UnboundedReceiver<SignalRequest>,
    scope: SignalScope,
) {
    let pid = child.id();

    // Natural exit and a stop request race here; whichever the select
    // observes first decides the outcome. Signal requests are served in
    // between, while the child is known to be unreaped.
    let outcome = loop {
        tokio::select! {
            biased;
            status = child.wait() => break match status {
                Ok(status) => classify_exit(&config, status),
                Err(e) => wait_failure(&config, e),
            },
            true = stop_requested(&mut stop_rx) => break cancel(&mut child, &config, scope).await,
            Some(request) = signal_rx.recv() => {
                let result = signal::send_to_child(&child, config.program_name(), request.signal);
                debug!(program = %config.program_name(), signal = request.signal, ok = result.is_ok(), "delivered signal");
                let _ = request.reply.send(result);
            }
        }
    };

    debug!(program = %config.program_name(), ?pid, "releasing task streams");
    config.io().release(streams).await;

    report(&config, pid, &outcome);
    status_tx.send_replace(Snapshot::terminal(outcome));
}

/// Resolves to `true` on a stop request, `false` if every handle is gone
/// (the task then simply runs to completion).
async fn stop_requested(stop_rx: &mut watch::Receiver<bool>) -> bool {
    stop_rx.wait_for(|requested| *requested).await.is_ok()
}

async fn cancel(child: &mut Child, config: &TaskConfiguration, scope: SignalScope) -> Outcome {
    let program = config.program_name();

    // The process may have exited between the stop request and now. If so,
    // nothing was signalled and the natural exit stands.
    match child.try_wait() {
        Ok(Some(status)) => {
            debug!(program, "stop requested after process exited; keeping natural outcome");
            return classify_exit(config, status);
        }
        Ok(None) => {}
        Err(e) => return wait_failure(config, e),
    }

    let grace = config.grace_period();
    info!(program, ?grace, "stop requested; sending termination signal");
    log_best_effort(
        config.logger().map(|l| l.as_ref()),
        Level::INFO,
        &format!("stopping {program}"),
    );
    signal::request_termination(child, scope);

    let status = match tokio::time::timeout(grace, child.wait()).await {
        Ok(status) => status,
        Err(_) => {
            warn!(program, ?grace, "grace period elapsed; killing process");
            signal::force_kill(child, scope);
            child.wait().await
        }
    };

    match status {
        Ok(status) => {
            let termination = Termination::from_status(status);
            Outcome::Failure(TaskFailure::new(
                FailureKind::Cancelled,
                Some(termination.code_or_signal()),
                TaskError::Cancelled {
                    program: program.to_string(),
                }
                .to_string(),
            ))
        }
        Err(e) => wait_failure(config, e),
    }
}

fn classify_exit(config: &TaskConfiguration, status: ExitStatus) -> Outcome {
    let termination = Termination::from_status(status);
    let program = config.program_name().to_string();

    match (
        exit_status_policy(termination, config.acceptable_exit_codes()),
        termination,
    ) {
        (Verdict::Completed, Termination::Exited(exit_code)) => Outcome::Success { exit_code },
        (Verdict::Completed, Termination::Signaled(signal)) => {
            // The policy never accepts a signal death; treat as one anyway.
            signal_failure(program, signal)
        }
        (Verdict::Failed(FailureKind::ExitCodePolicy), Termination::Exited(code)) => {
            let error = TaskError::ExitCodePolicy {
                program,
                code,
                expected: config.acceptable_exit_codes().cloned().unwrap_or_default(),
            };
            Outcome::Failure(TaskFailure::new(
                FailureKind::ExitCodePolicy,
                Some(code),
                error.to_string(),
            ))
        }
        (Verdict::Failed(kind), termination) => {
            debug_assert_eq!(kind, FailureKind::SignalTermination);
            signal_failure(program, termination.code_or_signal())
        }
    }
}

fn signal_failure(program: String, signal: i32) -> Outcome {
    let error = TaskError::SignalTermination { program, signal };
    Outcome::Failure(TaskFailure::new(
        FailureKind::SignalTermination,
        Some(signal),
        error.to_string(),
    ))
}

fn wait_failure(config: &TaskConfiguration, e: std::io::Error) -> Outcome {
    error!(program = %config.program_name(), error = %e, "waiting for task process failed");
    let error = TaskError::Monitor {
        program: config.program_name().to_string(),
    };
    Outcome::Failure(TaskFailure::new(
        FailureKind::Monitor,
        e.raw_os_error(),
        format!("{error}: {e}"),
    ))
}

fn report(config: &TaskConfiguration, pid: Option<u32>, outcome: &Outcome) {
    let program = config.program_name();
    let code = outcome.code_or_signal();

    match outcome {
        Outcome::Success { .. } => {
            info!(program, ?pid, exit_code = ?code, "task process completed")
        }
        Outcome::Failure(f) if f.kind == FailureKind::Cancelled => {
            info!(program, ?pid, code_or_signal = ?code, "task process cancelled")
        }
        Outcome::Failure(f) => {
            warn!(program, ?pid, kind = %f.kind, code_or_signal = ?code, "task process failed")
        }
    }

    let level = if outcome.is_success() {
        Level::INFO
    } else {
        Level::ERROR
    };
    log_best_effort(
        config.logger().map(|l| l.as_ref()),
        level,
        &format!("{program}: {outcome}"),
    );
}

// src/exec/executor.rs

//! Spawning tasks and driving them to a terminal outcome.

use std::time::Duration;

use tokio::process::Command;
use tokio::sync::{mpsc, watch};
use tracing::{Level, debug, error, info, warn};

use crate::errors::TaskError;
use crate::io::{AttachedStreams, StreamContext};
use crate::logger::log_best_effort;
use crate::task::TaskConfiguration;

use super::handle::{Snapshot, TaskHandle};
use super::monitor::watch_process;
use super::outcome::{Completion, FailureKind, Outcome, TaskFailure};
use super::signal::SignalScope;

/// Starts task processes and hands out [`TaskHandle`]s.
///
/// The executor itself holds no per-task state: each started task gets its
/// own monitor running on the current Tokio runtime, which owns the process
/// until it is reaped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskExecutor;

impl TaskExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Spawn the process described by `configuration`.
    ///
    /// Always returns a handle. If the process cannot be spawned the handle
    /// is already `Failed` with a [`FailureKind::Launch`] outcome; otherwise
    /// it is `Running` and a monitor is watching the process.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn start(&self, configuration: TaskConfiguration) -> TaskHandle {
        let program = configuration.program_name().to_string();
        let (status_tx, status_rx) = watch::channel(Snapshot::pending());
        let (stop_tx, stop_rx) = watch::channel(false);
        // Dropped without a monitor on the failure paths, so signal requests
        // to a task that never ran report it as not running.
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();

        // Values built through the public constructors always pass; this only
        // guards the invariants the rest of the executor relies on.
        if let Err(e) = configuration.validate() {
            let error = TaskError::from(e);
            error!(program = %program, error = %error, "refusing to start invalid task");
            let outcome = Outcome::Failure(TaskFailure::new(
                FailureKind::Launch,
                None,
                error.to_string(),
            ));
            configuration.io().release(AttachedStreams::empty()).await;
            status_tx.send_replace(Snapshot::terminal(outcome));
            return TaskHandle::new(program, None, status_rx, stop_tx, signal_tx);
        }

        info!(
            program = %program,
            launch_path = %configuration.launch_path(),
            args = ?configuration.arguments(),
            "starting task process"
        );
        log_best_effort(
            configuration.logger().map(|l| l.as_ref()),
            Level::INFO,
            &format!("launching {configuration}"),
        );

        let scope = if configuration.io().shares_terminal() {
            SignalScope::Process
        } else {
            SignalScope::Group
        };
        let mut cmd = build_command(&configuration, scope);
        let spawned = configuration
            .io()
            .attach(&mut cmd)
            .and_then(|()| cmd.spawn());

        let mut child = match spawned {
            Ok(child) => child,
            Err(source) => {
                let code = source.raw_os_error();
                let error = TaskError::Launch {
                    program: program.clone(),
                    source,
                };
                warn!(program = %program, error = %error, "task process failed to launch");
                log_best_effort(
                    configuration.logger().map(|l| l.as_ref()),
                    Level::ERROR,
                    &error.to_string(),
                );

                configuration.io().release(AttachedStreams::empty()).await;
                let outcome =
                    Outcome::Failure(TaskFailure::new(FailureKind::Launch, code, error.to_string()));
                status_tx.send_replace(Snapshot::terminal(outcome));
                return TaskHandle::new(program, None, status_rx, stop_tx, signal_tx);
            }
        };

        let pid = child.id();
        let ctx = StreamContext {
            program_name: program.clone(),
            logger: configuration.logger().cloned(),
        };
        let streams = configuration.io().connect(&mut child, &ctx);
        debug!(program = %program, ?pid, ?scope, pumps = streams.pump_count(), "task streams connected");

        status_tx.send_replace(Snapshot::running());
        let handle = TaskHandle::new(program, pid, status_rx, stop_tx, signal_tx);

        tokio::spawn(watch_process(
            child,
            streams,
            configuration,
            status_tx,
            stop_rx,
            signal_rx,
            scope,
        ));

        handle
    }

    /// Wait for `handle` to finish, or until `timeout` elapses.
    ///
    /// A timeout leaves the task running; call [`stop`](Self::stop) to
    /// cancel it. Calling this again on a finished task returns the same
    /// outcome.
    pub async fn await_completion(
        &self,
        handle: &TaskHandle,
        timeout: Option<Duration>,
    ) -> Completion {
        handle.wait_timeout(timeout).await
    }

    /// Request cancellation of `handle`. No-op once it is terminal.
    pub fn stop(&self, handle: &TaskHandle) {
        handle.stop();
    }

    /// Start a task and wait for it, stopping it if `timeout` elapses first.
    pub async fn run(&self, configuration: TaskConfiguration, timeout: Option<Duration>) -> Outcome {
        let handle = self.start(configuration).await;

        match self.await_completion(&handle, timeout).await {
            Completion::Finished(outcome) => outcome,
            Completion::TimedOut => {
                info!(
                    program = %handle.program_name(),
                    ?timeout,
                    "task exceeded its timeout; stopping"
                );
                handle.stop_and_wait().await
            }
        }
    }
}

/// Build the command with an exact environment: nothing is inherited that
/// the configuration does not list.
fn build_command(configuration: &TaskConfiguration, scope: SignalScope) -> Command {
    let mut cmd = std::process::Command::new(configuration.launch_path());
    cmd.args(configuration.arguments())
        .env_clear()
        .envs(configuration.environment());

    if let Some(dir) = configuration.working_directory() {
        cmd.current_dir(dir);
    }

    // Own process group, so cancellation reaches the whole tree. A task on
    // our terminal stays in the foreground group instead.
    #[cfg(unix)]
    if scope == SignalScope::Group {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    #[cfg(not(unix))]
    let _ = scope;

    Command::from(cmd)
}

// src/exec/handle.rs

//! Caller-facing handle for one spawned task.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use crate::errors::{Result, TaskError};
use crate::types::TaskState;

use super::outcome::{Completion, FailureKind, Outcome, TaskFailure};

/// State and outcome published together.
///
/// `outcome` is `Some` exactly when `state` is terminal; both are replaced in
/// one `watch` send, so no observer can see one without the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub state: TaskState,
    pub outcome: Option<Outcome>,
}

impl Snapshot {
    pub(crate) fn pending() -> Self {
        Self {
            state: TaskState::Pending,
            outcome: None,
        }
    }

    pub(crate) fn running() -> Self {
        Self {
            state: TaskState::Running,
            outcome: None,
        }
    }

    pub(crate) fn terminal(outcome: Outcome) -> Self {
        Self {
            state: outcome.state(),
            outcome: Some(outcome),
        }
    }
}

/// A signal for the monitor to deliver while it still owns the child.
#[derive(Debug)]
pub(crate) struct SignalRequest {
    pub(crate) signal: i32,
    pub(crate) reply: oneshot::Sender<Result<()>>,
}

struct Shared {
    program_name: String,
    pid: Option<u32>,
    status: watch::Receiver<Snapshot>,
    stop: watch::Sender<bool>,
    signals: mpsc::UnboundedSender<SignalRequest>,
}

/// Shared, cloneable view of a task.
///
/// Only the executor's monitor writes the task's state; every clone of the
/// handle is a reader. Waiting is fan-out: any number of clones may wait
/// concurrently and all observe the same terminal [`Outcome`].
#[derive(Clone)]
pub struct TaskHandle {
    inner: Arc<Shared>,
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("program_name", &self.inner.program_name)
            .field("pid", &self.inner.pid)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl TaskHandle {
    pub(crate) fn new(
        program_name: String,
        pid: Option<u32>,
        status: watch::Receiver<Snapshot>,
        stop: watch::Sender<bool>,
        signals: mpsc::UnboundedSender<SignalRequest>,
    ) -> Self {
        Self {
            inner: Arc::new(Shared {
                program_name,
                pid,
                status,
                stop,
                signals,
            }),
        }
    }

    pub fn program_name(&self) -> &str {
        &self.inner.program_name
    }

    /// OS process id, or `None` if the process was never spawned.
    pub fn pid(&self) -> Option<u32> {
        self.inner.pid
    }

    pub fn snapshot(&self) -> Snapshot {
        self.inner.status.borrow().clone()
    }

    pub fn state(&self) -> TaskState {
        self.inner.status.borrow().state
    }

    /// The terminal outcome, once there is one.
    pub fn outcome(&self) -> Option<Outcome> {
        self.inner.status.borrow().outcome.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Wait until the task reaches a terminal state.
    pub async fn wait(&self) -> Outcome {
        let mut status = self.inner.status.clone();
        let terminal = status
            .wait_for(|snapshot| snapshot.state.is_terminal())
            .await
            .ok()
            .and_then(|snapshot| snapshot.outcome.clone());

        terminal.unwrap_or_else(|| {
            Outcome::Failure(TaskFailure::new(
                FailureKind::Monitor,
                None,
                TaskError::Monitor {
                    program: self.inner.program_name.clone(),
                }
                .to_string(),
            ))
        })
    }

    /// Wait with an optional deadline. Reaching the deadline does not stop
    /// the task.
    pub async fn wait_timeout(&self, timeout: Option<Duration>) -> Completion {
        match timeout {
            None => Completion::Finished(self.wait().await),
            Some(limit) => match tokio::time::timeout(limit, self.wait()).await {
                Ok(outcome) => Completion::Finished(outcome),
                Err(_) => Completion::TimedOut,
            },
        }
    }

    /// Ask the monitor to cancel the task.
    ///
    /// Does nothing once the task is terminal. Repeated requests are merged.
    pub fn stop(&self) {
        if self.is_finished() {
            debug!(program = %self.inner.program_name, "stop ignored; task already finished");
            return;
        }
        self.inner.stop.send_replace(true);
    }

    /// Request cancellation and wait for the terminal outcome.
    pub async fn stop_and_wait(&self) -> Outcome {
        self.stop();
        self.wait().await
    }

    /// Deliver `signal` to the task process without requesting cancellation.
    ///
    /// The resulting exit is classified like any other, so a fatal signal
    /// produces a [`FailureKind::SignalTermination`] outcome. The monitor
    /// delivers the signal, so it never reaches a process that has already
    /// been reaped.
    #[cfg(unix)]
    pub async fn send_signal(&self, signal: i32) -> Result<()> {
        let not_running = || TaskError::NotRunning {
            program: self.inner.program_name.clone(),
        };

        if self.is_finished() {
            return Err(not_running());
        }

        let (reply, response) = oneshot::channel();
        self.inner
            .signals
            .send(SignalRequest { signal, reply })
            .map_err(|_| not_running())?;
        response.await.map_err(|_| not_running())?
    }
}

// src/exec/outcome.rs

//! Terminal results reported for a task.

use std::fmt;

use thiserror::Error;

use crate::types::TaskState;

/// Classified cause of a failed or cancelled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The process could not be spawned (missing executable, permissions,
    /// stdio setup, resource exhaustion).
    Launch,
    /// The process exited normally with a code outside the acceptable set.
    ExitCodePolicy,
    /// The process was killed by a signal nobody asked the executor to send.
    SignalTermination,
    /// The caller stopped the task before it exited on its own.
    Cancelled,
    /// Monitoring ended before the process was seen to exit (runtime
    /// shutdown, wait failure).
    Monitor,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Launch => "launch error",
            FailureKind::ExitCodePolicy => "exit code policy error",
            FailureKind::SignalTermination => "signal termination",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Monitor => "monitor error",
        };
        f.write_str(s)
    }
}

/// Failure descriptor carried by [`Outcome::Failure`].
///
/// `code_or_signal` holds the exit code for policy failures, the signal
/// number for signal deaths, the raw OS error for launch failures, and
/// whichever of exit code or signal ended a cancelled process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TaskFailure {
    pub kind: FailureKind,
    pub code_or_signal: Option<i32>,
    pub message: String,
}

impl TaskFailure {
    pub fn new(kind: FailureKind, code_or_signal: Option<i32>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code_or_signal,
            message: message.into(),
        }
    }
}

/// Terminal result of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { exit_code: i32 },
    Failure(TaskFailure),
}

impl Outcome {
    /// The terminal state this outcome corresponds to.
    pub fn state(&self) -> TaskState {
        match self {
            Outcome::Success { .. } => TaskState::Completed,
            Outcome::Failure(f) if f.kind == FailureKind::Cancelled => TaskState::Cancelled,
            Outcome::Failure(_) => TaskState::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn failure(&self) -> Option<&TaskFailure> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Failure(f) => Some(f),
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure().map(|f| f.kind)
    }

    /// The exit code for a success, otherwise the failure's code or signal.
    pub fn code_or_signal(&self) -> Option<i32> {
        match self {
            Outcome::Success { exit_code } => Some(*exit_code),
            Outcome::Failure(f) => f.code_or_signal,
        }
    }

    pub fn into_result(self) -> Result<i32, TaskFailure> {
        match self {
            Outcome::Success { exit_code } => Ok(exit_code),
            Outcome::Failure(f) => Err(f),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success { exit_code } => write!(f, "success (exit code {exit_code})"),
            Outcome::Failure(failure) => write!(f, "{}: {}", failure.kind, failure.message),
        }
    }
}

/// Result of waiting on a task with an optional deadline.
///
/// `TimedOut` only means the deadline passed; the task keeps running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Finished(Outcome),
    TimedOut,
}

impl Completion {
    pub fn outcome(&self) -> Option<&Outcome> {
        match self {
            Completion::Finished(outcome) => Some(outcome),
            Completion::TimedOut => None,
        }
    }

    pub fn into_outcome(self) -> Option<Outcome> {
        match self {
            Completion::Finished(outcome) => Some(outcome),
            Completion::TimedOut => None,
        }
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Completion::TimedOut)
    }
}

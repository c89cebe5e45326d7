use std::fmt;

use serde::Deserialize;

/// Lifecycle state of a single task.
///
/// `Pending -> Running -> {Completed, Failed, Cancelled}`. A launch failure
/// goes straight from `Pending` to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Where a task's stdout or stderr goes, as written in a task file.
///
/// - `Inherit`: share the parent's stream (default).
/// - `Null`: discard.
/// - `Log`: pipe and forward each line to the task logger.
/// - `File`: redirect into the file named by `stdout_path` / `stderr_path`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamTarget {
    Inherit,
    Null,
    Log,
    File,
}

impl Default for StreamTarget {
    fn default() -> Self {
        StreamTarget::Inherit
    }
}

/// Where a task's stdin comes from, as written in a task file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StdinSource {
    Null,
    Inherit,
    File,
}

impl Default for StdinSource {
    fn default() -> Self {
        StdinSource::Null
    }
}

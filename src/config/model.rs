// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::task::TaskConfiguration;
use crate::types::{StdinSource, StreamTarget};

/// Top-level task file as read from TOML.
///
/// ```toml
/// [task]
/// program_name = "lister"
/// launch_path = "/bin/ls"
/// arguments = ["-l", "/tmp"]
/// acceptable_exit_codes = [0]
/// grace_period = "5s"
///
/// [task.environment]
/// LANG = "C"
///
/// [task.io]
/// stdout = "log"
/// ```
///
/// No semantic validation happens here; see [`TaskFile`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawTaskFile {
    pub task: TaskSection,
}

/// `[task]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskSection {
    /// Executable to run. Passed to the OS as-is; no shell is involved.
    pub launch_path: String,

    /// Display name for logs and errors. Defaults to the file name of
    /// `launch_path`.
    #[serde(default)]
    pub program_name: Option<String>,

    #[serde(default)]
    pub arguments: Vec<String>,

    /// Exact child environment.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    /// Copy this process's environment into `environment` first (explicit
    /// entries win).
    #[serde(default)]
    pub inherit_environment: bool,

    /// If omitted, every normal exit counts as success.
    #[serde(default)]
    pub acceptable_exit_codes: Option<Vec<i32>>,

    #[serde(default)]
    pub working_directory: Option<PathBuf>,

    /// Duration string (e.g. `"5s"`) between the termination signal and the
    /// forceful kill when the task is stopped.
    #[serde(default)]
    pub grace_period: Option<String>,

    /// Duration string after which the runner stops the task.
    #[serde(default)]
    pub timeout: Option<String>,

    #[serde(default)]
    pub io: IoSection,
}

/// `[task.io]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IoSection {
    #[serde(default)]
    pub stdin: StdinSource,

    #[serde(default)]
    pub stdout: StreamTarget,

    #[serde(default)]
    pub stderr: StreamTarget,

    /// Required when `stdin = "file"`.
    #[serde(default)]
    pub stdin_path: Option<PathBuf>,

    /// Required when `stdout = "file"`.
    #[serde(default)]
    pub stdout_path: Option<PathBuf>,

    /// Required when `stderr = "file"`.
    #[serde(default)]
    pub stderr_path: Option<PathBuf>,
}

/// A validated task file: a ready-to-run configuration plus runner options.
///
/// Only obtainable through `TryFrom<RawTaskFile>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct TaskFile {
    configuration: TaskConfiguration,
    timeout: Option<Duration>,
}

impl TaskFile {
    pub(crate) fn new_unchecked(configuration: TaskConfiguration, timeout: Option<Duration>) -> Self {
        Self {
            configuration,
            timeout,
        }
    }

    pub fn configuration(&self) -> &TaskConfiguration {
        &self.configuration
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn into_parts(self) -> (TaskConfiguration, Option<Duration>) {
        (self.configuration, self.timeout)
    }
}

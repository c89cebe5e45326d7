// src/errors.rs

//! Crate-wide error types and aliases.

use std::collections::BTreeSet;

use thiserror::Error;

/// A `TaskConfiguration` invariant was violated at construction time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("launch path must not be empty")]
    EmptyLaunchPath,

    #[error("program name must not be empty")]
    EmptyProgramName,

    #[error("acceptable exit codes, when given, must contain at least one code")]
    EmptyAcceptableExitCodes,

    #[error("grace period must be greater than zero")]
    ZeroGracePeriod,
}

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Invalid task configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with code {code}, expected one of {expected:?}")]
    ExitCodePolicy {
        program: String,
        code: i32,
        expected: BTreeSet<i32>,
    },

    #[error("'{program}' was terminated by signal {signal}")]
    SignalTermination { program: String, signal: i32 },

    #[error("'{program}' was cancelled")]
    Cancelled { program: String },

    #[error("monitor for '{program}' stopped before the process was observed to exit")]
    Monitor { program: String },

    #[error("'{program}' is not running")]
    NotRunning { program: String },

    #[error("Signal delivery failed: {0}")]
    Signal(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, TaskError>;

// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `taskexec`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskexec",
    version,
    about = "Run one external process under a task file's exit code and cancellation policy.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the task file (TOML).
    ///
    /// Default: `Task.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Task.toml")]
    pub config: String,

    /// Stop the task if it runs longer than this (e.g. `30s`, `2m`).
    ///
    /// Overrides `[task].timeout` from the task file.
    #[arg(long, value_name = "DURATION")]
    pub timeout: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKEXEC_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the task, but don't launch it.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

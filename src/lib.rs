// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod io;
pub mod logger;
pub mod logging;
pub mod task;
pub mod types;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::load_and_validate;
use crate::config::parse_duration;
use crate::exec::{Completion, TaskExecutor};

pub use crate::exec::{Outcome, TaskHandle};
pub use crate::task::{TaskConfiguration, TaskConfigurationBuilder};

/// High-level entry point used by `main.rs`.
///
/// Loads the task file, starts the task, stops it on timeout or Ctrl-C, and
/// returns the exit code to report. A failed task becomes an error.
pub async fn run(args: CliArgs) -> Result<i32> {
    let config_path = PathBuf::from(&args.config);
    let task_file = load_and_validate(&config_path)
        .with_context(|| format!("loading task file {}", config_path.display()))?;

    let cli_timeout = args
        .timeout
        .as_deref()
        .map(parse_duration)
        .transpose()
        .map_err(|e| anyhow::anyhow!("--timeout: {e}"))?;
    if cli_timeout.is_some_and(|t| t.is_zero()) {
        anyhow::bail!("--timeout must be greater than zero");
    }

    if args.dry_run {
        print_dry_run(&task_file);
        return Ok(0);
    }

    let (configuration, file_timeout) = task_file.into_parts();
    let timeout = cli_timeout.or(file_timeout);

    let executor = TaskExecutor::new();
    let handle = executor.start(configuration).await;

    // Ctrl-C → graceful stop (grace period applies).
    {
        let handle = handle.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            info!("Ctrl+C received; stopping task");
            handle.stop();
        });
    }

    let outcome = match executor.await_completion(&handle, timeout).await {
        Completion::Finished(outcome) => outcome,
        Completion::TimedOut => {
            info!(?timeout, "task timed out; stopping");
            handle.stop_and_wait().await
        }
    };

    debug!(%outcome, "task finished");
    let code = outcome.into_result()?;
    Ok(code)
}

/// Simple dry-run output: print the validated task.
fn print_dry_run(task_file: &config::TaskFile) {
    let cfg = task_file.configuration();

    println!("taskexec dry-run");
    println!("  program_name: {}", cfg.program_name());
    println!("  launch_path: {}", cfg.launch_path());
    if !cfg.arguments().is_empty() {
        println!("  arguments: {:?}", cfg.arguments());
    }
    if !cfg.environment().is_empty() {
        println!("  environment:");
        for (key, value) in cfg.environment() {
            println!("    {key}={value}");
        }
    }
    match cfg.acceptable_exit_codes() {
        Some(codes) => println!("  acceptable_exit_codes: {codes:?}"),
        None => println!("  acceptable_exit_codes: any"),
    }
    if let Some(dir) = cfg.working_directory() {
        println!("  working_directory: {}", dir.display());
    }
    println!("  grace_period: {:?}", cfg.grace_period());
    if let Some(timeout) = task_file.timeout() {
        println!("  timeout: {timeout:?}");
    }
    println!("  io: {:?}", cfg.io());

    debug!("dry-run complete (no execution)");
}

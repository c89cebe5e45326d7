// src/logger.rs

//! Diagnostic logger collaborator.
//!
//! A [`TaskLogger`] receives leveled text about a task (launch, exit,
//! forwarded output lines). It is purely observational: the executor calls it
//! through [`log_best_effort`], so a misbehaving logger can never change a
//! task's outcome.

use std::fmt::Debug;
use std::panic::{self, AssertUnwindSafe};

use tracing::Level;

/// Leveled sink for task diagnostics.
///
/// Implementations are shared between tasks and called from their monitor
/// activities, so they must tolerate concurrent calls.
pub trait TaskLogger: Send + Sync + Debug {
    fn log(&self, level: Level, message: &str);
}

/// Forwards task diagnostics to `tracing`, tagged with the program name.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    program: String,
}

impl TracingLogger {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl TaskLogger for TracingLogger {
    fn log(&self, level: Level, message: &str) {
        let program = self.program.as_str();
        match level {
            Level::ERROR => tracing::error!(program, "{message}"),
            Level::WARN => tracing::warn!(program, "{message}"),
            Level::INFO => tracing::info!(program, "{message}"),
            Level::DEBUG => tracing::debug!(program, "{message}"),
            Level::TRACE => tracing::trace!(program, "{message}"),
        }
    }
}

/// Call `logger` if present, swallowing any panic it raises.
pub(crate) fn log_best_effort(logger: Option<&dyn TaskLogger>, level: Level, message: &str) {
    let Some(logger) = logger else {
        return;
    };

    if panic::catch_unwind(AssertUnwindSafe(|| logger.log(level, message))).is_err() {
        tracing::warn!("task logger panicked; message dropped");
    }
}

// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`executor`] spawns the process for a `TaskConfiguration` and hands out
//!   a [`TaskHandle`].
//! - `monitor` watches one process, races natural exit against stop
//!   requests and publishes the single terminal outcome.
//! - [`handle`] is the shared, read-only view callers wait on.
//! - [`policy`] classifies an exit status against the acceptable exit codes.
//! - [`outcome`] holds the terminal result types.
//! - `signal` delivers termination and kill signals to the process tree.

pub mod executor;
pub mod handle;
mod monitor;
pub mod outcome;
pub mod policy;
mod signal;

pub use executor::TaskExecutor;
pub use handle::{Snapshot, TaskHandle};
pub use outcome::{Completion, FailureKind, Outcome, TaskFailure};
pub use policy::{Termination, Verdict, exit_status_policy};

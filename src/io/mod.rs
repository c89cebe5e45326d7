// src/io/mod.rs

//! Standard stream attachment for task processes.
//!
//! The executor never decides on its own how stdin/stdout/stderr are wired.
//! It asks an [`IoAttachment`] to:
//!
//! 1. [`attach`](IoAttachment::attach) stdio to the command before spawning,
//! 2. [`connect`](IoAttachment::connect) to the spawned child (take pipe ends,
//!    start pumps), producing [`AttachedStreams`],
//! 3. [`release`](IoAttachment::release) those streams exactly once when the
//!    task reaches a terminal state.
//!
//! [`ProcessIo`] is the production implementation; tests can swap in their
//! own attachment (for example one that counts `release` calls).

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::logger::TaskLogger;

pub mod process_io;

pub use process_io::{InputMode, OutputMode, ProcessIo};

/// How long `release` waits for output pumps to drain before aborting them.
///
/// Pumps normally finish at EOF right after the process exits; a stray
/// grandchild holding the pipe open must not stall the terminal transition.
pub const PUMP_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Which output stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// One line of task output forwarded to a caller-owned channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: StreamKind,
    pub line: String,
}

/// What a stream pump needs to know about the task it serves.
#[derive(Debug, Clone)]
pub struct StreamContext {
    pub program_name: String,
    pub logger: Option<Arc<dyn TaskLogger>>,
}

/// Resources held on behalf of a running task's streams.
#[derive(Debug, Default)]
pub struct AttachedStreams {
    pumps: Vec<JoinHandle<()>>,
}

impl AttachedStreams {
    /// Streams for a task that never got a process (launch failure).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push_pump(&mut self, pump: JoinHandle<()>) {
        self.pumps.push(pump);
    }

    pub fn pump_count(&self) -> usize {
        self.pumps.len()
    }

    pub fn into_pumps(self) -> Vec<JoinHandle<()>> {
        self.pumps
    }
}

/// Capability interface for wiring a task's standard streams.
pub trait IoAttachment: Send + Sync + Debug {
    /// Configure stdio on the command before it is spawned.
    fn attach(&self, cmd: &mut Command) -> std::io::Result<()>;

    /// Take whatever stream ends the child exposes and start consuming them.
    fn connect(&self, child: &mut Child, ctx: &StreamContext) -> AttachedStreams;

    /// Give back everything `connect` acquired. Called once per task.
    fn release(&self, streams: AttachedStreams) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;

    /// Whether the child reads our controlling terminal.
    ///
    /// Such a child must stay in our (foreground) process group: in a group
    /// of its own it would be stopped by SIGTTIN on its first read.
    fn shares_terminal(&self) -> bool {
        false
    }
}

/// Wait for pumps to reach EOF, aborting any that outlive `limit`.
pub async fn drain_pumps(streams: AttachedStreams, limit: Duration) {
    for mut pump in streams.into_pumps() {
        if tokio::time::timeout(limit, &mut pump).await.is_err() {
            debug!("output pump still running after drain timeout; aborting");
            pump.abort();
        }
    }
}

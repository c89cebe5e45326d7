// src/exec/signal.rs

//! Signal delivery to task process trees.
//!
//! On Unix a task normally runs in its own process group (pgid == pid), so
//! the termination and kill signals reach everything the task spawned. A
//! task that reads the controlling terminal stays in our group and only the
//! process itself is signalled. Other platforms have no graceful signal;
//! termination is a plain kill there.

use tokio::process::Child;
use tracing::debug;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{Signal, kill, killpg};
#[cfg(unix)]
use nix::unistd::Pid;

use crate::errors::{Result, TaskError};

/// Which processes a cancellation signal is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SignalScope {
    /// The child leads its own process group.
    Group,
    /// The child shares our process group (foreground terminal job).
    Process,
}

#[cfg(unix)]
fn signal_child(child: &Child, scope: SignalScope, signal: Signal) {
    // `id()` is None once the child has been reaped.
    let Some(pid) = child.id() else {
        return;
    };
    let pid = Pid::from_raw(pid as i32);

    let result = match scope {
        SignalScope::Group => killpg(pid, signal),
        SignalScope::Process => kill(pid, signal),
    };
    match result {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => debug!(%pid, ?signal, ?scope, error = %e, "failed to signal task"),
    }
}

/// First step of cancellation: ask the task to exit.
///
/// A stopped process (e.g. a background job that touched the terminal)
/// would keep SIGTERM pending forever, so it is continued as well.
pub(crate) fn request_termination(child: &mut Child, scope: SignalScope) {
    #[cfg(unix)]
    {
        signal_child(child, scope, Signal::SIGTERM);
        signal_child(child, scope, Signal::SIGCONT);
    }

    #[cfg(not(unix))]
    force_kill(child, scope);
}

/// Second step of cancellation: kill the task (and its group) outright.
pub(crate) fn force_kill(child: &mut Child, scope: SignalScope) {
    #[cfg(unix)]
    signal_child(child, scope, Signal::SIGKILL);
    #[cfg(not(unix))]
    let _ = scope;

    if let Err(e) = child.start_kill() {
        debug!(error = %e, "start_kill failed; process likely already exited");
    }
}

/// Deliver an arbitrary signal to the child itself.
///
/// Only called by the monitor while it still owns an unreaped child, so the
/// pid cannot have been recycled.
#[cfg(unix)]
pub(crate) fn send_to_child(child: &Child, program: &str, signal: i32) -> Result<()> {
    let signal = Signal::try_from(signal).map_err(|e| TaskError::Signal(e.to_string()))?;
    let Some(pid) = child.id() else {
        return Err(TaskError::NotRunning {
            program: program.to_string(),
        });
    };
    kill(Pid::from_raw(pid as i32), signal)
        .map_err(|e| TaskError::Signal(format!("{signal:?}: {e}")))
}

#[cfg(not(unix))]
pub(crate) fn send_to_child(_child: &Child, _program: &str, signal: i32) -> Result<()> {
    Err(TaskError::Signal(format!(
        "signal {signal} is not supported on this platform"
    )))
}

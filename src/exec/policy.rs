// src/exec/policy.rs

//! Exit status classification.

use std::collections::BTreeSet;
use std::process::ExitStatus;

use super::outcome::FailureKind;

/// How a process ended, as observed by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Normal exit with the given code.
    Exited(i32),
    /// Killed by the given signal number.
    Signaled(i32),
}

impl Termination {
    pub fn from_status(status: ExitStatus) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Termination::Signaled(signal);
            }
        }

        Termination::Exited(status.code().unwrap_or(-1))
    }

    pub fn code_or_signal(self) -> i32 {
        match self {
            Termination::Exited(code) => code,
            Termination::Signaled(signal) => signal,
        }
    }
}

/// Result of applying the exit status policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Completed,
    Failed(FailureKind),
}

/// Classify a termination against the acceptable exit codes.
///
/// - Signal deaths always fail, whatever the policy.
/// - With no policy (`None`), every normal exit completes.
/// - Otherwise the exit code must be in the set.
pub fn exit_status_policy(
    termination: Termination,
    acceptable_exit_codes: Option<&BTreeSet<i32>>,
) -> Verdict {
    match termination {
        Termination::Signaled(_) => Verdict::Failed(FailureKind::SignalTermination),
        Termination::Exited(code) => match acceptable_exit_codes {
            None => Verdict::Completed,
            Some(codes) if codes.contains(&code) => Verdict::Completed,
            Some(_) => Verdict::Failed(FailureKind::ExitCodePolicy),
        },
    }
}

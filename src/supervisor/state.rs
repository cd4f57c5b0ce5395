// src/supervisor/state.rs

use crate::launch::ProcessExit;

/// Observable lifecycle of the supervised process.
///
/// `Starting → Running → {StoppedClean, StoppedRequested, Crashed}`, plus
/// `Failed` when the OS reports an error for the process and `GaveUp` once
/// crash-loop protection has abandoned automatic recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Nothing has been started yet.
    Idle,
    Starting,
    Running { pid: Option<u32> },
    /// A stop request is in flight.
    Stopping,
    /// Exited with code 0 on its own.
    StoppedClean,
    /// Exited because the host asked it to.
    StoppedRequested,
    /// Exited unexpectedly; a restart may be pending.
    Crashed { code: Option<i32>, signal: Option<i32> },
    /// Spawn failed or the process reported an OS-level error.
    Failed,
    /// Too many crashes inside the restart window.
    GaveUp,
}

impl ProcessState {
    pub fn is_running(&self) -> bool {
        matches!(self, ProcessState::Running { .. } | ProcessState::Stopping)
    }

    pub(crate) fn crashed(exit: ProcessExit) -> Self {
        ProcessState::Crashed {
            code: exit.code,
            signal: exit.signal,
        }
    }
}

/// How an observed exit is treated by the liveness monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// The host requested the stop.
    Requested,
    /// Exit code exactly zero.
    Clean,
    /// Non-zero code or killed by a signal.
    Crashed,
}

/// Classify an exit. Only `Crashed` ever feeds the restart policy.
pub fn classify_exit(exit: &ProcessExit, expected: bool) -> ExitKind {
    if expected {
        ExitKind::Requested
    } else if exit.is_clean() {
        ExitKind::Clean
    } else {
        ExitKind::Crashed
    }
}

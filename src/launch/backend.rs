// src/launch/backend.rs

//! Pluggable process backend.
//!
//! The supervisor talks to a `ProcessBackend` instead of `tokio::process`
//! directly, so tests can swap in scripted fake processes while production
//! uses [`TokioBackend`].

use std::fmt::Debug;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};
use tracing::debug;

use crate::errors::{Result, SupervisorError};
use crate::launch::plan::LaunchPlan;

pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// How a process terminated: an exit code, a terminating signal, or both
/// absent if the platform reports neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl ProcessExit {
    pub fn code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    pub fn signal(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    /// Exit code exactly zero.
    pub fn is_clean(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for ProcessExit {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

/// A spawned child as seen by the supervisor.
pub trait ChildProcess: Send + 'static {
    /// OS process id, `None` once the process has been reaped.
    fn id(&self) -> Option<u32>;

    /// Wait for the process to exit. Must be cancel safe.
    fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<ProcessExit>> + Send + '_>>;

    /// Ask the process to exit (SIGTERM on unix).
    fn terminate(&mut self) -> io::Result<()>;

    /// Forcefully kill the process (SIGKILL on unix). Does not wait.
    fn kill(&mut self) -> io::Result<()>;
}

/// Result of a successful spawn: the child plus its piped standard streams.
pub struct SpawnedProcess {
    pub child: Box<dyn ChildProcess>,
    pub stdin: Option<BoxedWriter>,
    pub stdout: Option<BoxedReader>,
    pub stderr: Option<BoxedReader>,
}

impl Debug for SpawnedProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnedProcess")
            .field("pid", &self.child.id())
            .finish_non_exhaustive()
    }
}

/// Trait abstracting how processes are created.
pub trait ProcessBackend: Send + Sync + Debug + 'static {
    fn spawn(&self, plan: &LaunchPlan) -> Result<SpawnedProcess>;
}

/// Production backend built on `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct TokioBackend;

impl ProcessBackend for TokioBackend {
    fn spawn(&self, plan: &LaunchPlan) -> Result<SpawnedProcess> {
        let mut cmd = Command::new(&plan.program);
        cmd.args(&plan.args)
            .envs(&plan.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| SupervisorError::Spawn {
            program: plan.program.display().to_string(),
            source,
        })?;

        debug!(pid = ?child.id(), program = %plan.program.display(), "spawned child process");

        let stdin = child.stdin.take().map(|s| Box::new(s) as BoxedWriter);
        let stdout = child.stdout.take().map(|s| Box::new(s) as BoxedReader);
        let stderr = child.stderr.take().map(|s| Box::new(s) as BoxedReader);

        Ok(SpawnedProcess {
            child: Box::new(TokioChild { child }),
            stdin,
            stdout,
            stderr,
        })
    }
}

struct TokioChild {
    child: Child,
}

impl ChildProcess for TokioChild {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<ProcessExit>> + Send + '_>> {
        Box::pin(async move { self.child.wait().await.map(ProcessExit::from) })
    }

    #[cfg(unix)]
    fn terminate(&mut self) -> io::Result<()> {
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        // `id()` is None once reaped, so a recycled pid is never signalled.
        match self.child.id() {
            Some(pid) => signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM)
                .map_err(io::Error::from),
            None => Ok(()),
        }
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) -> io::Result<()> {
        self.child.start_kill()
    }

    fn kill(&mut self) -> io::Result<()> {
        self.child.start_kill()
    }
}

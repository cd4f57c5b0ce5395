// src/supervisor/monitor.rs

//! Per-process liveness monitor and shutdown escalation.
//!
//! Each spawned child is owned by exactly one monitor task. The task either
//! observes the exit on its own (and reports it to the runtime as a
//! [`ProcessEvent`]) or receives a stop request, in which case it runs the
//! terminate → grace period → kill sequence and hands the outcome back
//! through its `JoinHandle`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::host::LogSink;
use crate::launch::{ChildProcess, ProcessExit};

/// Final result of a monitored process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorOutcome {
    Exited(ProcessExit),
    /// Waiting on the process failed at the OS level.
    Failed(String),
}

/// Events flowing from monitors and timers into the supervisor runtime.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    /// A process exited without being asked to.
    Exited { generation: u64, exit: ProcessExit },
    /// Waiting on a process returned an error.
    Failed { generation: u64, error: String },
    /// The delay before an automatic restart elapsed.
    RestartDue { token: u64 },
}

/// Watch `child` until it exits or a stop is requested through `stop_rx`.
///
/// - Unsolicited exit: send `ProcessEvent::Exited`/`Failed` and return.
/// - Stop requested: terminate cooperatively, escalate to kill after
///   `grace`, and return once the process is gone. No event is sent; the
///   caller awaits the returned outcome instead.
/// - `stop_rx` dropped without a request: the supervisor is gone, so the
///   process is killed outright.
pub async fn monitor_process(
    mut child: Box<dyn ChildProcess>,
    generation: u64,
    mut stop_rx: oneshot::Receiver<()>,
    events_tx: mpsc::UnboundedSender<ProcessEvent>,
    grace: Duration,
    sink: Arc<dyn LogSink>,
) -> MonitorOutcome {
    let pid = child.id();

    tokio::select! {
        biased;

        res = child.wait() => {
            let outcome = outcome_from(res);
            let event = match outcome {
                MonitorOutcome::Exited(exit) => ProcessEvent::Exited { generation, exit },
                MonitorOutcome::Failed(ref error) => ProcessEvent::Failed {
                    generation,
                    error: error.clone(),
                },
            };
            if events_tx.send(event).is_err() {
                debug!(generation, "supervisor runtime gone; dropping exit event");
            }
            outcome
        }

        req = &mut stop_rx => {
            match req {
                Ok(()) => shutdown_child(child.as_mut(), pid, grace, sink.as_ref()).await,
                Err(_) => {
                    debug!(?pid, "supervisor dropped; killing orphaned child");
                    if let Err(e) = child.kill() {
                        warn!(?pid, error = %e, "failed to kill orphaned child");
                    }
                    outcome_from(child.wait().await)
                }
            }
        }
    }
}

/// Cooperative terminate, then forced kill if the process outlives `grace`.
///
/// The grace timer loses the race against a normal exit and is dropped with
/// it, so no signal is ever sent after the child has been reaped.
async fn shutdown_child(
    child: &mut dyn ChildProcess,
    pid: Option<u32>,
    grace: Duration,
    sink: &dyn LogSink,
) -> MonitorOutcome {
    if let Err(e) = child.terminate() {
        warn!(?pid, error = %e, "failed to send terminate signal");
    }

    tokio::select! {
        res = child.wait() => outcome_from(res),
        _ = tokio::time::sleep(grace) => {
            info!(?pid, grace_ms = grace.as_millis() as u64, "process ignored terminate; force killing");
            sink.append_line("Force killing MCP server...");
            if let Err(e) = child.kill() {
                warn!(?pid, error = %e, "failed to force kill process");
            }
            outcome_from(child.wait().await)
        }
    }
}

fn outcome_from(res: std::io::Result<ProcessExit>) -> MonitorOutcome {
    match res {
        Ok(exit) => MonitorOutcome::Exited(exit),
        Err(e) => MonitorOutcome::Failed(e.to_string()),
    }
}

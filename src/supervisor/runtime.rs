// src/supervisor/runtime.rs

//! The supervisor's single owning task.
//!
//! Host commands and process events are handled one at a time by this task,
//! which is the only code that touches the child handle and the restart
//! accounting. A stop is awaited inline, so commands that arrive meanwhile
//! queue up behind it.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::ConfigSource;
use crate::host::{LogSink, Notification, Notifier};
use crate::launch::{
    BoxedWriter, LaunchBlocked, LaunchPlan, ProcessBackend, ProcessExit, SpawnedProcess,
    StreamKind, spawn_line_forwarder,
};
use crate::supervisor::SupervisorOptions;
use crate::supervisor::monitor::{MonitorOutcome, ProcessEvent, monitor_process};
use crate::supervisor::policy::{RestartDecision, RestartPolicy};
use crate::supervisor::state::{ProcessState, classify_exit};

/// Requests from the host-facing [`Supervisor`](crate::supervisor::Supervisor).
#[derive(Debug)]
pub enum Command {
    Start { reply: oneshot::Sender<bool> },
    Stop { reply: oneshot::Sender<()> },
    Restart { reply: oneshot::Sender<bool> },
    Dispose,
}

/// Who asked for a start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartTrigger {
    Manual,
    Automatic,
}

/// The live child owned by the runtime.
struct ProcessHandle {
    generation: u64,
    pid: Option<u32>,
    stop_tx: Option<oneshot::Sender<()>>,
    monitor: JoinHandle<MonitorOutcome>,
    // Held so the child's stdin stays open for the protocol layer.
    _stdin: Option<BoxedWriter>,
}

struct PendingRestart {
    token: u64,
    timer: JoinHandle<()>,
}

pub struct SupervisorRuntime {
    config: Arc<dyn ConfigSource>,
    backend: Arc<dyn ProcessBackend>,
    sink: Arc<dyn LogSink>,
    notifier: Arc<dyn Notifier>,
    options: SupervisorOptions,
    policy: RestartPolicy,

    handle: Option<ProcessHandle>,
    next_generation: u64,
    pending_restart: Option<PendingRestart>,
    next_restart_token: u64,

    commands_rx: mpsc::Receiver<Command>,
    events_tx: mpsc::UnboundedSender<ProcessEvent>,
    events_rx: mpsc::UnboundedReceiver<ProcessEvent>,
    state_tx: watch::Sender<ProcessState>,
}

impl SupervisorRuntime {
    pub fn new(
        config: Arc<dyn ConfigSource>,
        backend: Arc<dyn ProcessBackend>,
        sink: Arc<dyn LogSink>,
        notifier: Arc<dyn Notifier>,
        options: SupervisorOptions,
        commands_rx: mpsc::Receiver<Command>,
        state_tx: watch::Sender<ProcessState>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            config,
            backend,
            sink,
            notifier,
            policy: RestartPolicy::new(&options),
            options,
            handle: None,
            next_generation: 0,
            pending_restart: None,
            next_restart_token: 0,
            commands_rx,
            events_tx,
            events_rx,
            state_tx,
        }
    }

    /// Main loop. Process events are drained before host commands so a
    /// command never acts on a child that has already exited.
    pub async fn run(mut self) {
        debug!("supervisor runtime started");

        loop {
            tokio::select! {
                biased;

                Some(event) = self.events_rx.recv() => {
                    self.handle_event(event);
                }

                cmd = self.commands_rx.recv() => {
                    match cmd {
                        Some(Command::Dispose) => {
                            info!("supervisor disposed");
                            self.shutdown().await;
                            self.sink.close();
                            break;
                        }
                        Some(cmd) => self.handle_command(cmd).await,
                        None => {
                            debug!("supervisor handle dropped; shutting down");
                            self.shutdown().await;
                            break;
                        }
                    }
                }
            }
        }

        debug!("supervisor runtime exiting");
    }

    async fn handle_command(&mut self, cmd: Command) {
        // A manual request always supersedes a scheduled automatic restart.
        self.cancel_pending_restart();

        match cmd {
            Command::Start { reply } => {
                let ok = self.start(StartTrigger::Manual);
                let _ = reply.send(ok);
            }
            Command::Stop { reply } => {
                self.stop().await;
                let _ = reply.send(());
            }
            Command::Restart { reply } => {
                self.stop().await;
                let ok = self.start(StartTrigger::Manual);
                let _ = reply.send(ok);
            }
            Command::Dispose => debug!("dispose is handled by the run loop"),
        }
    }

    fn handle_event(&mut self, event: ProcessEvent) {
        match event {
            ProcessEvent::Exited { generation, exit } => self.on_exit(generation, exit),
            ProcessEvent::Failed { generation, error } => self.on_process_error(generation, error),
            ProcessEvent::RestartDue { token } => {
                match self.pending_restart.take() {
                    Some(pending) if pending.token == token => {
                        self.start(StartTrigger::Automatic);
                    }
                    other => {
                        debug!(token, "ignoring superseded restart timer");
                        self.pending_restart = other;
                    }
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Launch control
    // ---------------------------------------------------------------------

    fn start(&mut self, trigger: StartTrigger) -> bool {
        if self.handle.is_some() {
            self.sink.append_line("MCP server is already running");
            return true;
        }

        let snapshot = match self.config.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "failed to read configuration");
                self.sink
                    .append_line(&format!("Failed to read MCP server configuration: {e}"));
                self.notifier.notify(Notification::InvalidConfig {
                    error: e.to_string(),
                });
                return false;
            }
        };

        let plan = match LaunchPlan::from_snapshot(&snapshot) {
            Ok(plan) => plan,
            Err(blocked) => {
                self.report_blocked(&blocked);
                return false;
            }
        };

        if snapshot.workspace_root.is_none() {
            self.notifier.notify(Notification::NoWorkspace);
        }

        self.sink
            .append_line(&format!("Starting MCP server: {}", plan.program.display()));
        self.sink
            .append_line(&format!("Arguments: {}", plan.args.join(" ")));
        self.publish(ProcessState::Starting);

        match self.backend.spawn(&plan) {
            Ok(spawned) => {
                let pid = self.attach(spawned);
                if trigger == StartTrigger::Manual {
                    self.policy.reset();
                }
                info!(?pid, command = %plan, ?trigger, "MCP server started");
                self.sink.append_line("MCP server started successfully");
                self.publish(ProcessState::Running { pid });
                true
            }
            Err(e) => {
                error!(error = %e, program = %plan.program.display(), "failed to spawn MCP server");
                self.sink
                    .append_line(&format!("Failed to start MCP server: {e}"));
                self.notifier.notify(Notification::SpawnFailed {
                    error: e.to_string(),
                });
                self.publish(ProcessState::Failed);
                false
            }
        }
    }

    fn report_blocked(&self, blocked: &LaunchBlocked) {
        match blocked {
            LaunchBlocked::Disabled => info!("MCP server is disabled; not starting"),
            other => warn!(reason = %other, "MCP server cannot be started"),
        }
        self.sink.append_line(&blocked.to_string());
        if let Some(notification) = blocked.notification() {
            self.notifier.notify(notification);
        }
    }

    /// Take ownership of a fresh child: forward its output and start its
    /// monitor.
    fn attach(&mut self, spawned: SpawnedProcess) -> Option<u32> {
        let SpawnedProcess {
            child,
            stdin,
            stdout,
            stderr,
        } = spawned;

        self.next_generation += 1;
        let generation = self.next_generation;
        let pid = child.id();

        if let Some(stdout) = stdout {
            spawn_line_forwarder(stdout, StreamKind::Stdout, Arc::clone(&self.sink));
        }
        if let Some(stderr) = stderr {
            spawn_line_forwarder(stderr, StreamKind::Stderr, Arc::clone(&self.sink));
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let monitor = tokio::spawn(monitor_process(
            child,
            generation,
            stop_rx,
            self.events_tx.clone(),
            self.options.shutdown_grace,
            Arc::clone(&self.sink),
        ));

        self.handle = Some(ProcessHandle {
            generation,
            pid,
            stop_tx: Some(stop_tx),
            monitor,
            _stdin: stdin,
        });

        pid
    }

    // ---------------------------------------------------------------------
    // Liveness monitor
    // ---------------------------------------------------------------------

    fn take_current(&mut self, generation: u64) -> Option<ProcessHandle> {
        match self.handle {
            Some(ref h) if h.generation == generation => self.handle.take(),
            _ => {
                debug!(generation, "ignoring event for a process that is no longer current");
                None
            }
        }
    }

    fn on_exit(&mut self, generation: u64, exit: ProcessExit) {
        let Some(handle) = self.take_current(generation) else {
            return;
        };

        self.sink.append_line(&format!(
            "MCP server exited with code {}, signal {}",
            fmt_opt(exit.code),
            fmt_opt(exit.signal)
        ));

        // Requested stops are awaited in `stop` and never arrive here.
        if exit.is_clean() {
            info!(pid = ?handle.pid, "MCP server exited cleanly");
            self.publish(ProcessState::StoppedClean);
        } else {
            warn!(
                pid = ?handle.pid,
                exit_code = ?exit.code,
                signal = ?exit.signal,
                "MCP server exited unexpectedly"
            );
            self.publish(ProcessState::crashed(exit));
            self.on_crash();
        }
    }

    fn on_process_error(&mut self, generation: u64, error: String) {
        let Some(handle) = self.take_current(generation) else {
            return;
        };

        error!(pid = ?handle.pid, error = %error, "MCP server process error");
        self.sink.append_line(&format!("MCP server error: {error}"));
        self.notifier.notify(Notification::ProcessError { error });
        self.publish(ProcessState::Failed);
    }

    // ---------------------------------------------------------------------
    // Restart policy
    // ---------------------------------------------------------------------

    fn on_crash(&mut self) {
        match self.policy.on_crash(Instant::now()) {
            RestartDecision::Restart { attempt, delay } => {
                let max_restarts = self.policy.max_restarts();
                info!(attempt, max_restarts, delay_ms = delay.as_millis() as u64, "scheduling restart");
                self.sink.append_line(&format!(
                    "Restarting MCP server (attempt {attempt}/{max_restarts})..."
                ));
                self.notifier.notify(Notification::Restarting {
                    attempt,
                    max_restarts,
                });
                self.schedule_restart(delay);
            }
            RestartDecision::GiveUp { max_restarts } => {
                error!(max_restarts, "MCP server is crash looping; giving up");
                self.sink.append_line(&format!(
                    "MCP server has crashed {max_restarts} times within the restart window. \
                     Not restarting; restart it manually."
                ));
                self.notifier.notify(Notification::CrashLoop { max_restarts });
                self.publish(ProcessState::GaveUp);
            }
        }
    }

    fn schedule_restart(&mut self, delay: std::time::Duration) {
        self.next_restart_token += 1;
        let token = self.next_restart_token;
        let tx = self.events_tx.clone();

        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(ProcessEvent::RestartDue { token });
        });

        self.pending_restart = Some(PendingRestart { token, timer });
    }

    fn cancel_pending_restart(&mut self) {
        if let Some(pending) = self.pending_restart.take() {
            debug!(token = pending.token, "cancelling scheduled restart");
            pending.timer.abort();
        }
    }

    // ---------------------------------------------------------------------
    // Shutdown control
    // ---------------------------------------------------------------------

    async fn stop(&mut self) {
        let Some(mut handle) = self.handle.take() else {
            return;
        };

        self.sink.append_line("Stopping MCP server...");
        self.publish(ProcessState::Stopping);

        // The monitor may have finished on its own a moment ago; in that case
        // the send fails and its queued exit event is ignored as stale.
        if let Some(stop_tx) = handle.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        match (&mut handle.monitor).await {
            Ok(MonitorOutcome::Exited(exit)) => {
                info!(
                    pid = ?handle.pid,
                    kind = ?classify_exit(&exit, true),
                    exit_code = ?exit.code,
                    signal = ?exit.signal,
                    "MCP server stopped"
                );
            }
            Ok(MonitorOutcome::Failed(error)) => {
                warn!(pid = ?handle.pid, error = %error, "error while waiting for MCP server to stop");
            }
            Err(e) => {
                error!(pid = ?handle.pid, error = %e, "process monitor task failed");
            }
        }

        self.sink.append_line("MCP server stopped");
        self.publish(ProcessState::StoppedRequested);
    }

    async fn shutdown(&mut self) {
        self.cancel_pending_restart();
        self.stop().await;
    }

    fn publish(&self, state: ProcessState) {
        self.state_tx.send_replace(state);
    }
}

fn fmt_opt(value: Option<i32>) -> String {
    value.map_or_else(|| "none".to_string(), |v| v.to_string())
}

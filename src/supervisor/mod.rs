// src/supervisor/mod.rs

//! Child-process supervisor.
//!
//! A [`Supervisor`] is a cheap handle onto a background runtime task that
//! owns the child process. The host drives it with `start`, `stop`,
//! `restart` and `dispose`; every call is queued and handled in order, so
//! two children never coexist under one supervisor.
//!
//! - [`runtime`] owns the state and serialises commands and process events.
//! - [`monitor`] watches one child and runs the terminate → kill escalation.
//! - [`policy`] is the pure crash-loop accounting.
//! - [`state`] holds the observable lifecycle and exit classification.

pub mod monitor;
pub mod policy;
pub mod runtime;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::warn;

use crate::config::ConfigSource;
use crate::host::{LogSink, Notifier, TracingLogSink, TracingNotifier};
use crate::launch::{ProcessBackend, TokioBackend};

pub use policy::{RestartDecision, RestartPolicy};
pub use runtime::{Command, SupervisorRuntime};
pub use state::{ExitKind, ProcessState, classify_exit};

/// Restart and shutdown timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorOptions {
    /// Automatic restarts allowed inside one `restart_window`.
    pub max_restarts: u32,
    /// History older than this no longer counts against `max_restarts`.
    pub restart_window: Duration,
    /// Pause between a crash and the automatic restart.
    pub restart_delay: Duration,
    /// How long a stopping process may take before it is killed.
    pub shutdown_grace: Duration,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            max_restarts: 5,
            restart_window: Duration::from_secs(60),
            restart_delay: Duration::from_secs(1),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// Builder wiring a supervisor to its collaborators. Everything except the
/// config source has a production default.
pub struct SupervisorBuilder {
    config: Arc<dyn ConfigSource>,
    backend: Arc<dyn ProcessBackend>,
    sink: Arc<dyn LogSink>,
    notifier: Arc<dyn Notifier>,
    options: SupervisorOptions,
}

impl SupervisorBuilder {
    pub fn new(config: Arc<dyn ConfigSource>) -> Self {
        Self {
            config,
            backend: Arc::new(TokioBackend),
            sink: Arc::new(TracingLogSink),
            notifier: Arc::new(TracingNotifier),
            options: SupervisorOptions::default(),
        }
    }

    pub fn backend(mut self, backend: Arc<dyn ProcessBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn options(mut self, options: SupervisorOptions) -> Self {
        self.options = options;
        self
    }

    /// Spawn the runtime task. Must be called from within a Tokio runtime.
    pub fn build(self) -> Supervisor {
        let (commands_tx, commands_rx) = mpsc::channel(32);
        let (state_tx, state_rx) = watch::channel(ProcessState::Idle);

        let runtime = SupervisorRuntime::new(
            self.config,
            self.backend,
            self.sink,
            self.notifier,
            self.options,
            commands_rx,
            state_tx,
        );
        tokio::spawn(runtime.run());

        Supervisor {
            commands: commands_tx,
            state_rx,
        }
    }
}

/// Host-facing handle. Dropping it stops the child and ends the runtime.
#[derive(Debug)]
pub struct Supervisor {
    commands: mpsc::Sender<Command>,
    state_rx: watch::Receiver<ProcessState>,
}

impl Supervisor {
    pub fn builder(config: Arc<dyn ConfigSource>) -> SupervisorBuilder {
        SupervisorBuilder::new(config)
    }

    /// Start the child if it is not running. Returns `true` if a child is
    /// running afterwards.
    pub async fn start(&self) -> bool {
        let (reply, rx) = oneshot::channel();
        self.request(Command::Start { reply }, rx).await.unwrap_or(false)
    }

    /// Stop the child; resolves once it has fully exited.
    pub async fn stop(&self) {
        let (reply, rx) = oneshot::channel();
        self.request(Command::Stop { reply }, rx).await;
    }

    /// `stop` followed by `start`, returning the result of the start.
    pub async fn restart(&self) -> bool {
        let (reply, rx) = oneshot::channel();
        self.request(Command::Restart { reply }, rx)
            .await
            .unwrap_or(false)
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    pub fn state(&self) -> ProcessState {
        *self.state_rx.borrow()
    }

    /// Receiver notified on every lifecycle transition.
    pub fn subscribe(&self) -> watch::Receiver<ProcessState> {
        self.state_rx.clone()
    }

    /// Stop the child without waiting and release the log sink.
    pub fn dispose(self) {
        match self.commands.try_send(Command::Dispose) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(cmd)) => {
                let commands = self.commands.clone();
                tokio::spawn(async move {
                    let _ = commands.send(cmd).await;
                });
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("supervisor runtime already gone at dispose");
            }
        }
    }

    async fn request<T>(&self, cmd: Command, rx: oneshot::Receiver<T>) -> Option<T> {
        if self.commands.send(cmd).await.is_err() {
            warn!("supervisor runtime is not running");
            return None;
        }
        rx.await.ok()
    }
}

// src/host/notify.rs

use std::fmt;
use std::fmt::Debug;

use tracing::{error, info, warn};

use crate::platform::PlatformDescriptor;

/// Severity the host should render a notification with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// Events the supervisor surfaces to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// No executable could be resolved for this platform.
    MissingBinary { platform: PlatformDescriptor },
    /// A required companion binary could not be resolved.
    MissingCompanion { name: String },
    /// No workspace root is configured; the server still starts.
    NoWorkspace,
    /// The configuration could not be read at start time.
    InvalidConfig { error: String },
    /// The OS refused to create the process.
    SpawnFailed { error: String },
    /// Waiting on a running process failed.
    ProcessError { error: String },
    /// An automatic restart has been scheduled.
    Restarting { attempt: u32, max_restarts: u32 },
    /// Automatic recovery was abandoned after repeated crashes.
    CrashLoop { max_restarts: u32 },
}

impl Notification {
    pub fn level(&self) -> NotificationLevel {
        match self {
            Notification::NoWorkspace => NotificationLevel::Warning,
            Notification::Restarting { .. } => NotificationLevel::Info,
            _ => NotificationLevel::Error,
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::MissingBinary { platform } => write!(
                f,
                "MCP server binary not found for platform: {platform}. \
                 Set [server].path or ensure the binary is bundled."
            ),
            Notification::MissingCompanion { name } => {
                write!(f, "{name} binary not found. The MCP server requires it.")
            }
            Notification::NoWorkspace => write!(
                f,
                "No workspace root configured. MCP server will have limited functionality."
            ),
            Notification::InvalidConfig { error } => {
                write!(f, "MCP server configuration is invalid: {error}")
            }
            Notification::SpawnFailed { error } => {
                write!(f, "Failed to start MCP server: {error}")
            }
            Notification::ProcessError { error } => write!(f, "MCP server error: {error}"),
            Notification::Restarting {
                attempt,
                max_restarts,
            } => write!(f, "Restarting MCP server (attempt {attempt}/{max_restarts})"),
            Notification::CrashLoop { max_restarts } => write!(
                f,
                "MCP server crashed {max_restarts} times within the restart window. \
                 Not restarting automatically; restart it manually."
            ),
        }
    }
}

/// User-facing notification channel owned by the host.
pub trait Notifier: Send + Sync + Debug {
    fn notify(&self, notification: Notification);
}

/// Renders notifications as log events.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level() {
            NotificationLevel::Info => info!(target: "mcpvisor::notify", "{notification}"),
            NotificationLevel::Warning => warn!(target: "mcpvisor::notify", "{notification}"),
            NotificationLevel::Error => error!(target: "mcpvisor::notify", "{notification}"),
        }
    }
}

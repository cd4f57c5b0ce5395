// src/host/event.rs

/// Inputs to the host loop in [`crate::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    /// The config file changed on disk.
    ConfigChanged,
    /// The user asked for a restart (SIGHUP on unix).
    RestartRequested,
    /// Ctrl-C: stop the server and exit.
    ShutdownRequested,
}

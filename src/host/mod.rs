// src/host/mod.rs

//! Seams towards the host application.
//!
//! - [`sink`] receives line-oriented text: supervisor messages plus the
//!   child's stdout/stderr.
//! - [`notify`] receives user-facing events the host may surface.
//! - [`event`] is what drives the host loop itself.

pub mod event;
pub mod notify;
pub mod sink;

pub use event::HostEvent;
pub use notify::{Notification, NotificationLevel, Notifier, TracingNotifier};
pub use sink::{FileLogSink, LogSink, TracingLogSink};

// src/watch/mod.rs

//! Config file watching and reload decisions.
//!
//! - [`watcher`] wires `notify` to the config file and emits
//!   [`HostEvent::ConfigChanged`](crate::host::HostEvent::ConfigChanged).
//! - [`reload`] decides what a changed snapshot means for a running server.
//!
//! Neither module touches the supervisor directly; the host loop does that.

pub mod reload;
pub mod watcher;

pub use reload::{ReloadAction, plan_reload};
pub use watcher::{WatcherHandle, spawn_config_watcher};

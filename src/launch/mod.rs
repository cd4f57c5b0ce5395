// src/launch/mod.rs

//! Launch control.
//!
//! - [`plan`] builds the command line and environment overlay from a
//!   configuration snapshot.
//! - [`backend`] provides the `ProcessBackend` trait and the production
//!   `TokioBackend`; tests replace it with a fake implementation.
//! - [`output`] wires the child's stdout/stderr into the log sink.

pub mod backend;
pub mod output;
pub mod plan;

pub use backend::{
    BoxedReader, BoxedWriter, ChildProcess, ProcessBackend, ProcessExit, SpawnedProcess,
    TokioBackend,
};
pub use output::{StreamKind, spawn_line_forwarder};
pub use plan::{AUDIT_LOG_ENV, LOG_LEVEL_ENV, LaunchBlocked, LaunchPlan, environment_overlay};

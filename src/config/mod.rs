// src/config/mod.rs

//! Configuration loading, validation and snapshotting.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`, `rate_limits.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate basic invariants (`validate.rs`).
//! - Resolve a per-start [`ConfigSnapshot`] through a [`ConfigSource`].

pub mod duration;
pub mod loader;
pub mod model;
pub mod rate_limits;
pub mod snapshot;
pub mod source;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    AuditLogSection, CompanionSection, ConfigFile, RawConfigFile, RawSupervisorSection,
    ServerSection, WorkspaceSection,
};
pub use rate_limits::{RateLimitOperation, RateLimits};
pub use snapshot::{CompanionPath, ConfigSnapshot};
pub use source::{ConfigSource, FileConfigSource, StaticConfigSource};
pub use validate::validate_config;

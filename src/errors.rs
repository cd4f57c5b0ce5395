// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Only setup paths (loading config, opening sinks, spawning, watching)
//! return these. The supervisor's host operations turn failures into
//! notifications instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("invalid configuration: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("could not parse TOML: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SupervisorError>;

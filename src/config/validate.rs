// src/config/validate.rs

use crate::config::model::RawConfigFile;
use crate::errors::{Result, SupervisorError};

/// Run semantic validation against a freshly parsed configuration.
///
/// This checks:
/// - every rate limit is positive
/// - `server.binary_name` is not blank
/// - `[companion].flag` is not blank when a companion is configured
/// - `[supervisor].max_restarts >= 1` when given
///
/// Duration strings are checked while converting into `ConfigFile`.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_rate_limits(cfg)?;
    validate_server(cfg)?;
    validate_supervisor(cfg)?;
    Ok(())
}

fn validate_rate_limits(cfg: &RawConfigFile) -> Result<()> {
    for (op, limit) in cfg.rate_limits.iter() {
        if limit == 0 {
            return Err(SupervisorError::ConfigError(format!(
                "[rate_limits].{op} must be >= 1 (got 0)"
            )));
        }
    }
    Ok(())
}

fn validate_server(cfg: &RawConfigFile) -> Result<()> {
    if cfg.server.binary_name.trim().is_empty() {
        return Err(SupervisorError::ConfigError(
            "[server].binary_name must not be empty".to_string(),
        ));
    }

    if let Some(ref companion) = cfg.companion {
        if companion.flag.trim().is_empty() {
            return Err(SupervisorError::ConfigError(format!(
                "[companion].flag must not be empty for '{}'",
                companion.name
            )));
        }
    }

    Ok(())
}

fn validate_supervisor(cfg: &RawConfigFile) -> Result<()> {
    if cfg.supervisor.max_restarts == Some(0) {
        return Err(SupervisorError::ConfigError(
            "[supervisor].max_restarts must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

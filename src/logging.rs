// src/logging.rs

//! Logging setup for `mcpvisor` using `tracing` + `tracing-subscriber`.
//!
//! Filter selection:
//! 1. `--log-level` CLI flag (if provided), applied to every target
//! 2. `MCPVISOR_LOG` environment variable, parsed as `EnvFilter` directives
//!    (e.g. "debug" or "mcpvisor=debug,mcpvisor::child=warn")
//! 3. default to `info`
//!
//! Logs go to STDERR so stdout stays free for `--dry-run` output. Child
//! output forwarded by `TracingLogSink` uses the `mcpvisor::child` target and
//! can be filtered on its own.

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

/// Environment variable holding filter directives.
pub const LOG_ENV: &str = "MCPVISOR_LOG";

/// Initialise global logging subscriber.
///
/// Fails if a subscriber is already installed or `MCPVISOR_LOG` does not
/// parse.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let filter = build_filter(cli_level, env.as_deref())?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!(e))?;

    Ok(())
}

fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> Result<EnvFilter> {
    if let Some(lvl) = cli_level {
        return Ok(EnvFilter::new(directive(lvl)));
    }

    match env.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|e| anyhow!("invalid {LOG_ENV} value {directives:?}: {e}")),
        None => Ok(EnvFilter::new("info")),
    }
}

fn directive(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flag_overrides_environment() {
        let filter = build_filter(Some(LogLevel::Warn), Some("trace")).unwrap();
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn environment_directives_are_used_verbatim() {
        let filter = build_filter(None, Some("mcpvisor=debug")).unwrap();
        assert_eq!(filter.to_string(), "mcpvisor=debug");
    }

    #[test]
    fn blank_environment_falls_back_to_info() {
        let filter = build_filter(None, Some("  ")).unwrap();
        assert_eq!(filter.to_string(), "info");
        assert!(build_filter(None, Some("mcpvisor=loud")).is_err());
    }
}

// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `mcpvisor`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mcpvisor",
    version,
    about = "Run and supervise an MCP server process, restarting it when it crashes.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Mcpvisor.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Mcpvisor.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MCPVISOR_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Append server output to this file instead of the log stream.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<String>,

    /// Resolve the configuration and print the launch command, but don't
    /// start anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Don't watch the config file for changes.
    #[arg(long)]
    pub no_watch: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

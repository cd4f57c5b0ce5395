// tests/cli_run.rs

use std::error::Error;
use std::fs;

use clap::Parser;
use tempfile::TempDir;

use mcpvisor::cli::{CliArgs, LogLevel};
use mcpvisor::run;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn cli_defaults() {
    let args = CliArgs::try_parse_from(["mcpvisor"]).unwrap();
    assert_eq!(args.config, "Mcpvisor.toml");
    assert!(args.log_level.is_none());
    assert!(args.log_file.is_none());
    assert!(!args.dry_run);
    assert!(!args.no_watch);
}

#[test]
fn cli_flags_are_parsed() {
    let args = CliArgs::try_parse_from([
        "mcpvisor",
        "--config",
        "cfg/server.toml",
        "--log-level",
        "debug",
        "--log-file",
        "/tmp/mcp.log",
        "--dry-run",
        "--no-watch",
    ])
    .unwrap();

    assert_eq!(args.config, "cfg/server.toml");
    assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    assert_eq!(args.log_file.as_deref(), Some("/tmp/mcp.log"));
    assert!(args.dry_run);
    assert!(args.no_watch);
}

#[tokio::test]
async fn dry_run_resolves_without_spawning() -> TestResult {
    let dir = TempDir::new()?;
    let config_path = dir.path().join("Mcpvisor.toml");
    fs::write(
        &config_path,
        "[server]\nenable = true\npath = \"/definitely/not/here\"\n\n[rate_limits]\nhover = 42\n",
    )?;

    let args = CliArgs::try_parse_from([
        "mcpvisor",
        "--config",
        config_path.to_str().unwrap(),
        "--dry-run",
    ])?;

    run(args).await?;
    Ok(())
}

#[tokio::test]
async fn invalid_config_fails_fast() -> TestResult {
    let dir = TempDir::new()?;
    let config_path = dir.path().join("Mcpvisor.toml");
    fs::write(&config_path, "[rate_limits]\nhover = 0\n")?;

    let args = CliArgs::try_parse_from([
        "mcpvisor",
        "--config",
        config_path.to_str().unwrap(),
        "--dry-run",
    ])?;

    assert!(run(args).await.is_err());
    Ok(())
}

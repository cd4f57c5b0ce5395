// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod host;
pub mod launch;
pub mod logging;
pub mod platform;
pub mod supervisor;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigSnapshot, ConfigSource, FileConfigSource, load_and_validate};
use crate::host::{FileLogSink, HostEvent, LogSink, TracingLogSink};
use crate::launch::{LaunchBlocked, LaunchPlan, environment_overlay};
use crate::supervisor::Supervisor;
use crate::watch::{ReloadAction, plan_reload};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the supervisor and its log sink
/// - (optional) config file watcher
/// - Ctrl-C and SIGHUP handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let source = FileConfigSource::new(&config_path);

    if args.dry_run {
        print_dry_run(&source.snapshot()?);
        return Ok(());
    }

    let sink: Arc<dyn LogSink> = match args.log_file {
        Some(ref path) => Arc::new(FileLogSink::open(path)?),
        None => Arc::new(TracingLogSink),
    };

    let supervisor = Supervisor::builder(Arc::new(source.clone()))
        .sink(sink)
        .options(cfg.supervisor)
        .build();

    // Host event channel.
    let (host_tx, mut host_rx) = mpsc::channel::<HostEvent>(16);

    let _watcher_handle = if !args.no_watch {
        Some(crate::watch::spawn_config_watcher(
            &config_path,
            host_tx.clone(),
        )?)
    } else {
        None
    };

    // Ctrl-C → graceful shutdown.
    {
        let tx = host_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(HostEvent::ShutdownRequested).await;
        });
    }

    #[cfg(unix)]
    spawn_sighup_listener(host_tx.clone())?;

    let mut current = source.snapshot()?;
    if current.enabled {
        if !supervisor.start().await {
            warn!("MCP server did not start; waiting for a config change or restart request");
        }
    } else {
        info!("MCP server is disabled in {:?}", config_path);
    }

    while let Some(event) = host_rx.recv().await {
        debug!(?event, "host event");
        match event {
            HostEvent::ConfigChanged => {
                let next = match source.snapshot() {
                    Ok(next) => next,
                    Err(e) => {
                        warn!(error = %e, "ignoring invalid config change");
                        continue;
                    }
                };
                apply_reload(&supervisor, &current, &next).await;
                current = next;
            }
            HostEvent::RestartRequested => {
                info!("restart requested");
                supervisor.restart().await;
            }
            HostEvent::ShutdownRequested => {
                info!("shutdown requested");
                break;
            }
        }
    }

    supervisor.stop().await;

    // The state channel closes once the runtime has released the sink.
    let mut state_rx = supervisor.subscribe();
    supervisor.dispose();
    while state_rx.changed().await.is_ok() {}

    Ok(())
}

async fn apply_reload(supervisor: &Supervisor, prev: &ConfigSnapshot, next: &ConfigSnapshot) {
    match plan_reload(prev, next, supervisor.is_running()) {
        ReloadAction::Nothing => debug!("config change needs no action"),
        ReloadAction::Start => {
            info!("MCP server enabled; starting");
            supervisor.start().await;
        }
        ReloadAction::Stop => {
            info!("MCP server disabled; stopping");
            supervisor.stop().await;
        }
        ReloadAction::Restart => {
            info!("MCP server settings changed; restarting");
            supervisor.restart().await;
        }
    }
}

#[cfg(unix)]
fn spawn_sighup_listener(tx: mpsc::Sender<HostEvent>) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup())?;
    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            if tx.send(HostEvent::RestartRequested).await.is_err() {
                break;
            }
        }
    });
    Ok(())
}

/// Simple dry-run output: print the resolved command and environment.
fn print_dry_run(snapshot: &ConfigSnapshot) {
    println!("mcpvisor dry-run");
    println!("  platform = {}", snapshot.platform);
    println!("  enabled = {}", snapshot.enabled);
    println!();

    match LaunchPlan::from_snapshot(snapshot) {
        Ok(plan) => {
            println!("command:");
            println!("  {plan}");
        }
        Err(LaunchBlocked::Disabled) => {
            println!("command: (disabled)");
        }
        Err(blocked) => {
            println!("command: cannot launch: {blocked}");
        }
    }
    if snapshot.workspace_root.is_none() {
        println!("  (no workspace root configured)");
    }
    println!();

    println!("environment overlay:");
    for (key, value) in environment_overlay(snapshot) {
        println!("  {key}={value}");
    }
}

// src/watch/watcher.rs

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::{Result, SupervisorError};
use crate::host::HostEvent;

/// Bursts of events (editors writing a temp file then renaming it) inside
/// this window collapse into a single reload.
const DEBOUNCE: Duration = Duration::from_millis(200);

/// Handle for the config watcher.
///
/// Dropping it stops watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `config_path` and send [`HostEvent::ConfigChanged`] on `host_tx`
/// whenever it is written, created or replaced.
///
/// The parent directory is watched rather than the file itself so that
/// atomic replace-by-rename saves are still seen.
pub fn spawn_config_watcher(
    config_path: impl Into<PathBuf>,
    host_tx: mpsc::Sender<HostEvent>,
) -> Result<WatcherHandle> {
    let config_path = config_path.into();
    let dir = watch_dir(&config_path);
    let file_name = config_path.file_name().map(OsString::from).ok_or_else(|| {
        SupervisorError::ConfigError(format!("config path {config_path:?} has no file name"))
    })?;

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("mcpvisor: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("mcpvisor: config watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&dir, RecursiveMode::NonRecursive)?;

    info!("watching config file {:?}", config_path);

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if !touches_file(&event, &file_name) {
                continue;
            }
            debug!(?event, "config file event");

            tokio::time::sleep(DEBOUNCE).await;
            while event_rx.try_recv().is_ok() {}

            if host_tx.send(HostEvent::ConfigChanged).await.is_err() {
                warn!("host loop gone; stopping config watcher");
                break;
            }
        }
    });

    Ok(WatcherHandle { _inner: watcher })
}

fn watch_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Content changes, creations and renames of the config file. Access and
/// metadata-only events are ignored.
fn touches_file(event: &Event, file_name: &OsString) -> bool {
    let relevant = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Any
    ) && !matches!(
        event.kind,
        EventKind::Modify(notify::event::ModifyKind::Metadata(_))
    );

    relevant
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
}

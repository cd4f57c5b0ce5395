// src/host/sink.rs

use std::fmt::Debug;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::errors::Result;

/// Line-oriented output channel owned by the host.
pub trait LogSink: Send + Sync + Debug {
    fn append_line(&self, line: &str);

    /// Release the sink. Lines appended afterwards may be dropped.
    fn close(&self) {}
}

/// Sink that emits every line as a `tracing` event under the
/// `mcpvisor::child` target.
#[derive(Debug, Clone, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn append_line(&self, line: &str) {
        info!(target: "mcpvisor::child", "{line}");
    }
}

/// Sink appending to a file on disk.
///
/// `append_line` only queues the line; a dedicated writer thread does the
/// blocking file IO so output forwarders never stall runtime workers.
#[derive(Debug)]
pub struct FileLogSink {
    lines: Mutex<Option<mpsc::UnboundedSender<String>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl FileLogSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let writer = thread::Builder::new()
            .name("mcpvisor-log-file".to_string())
            .spawn(move || write_lines(file, rx))?;

        Ok(Self {
            lines: Mutex::new(Some(tx)),
            writer: Mutex::new(Some(writer)),
        })
    }
}

/// Drain queued lines until every sender is gone, flushing whenever the
/// queue runs empty.
fn write_lines(file: File, mut rx: mpsc::UnboundedReceiver<String>) {
    let mut out = BufWriter::new(file);

    while let Some(line) = rx.blocking_recv() {
        if let Err(e) = writeln!(out, "{line}") {
            warn!(error = %e, "failed to write to log file");
        }
        if rx.is_empty() {
            if let Err(e) = out.flush() {
                warn!(error = %e, "failed to flush log file");
            }
        }
    }

    if let Err(e) = out.flush() {
        warn!(error = %e, "failed to flush log file");
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl LogSink for FileLogSink {
    fn append_line(&self, line: &str) {
        if let Some(tx) = lock(&self.lines).as_ref() {
            // Fails only once the writer thread is gone.
            let _ = tx.send(line.to_string());
        }
    }

    /// Stop accepting lines and wait until the queued ones are on disk.
    fn close(&self) {
        drop(lock(&self.lines).take());
        let writer = lock(&self.writer).take();
        if let Some(writer) = writer {
            if writer.join().is_err() {
                warn!("log file writer thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sink_appends_and_drops_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("server.log");

        let sink = FileLogSink::open(&path).unwrap();
        sink.append_line("first");
        sink.append_line("[stderr] second");
        sink.close();
        sink.append_line("after close");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "first\n[stderr] second\n");
    }

    #[test]
    fn file_sink_writes_without_waiting_for_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.log");

        let sink = FileLogSink::open(&path).unwrap();
        sink.append_line("[stdout] ready");

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        loop {
            let contents = std::fs::read_to_string(&path).unwrap();
            if contents == "[stdout] ready\n" {
                break;
            }
            assert!(std::time::Instant::now() < deadline, "line never flushed");
            thread::sleep(std::time::Duration::from_millis(10));
        }
        sink.close();
    }

    #[tokio::test]
    async fn file_sink_accepts_lines_from_async_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.log");
        let sink = std::sync::Arc::new(FileLogSink::open(&path).unwrap());

        let tasks: Vec<_> = (0..4)
            .map(|i| {
                let sink = std::sync::Arc::clone(&sink);
                tokio::spawn(async move {
                    for j in 0..25 {
                        sink.append_line(&format!("task {i} line {j}"));
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        sink.close();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 100);
    }
}

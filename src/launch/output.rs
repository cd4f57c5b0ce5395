// src/launch/output.rs

//! Forward child stdout/stderr to the log sink, one line at a time.

use std::fmt;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::host::LogSink;
use crate::launch::backend::BoxedReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    pub fn tag(self) -> &'static str {
        match self {
            StreamKind::Stdout => "[stdout]",
            StreamKind::Stderr => "[stderr]",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdout => f.write_str("stdout"),
            StreamKind::Stderr => f.write_str("stderr"),
        }
    }
}

/// Spawn a task that copies `reader` into `sink` until EOF.
///
/// Lines are never interpreted. Invalid UTF-8 is replaced rather than ending
/// the stream, and a trailing partial line is flushed at EOF.
pub fn spawn_line_forwarder(
    reader: BoxedReader,
    kind: StreamKind,
    sink: Arc<dyn LogSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    sink.append_line(&format!("{} {}", kind.tag(), line.trim_end()));
                }
                Err(e) => {
                    warn!(stream = %kind, error = %e, "failed to read child output");
                    break;
                }
            }
        }

        debug!(stream = %kind, "output forwarder ended");
    })
}

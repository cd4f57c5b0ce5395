#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use mcpvisor::config::ConfigFile;
use mcpvisor::host::Notification;
use mcpvisor::supervisor::{ProcessState, Supervisor};

pub use mcpvisor_test_utils::builders::{ConfigFileBuilder, SERVER_PATH, SharedConfig};
pub use mcpvisor_test_utils::fake_backend::{FakeBackend, FakeSignal};
pub use mcpvisor_test_utils::recording::{RecordingNotifier, RecordingSink};
pub use mcpvisor_test_utils::{init_tracing, with_timeout};

/// A supervisor wired to a fake backend and recording host seams.
pub struct Harness {
    pub supervisor: Supervisor,
    pub backend: FakeBackend,
    pub config: SharedConfig,
    pub sink: Arc<RecordingSink>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new(cfg: ConfigFile) -> Self {
        init_tracing();

        let options = cfg.supervisor;
        let backend = FakeBackend::new();
        let config = SharedConfig::new(cfg);
        let sink = RecordingSink::new();
        let notifier = RecordingNotifier::new();

        let supervisor = Supervisor::builder(Arc::new(config.clone()))
            .backend(Arc::new(backend.clone()))
            .sink(sink.clone())
            .notifier(notifier.clone())
            .options(options)
            .build();

        Self {
            supervisor,
            backend,
            config,
            sink,
            notifier,
        }
    }

    /// Resolve once the published state satisfies `pred`.
    pub async fn wait_for_state(&self, pred: impl FnMut(&ProcessState) -> bool) -> ProcessState {
        let mut rx = self.supervisor.subscribe();
        let state = with_timeout(rx.wait_for(pred))
            .await
            .expect("supervisor runtime ended");
        *state
    }

    /// Resolve once some sink line contains `needle`.
    pub async fn wait_for_line(&self, needle: &str) {
        with_timeout(async {
            while !self.sink.contains(needle) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
    }

    pub fn notified(&self, pred: impl Fn(&Notification) -> bool) -> usize {
        self.notifier.count(pred)
    }
}

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::sync::watch;

use mcpvisor::errors::{Result, SupervisorError};
use mcpvisor::launch::{
    BoxedReader, ChildProcess, LaunchPlan, ProcessBackend, ProcessExit, SpawnedProcess,
};

/// Signals a fake process received, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeSignal {
    Terminate,
    Kill,
}

#[derive(Debug, Clone)]
enum FakeExit {
    Exited(ProcessExit),
    WaitError(String),
}

#[derive(Debug)]
struct FakeProcessInner {
    pid: u32,
    ignore_terminate: bool,
    exit: watch::Sender<Option<FakeExit>>,
    signals: Mutex<Vec<FakeSignal>>,
    stdout: Mutex<Option<DuplexStream>>,
    stderr: Mutex<Option<DuplexStream>>,
}

impl FakeProcessInner {
    /// First outcome wins; later ones are ignored like on a reaped process.
    fn finish(&self, outcome: FakeExit) {
        self.exit.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(outcome);
            true
        });
    }

    fn has_exited(&self) -> bool {
        self.exit.borrow().is_some()
    }
}

/// Test-side handle for one spawned fake process.
#[derive(Debug, Clone)]
pub struct FakeProcess {
    inner: Arc<FakeProcessInner>,
}

impl FakeProcess {
    pub fn pid(&self) -> u32 {
        self.inner.pid
    }

    /// Exit on its own with `code`.
    pub fn exit(&self, code: i32) {
        self.inner.finish(FakeExit::Exited(ProcessExit::code(code)));
    }

    /// Exit with a non-zero code.
    pub fn crash(&self) {
        self.exit(1);
    }

    /// Die from an external signal.
    pub fn die_by_signal(&self, signal: i32) {
        self.inner.finish(FakeExit::Exited(ProcessExit::signal(signal)));
    }

    /// Make `wait()` return an OS error.
    pub fn fail_wait(&self, error: &str) {
        self.inner.finish(FakeExit::WaitError(error.to_string()));
    }

    pub fn has_exited(&self) -> bool {
        self.inner.has_exited()
    }

    pub fn signals(&self) -> Vec<FakeSignal> {
        self.inner.signals.lock().unwrap().clone()
    }

    pub async fn write_stdout(&self, text: &str) {
        write_to(&self.inner.stdout, text).await;
    }

    pub async fn write_stderr(&self, text: &str) {
        write_to(&self.inner.stderr, text).await;
    }
}

async fn write_to(slot: &Mutex<Option<DuplexStream>>, text: &str) {
    let stream = slot.lock().unwrap().take();
    if let Some(mut stream) = stream {
        stream.write_all(text.as_bytes()).await.unwrap();
        stream.flush().await.unwrap();
        *slot.lock().unwrap() = Some(stream);
    }
}

struct FakeChild {
    inner: Arc<FakeProcessInner>,
    exit_rx: watch::Receiver<Option<FakeExit>>,
}

impl ChildProcess for FakeChild {
    fn id(&self) -> Option<u32> {
        if self.inner.has_exited() {
            None
        } else {
            Some(self.inner.pid)
        }
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = io::Result<ProcessExit>> + Send + '_>> {
        Box::pin(async move {
            let outcome = self
                .exit_rx
                .wait_for(|exit| exit.is_some())
                .await
                .map(|exit| exit.clone())
                .map_err(|_| io::Error::other("fake process dropped"))?;

            match outcome {
                Some(FakeExit::Exited(exit)) => Ok(exit),
                Some(FakeExit::WaitError(error)) => Err(io::Error::other(error)),
                None => Err(io::Error::other("fake process has no exit")),
            }
        })
    }

    fn terminate(&mut self) -> io::Result<()> {
        self.inner
            .signals
            .lock()
            .unwrap()
            .push(FakeSignal::Terminate);
        if !self.inner.ignore_terminate {
            self.inner.finish(FakeExit::Exited(ProcessExit::signal(15)));
        }
        Ok(())
    }

    fn kill(&mut self) -> io::Result<()> {
        self.inner.signals.lock().unwrap().push(FakeSignal::Kill);
        self.inner.finish(FakeExit::Exited(ProcessExit::signal(9)));
        Ok(())
    }
}

#[derive(Debug)]
struct BackendInner {
    launches: Mutex<Vec<LaunchPlan>>,
    processes: Mutex<Vec<FakeProcess>>,
    launch_count: watch::Sender<usize>,
    fail_spawn: AtomicBool,
    ignore_terminate: AtomicBool,
    next_pid: AtomicU32,
}

/// A process backend that:
/// - records every launch attempt
/// - hands out scripted [`FakeProcess`]es the test drives by hand.
#[derive(Debug, Clone)]
pub struct FakeBackend {
    inner: Arc<BackendInner>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        let (launch_count, _) = watch::channel(0);
        Self {
            inner: Arc::new(BackendInner {
                launches: Mutex::new(Vec::new()),
                processes: Mutex::new(Vec::new()),
                launch_count,
                fail_spawn: AtomicBool::new(false),
                ignore_terminate: AtomicBool::new(false),
                next_pid: AtomicU32::new(1000),
            }),
        }
    }

    /// Make subsequent spawns fail.
    pub fn set_fail_spawn(&self, fail: bool) {
        self.inner.fail_spawn.store(fail, Ordering::SeqCst);
    }

    /// Make subsequently spawned processes ignore terminate requests.
    pub fn set_ignore_terminate(&self, ignore: bool) {
        self.inner.ignore_terminate.store(ignore, Ordering::SeqCst);
    }

    /// Every launch attempt, failed spawns included.
    pub fn launches(&self) -> Vec<LaunchPlan> {
        self.inner.launches.lock().unwrap().clone()
    }

    pub fn launch_count(&self) -> usize {
        *self.inner.launch_count.borrow()
    }

    /// Successfully spawned processes, in spawn order.
    pub fn process_count(&self) -> usize {
        self.inner.processes.lock().unwrap().len()
    }

    pub fn process(&self, index: usize) -> FakeProcess {
        self.inner.processes.lock().unwrap()[index].clone()
    }

    pub fn last_process(&self) -> FakeProcess {
        self.inner
            .processes
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no process spawned yet")
    }

    /// Resolve once at least `n` launch attempts have happened.
    pub async fn wait_for_launches(&self, n: usize) {
        let mut rx = self.inner.launch_count.subscribe();
        rx.wait_for(|count| *count >= n).await.unwrap();
    }
}

impl ProcessBackend for FakeBackend {
    fn spawn(&self, plan: &LaunchPlan) -> Result<SpawnedProcess> {
        self.inner.launches.lock().unwrap().push(plan.clone());

        if self.inner.fail_spawn.load(Ordering::SeqCst) {
            self.inner.launch_count.send_modify(|c| *c += 1);
            return Err(SupervisorError::Spawn {
                program: plan.program.display().to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "fake spawn failure"),
            });
        }

        let (exit, exit_rx) = watch::channel(None);
        let (stdout_tx, stdout_rx) = tokio::io::duplex(4096);
        let (stderr_tx, stderr_rx) = tokio::io::duplex(4096);

        let inner = Arc::new(FakeProcessInner {
            pid: self.inner.next_pid.fetch_add(1, Ordering::SeqCst),
            ignore_terminate: self.inner.ignore_terminate.load(Ordering::SeqCst),
            exit,
            signals: Mutex::new(Vec::new()),
            stdout: Mutex::new(Some(stdout_tx)),
            stderr: Mutex::new(Some(stderr_tx)),
        });

        self.inner.processes.lock().unwrap().push(FakeProcess {
            inner: Arc::clone(&inner),
        });
        self.inner.launch_count.send_modify(|c| *c += 1);

        Ok(SpawnedProcess {
            child: Box::new(FakeChild { inner, exit_rx }),
            stdin: None,
            stdout: Some(Box::new(stdout_rx) as BoxedReader),
            stderr: Some(Box::new(stderr_rx) as BoxedReader),
        })
    }
}

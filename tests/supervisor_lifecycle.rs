// tests/supervisor_lifecycle.rs

mod common;
use crate::common::{ConfigFileBuilder, FakeSignal, Harness, with_timeout};

use std::error::Error;
use std::time::Duration;

use tokio::time::{Instant, sleep};

use mcpvisor::config::RateLimitOperation;
use mcpvisor::host::Notification;
use mcpvisor::supervisor::ProcessState;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test(start_paused = true)]
async fn start_is_idempotent() -> TestResult {
    let h = Harness::new(ConfigFileBuilder::new().build());

    assert!(h.supervisor.start().await);
    assert!(h.supervisor.start().await);

    assert_eq!(h.backend.process_count(), 1);
    assert!(h.supervisor.is_running());
    assert!(h.sink.contains("already running"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn concurrent_starts_spawn_one_process() -> TestResult {
    let h = Harness::new(ConfigFileBuilder::new().build());

    let (a, b) = tokio::join!(h.supervisor.start(), h.supervisor.start());

    assert!(a && b);
    assert_eq!(h.backend.process_count(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn start_reports_pid_and_command() -> TestResult {
    let h = Harness::new(ConfigFileBuilder::new().server_args(&["--stdio"]).build());

    assert!(h.supervisor.start().await);

    let pid = h.backend.process(0).pid();
    assert_eq!(h.supervisor.state(), ProcessState::Running { pid: Some(pid) });
    assert!(h.sink.contains("Starting MCP server: /opt/mcp/domainforge-mcp"));
    assert!(h.sink.contains("Arguments: --workspace-root /work --stdio"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stop_terminates_cooperatively() -> TestResult {
    let h = Harness::new(ConfigFileBuilder::new().build());
    h.supervisor.start().await;

    let started = Instant::now();
    h.supervisor.stop().await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(h.backend.process(0).signals(), vec![FakeSignal::Terminate]);
    assert_eq!(h.supervisor.state(), ProcessState::StoppedRequested);
    assert!(!h.supervisor.is_running());
    assert!(h.sink.contains("MCP server stopped"));

    // A requested stop never triggers a restart.
    sleep(Duration::from_secs(5)).await;
    assert_eq!(h.backend.process_count(), 1);
    assert_eq!(h.notified(|n| matches!(n, Notification::Restarting { .. })), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stop_escalates_to_kill_after_grace_period() -> TestResult {
    let h = Harness::new(ConfigFileBuilder::new().build());
    h.backend.set_ignore_terminate(true);
    h.supervisor.start().await;

    let started = Instant::now();
    h.supervisor.stop().await;

    assert!(started.elapsed() >= Duration::from_secs(5));
    assert_eq!(
        h.backend.process(0).signals(),
        vec![FakeSignal::Terminate, FakeSignal::Kill]
    );
    assert!(h.sink.contains("Force killing MCP server..."));
    assert_eq!(h.supervisor.state(), ProcessState::StoppedRequested);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stop_without_a_process_is_a_no_op() -> TestResult {
    let h = Harness::new(ConfigFileBuilder::new().build());

    h.supervisor.stop().await;

    assert_eq!(h.supervisor.state(), ProcessState::Idle);
    assert_eq!(h.backend.launch_count(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn restart_replaces_the_running_process() -> TestResult {
    let h = Harness::new(ConfigFileBuilder::new().build());
    h.supervisor.start().await;

    assert!(h.supervisor.restart().await);

    assert_eq!(h.backend.process_count(), 2);
    assert!(h.backend.process(0).has_exited());
    assert_eq!(h.backend.process(0).signals(), vec![FakeSignal::Terminate]);
    assert!(!h.backend.process(1).has_exited());
    assert!(h.supervisor.is_running());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn restart_from_idle_just_starts() -> TestResult {
    let h = Harness::new(ConfigFileBuilder::new().build());

    assert!(h.supervisor.restart().await);
    assert_eq!(h.backend.process_count(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn each_start_reads_fresh_configuration() -> TestResult {
    let h = Harness::new(ConfigFileBuilder::new().build());
    h.supervisor.start().await;
    h.supervisor.stop().await;

    h.config
        .update(|cfg| cfg.rate_limits.set(RateLimitOperation::Hover, 42));
    h.supervisor.start().await;

    let launches = h.backend.launches();
    assert_eq!(launches.len(), 2);
    assert_eq!(
        launches[0].env.get("MCP_RATE_LIMIT_HOVER").map(String::as_str),
        Some("20")
    );
    assert_eq!(
        launches[1].env.get("MCP_RATE_LIMIT_HOVER").map(String::as_str),
        Some("42")
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn child_output_is_tagged_by_stream() -> TestResult {
    let h = Harness::new(ConfigFileBuilder::new().build());
    h.supervisor.start().await;

    let process = h.backend.process(0);
    process.write_stdout("listening\n").await;
    process.write_stderr("warming up\n").await;

    h.wait_for_line("[stdout] listening").await;
    h.wait_for_line("[stderr] warming up").await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn dispose_stops_the_child_and_closes_the_sink() -> TestResult {
    let h = Harness::new(ConfigFileBuilder::new().build());
    h.supervisor.start().await;

    let mut state_rx = h.supervisor.subscribe();
    let backend = h.backend.clone();
    let sink = h.sink.clone();
    h.supervisor.dispose();

    // The state channel closes once the runtime task has finished.
    with_timeout(async { while state_rx.changed().await.is_ok() {} }).await;

    assert_eq!(backend.process(0).signals(), vec![FakeSignal::Terminate]);
    assert!(sink.is_closed());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn state_subscribers_see_transitions() -> TestResult {
    let h = Harness::new(ConfigFileBuilder::new().build());
    let mut rx = h.supervisor.subscribe();
    assert_eq!(*rx.borrow_and_update(), ProcessState::Idle);

    h.supervisor.start().await;
    assert!(rx.has_changed()?);
    assert!(rx.borrow_and_update().is_running());

    h.supervisor.stop().await;
    assert_eq!(*rx.borrow_and_update(), ProcessState::StoppedRequested);
    Ok(())
}

#![allow(clippy::unwrap_used)] // Integration tests use unwrap for brevity

//! Reverse-order shutdown, timeout escalation and cancellation of the bring-up.

mod common;

use std::time::Duration;

use common::{CallKind, FakeLauncher, config, drain, registry, spawn_run, supervisor, worker};
use nodevisor::{
    BringUpOutcome, ControlError, EventKind, LifecycleState, RuntimeError, SupervisorConfig,
    WorkerFailure,
};
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn shutdown_stops_in_reverse_order() {
    let launcher = FakeLauncher::new();
    let sup = supervisor(config(), &launcher);
    let mut events = sup.subscribe();
    let run = spawn_run(
        &sup,
        registry(vec![worker("a", 1), worker("b", 2), worker("c", 3)]),
    );
    assert_eq!(sup.bring_up().await, BringUpOutcome::Success);

    sup.shutdown();
    run.await.unwrap().unwrap();

    assert_eq!(launcher.calls(CallKind::Stop), vec!["c", "b", "a"]);
    assert!(
        sup.snapshot()
            .iter()
            .all(|s| s.state == LifecycleState::Finalized && s.failure.is_none())
    );

    let kinds: Vec<_> = drain(&mut events).into_iter().map(|e| e.kind).collect();
    assert!(kinds.contains(&EventKind::ShutdownRequested));
    assert_eq!(kinds.last(), Some(&EventKind::AllStoppedWithin));
}

#[tokio::test(start_paused = true)]
async fn stuck_worker_is_forced_after_timeout() {
    let launcher = FakeLauncher::new();
    launcher.stuck_on_stop("b");
    let timeout = Duration::from_secs(5);
    let cfg = SupervisorConfig {
        shutdown_timeout: timeout,
        ..config()
    };
    let sup = supervisor(cfg, &launcher);
    let run = spawn_run(
        &sup,
        registry(vec![worker("a", 1), worker("b", 2), worker("c", 3)]),
    );
    assert_eq!(sup.bring_up().await, BringUpOutcome::Success);

    let started = Instant::now();
    sup.shutdown();
    let err = run.await.unwrap().unwrap_err();
    assert!(started.elapsed() >= timeout);

    match err {
        RuntimeError::ForcedShutdown {
            timeout: got,
            stuck,
        } => {
            assert_eq!(got, timeout);
            assert_eq!(stuck, vec!["b".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(launcher.calls(CallKind::Stop), vec!["c", "b", "a"]);
    assert_eq!(launcher.count(CallKind::Kill, "b"), 1);

    let status = sup.snapshot();
    assert!(status.iter().all(|s| s.state == LifecycleState::Finalized));
    assert_eq!(status[1].failure, Some(WorkerFailure::ForcedShutdown));
    assert_eq!(status[0].failure, None);
}

#[tokio::test(start_paused = true)]
async fn shutdown_during_bring_up_is_cancelled() {
    let launcher = FakeLauncher::new();
    launcher.slow_configure("a", Duration::from_secs(10));
    let sup = supervisor(config(), &launcher);
    let run = spawn_run(&sup, registry(vec![worker("a", 1), worker("b", 2)]));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(sup.snapshot()[0].state, LifecycleState::Configuring);

    sup.shutdown();
    assert_eq!(sup.bring_up().await, BringUpOutcome::Cancelled);

    // The stop waits for the in-flight configure step, then runs.
    run.await.unwrap().unwrap();
    assert_eq!(launcher.calls(CallKind::Stop), vec!["a"]);
    assert_eq!(launcher.count(CallKind::Activate, "a"), 0);
    assert_eq!(launcher.count(CallKind::Start, "b"), 0);
    assert!(
        sup.snapshot()
            .iter()
            .all(|s| s.state == LifecycleState::Finalized)
    );
}

#[tokio::test(start_paused = true)]
async fn control_is_closed_after_run() {
    let launcher = FakeLauncher::new();
    let sup = supervisor(config(), &launcher);
    let workers = || registry(vec![worker("a", 1)]);
    let run = spawn_run(&sup, workers());
    assert_eq!(sup.bring_up().await, BringUpOutcome::Success);

    sup.shutdown();
    run.await.unwrap().unwrap();

    assert_eq!(sup.request_launch("a").await, Err(ControlError::Closed));
    assert!(matches!(
        sup.run(workers()).await,
        Err(RuntimeError::AlreadyRunning)
    ));
}

#[tokio::test(start_paused = true)]
async fn unbounded_timeout_waits_for_workers() {
    let launcher = FakeLauncher::new();
    let cfg = SupervisorConfig {
        shutdown_timeout: Duration::MAX,
        ..config()
    };
    let sup = supervisor(cfg, &launcher);
    let run = spawn_run(&sup, registry(vec![worker("a", 1), worker("b", 2)]));
    assert_eq!(sup.bring_up().await, BringUpOutcome::Success);

    sup.shutdown();
    run.await.unwrap().unwrap();

    assert_eq!(launcher.calls(CallKind::Stop), vec!["b", "a"]);
    assert!(
        sup.snapshot()
            .iter()
            .all(|s| s.state == LifecycleState::Finalized && s.failure.is_none())
    );
}

#[tokio::test(start_paused = true)]
async fn forced_kills_run_concurrently() {
    let launcher = FakeLauncher::new();
    for name in ["a", "b"] {
        launcher.stuck_on_stop(name);
        launcher.slow_kill(name, Duration::from_secs(10));
    }
    let timeout = Duration::from_secs(5);
    let cfg = SupervisorConfig {
        shutdown_timeout: timeout,
        ..config()
    };
    let sup = supervisor(cfg, &launcher);
    let run = spawn_run(&sup, registry(vec![worker("a", 1), worker("b", 2)]));
    assert_eq!(sup.bring_up().await, BringUpOutcome::Success);

    let started = Instant::now();
    sup.shutdown();
    let err = run.await.unwrap().unwrap_err();
    assert_eq!(err.as_label(), "runtime_forced_shutdown");

    let elapsed = started.elapsed();
    assert!(elapsed >= timeout + Duration::from_secs(10));
    assert!(elapsed < timeout + Duration::from_secs(20));
    assert_eq!(launcher.count(CallKind::Kill, "a"), 1);
    assert_eq!(launcher.count(CallKind::Kill, "b"), 1);
}

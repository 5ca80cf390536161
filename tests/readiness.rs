#![allow(clippy::unwrap_used)] // Integration tests use unwrap for brevity

//! Readiness aggregate over required workers.

mod common;

use std::time::Duration;

use common::{FakeLauncher, config, registry, spawn_run, supervisor, wait_for, worker};
use nodevisor::{BringUpOutcome, EventKind, LifecycleState, Readiness, SupervisorConfig};

#[tokio::test(start_paused = true)]
async fn readiness_tracks_required_workers() {
    let launcher = FakeLauncher::new();
    let cfg = SupervisorConfig {
        respawn_ceiling: Some(1),
        ..config()
    };
    let sup = supervisor(cfg, &launcher);
    let mut events = sup.subscribe();
    let mut readiness = sup.watch_readiness();
    let delay = Duration::from_secs(1);
    let run = spawn_run(
        &sup,
        registry(vec![
            worker("controller_server", 1).with_respawn_delay(delay),
            worker("rviz", 2)
                .with_respawn_delay(delay)
                .with_required(false),
        ]),
    );

    assert_eq!(sup.bring_up().await, BringUpOutcome::Success);
    assert_eq!(*readiness.borrow_and_update(), Readiness::Ready);

    // Optional workers never affect readiness.
    launcher.crash("rviz", Some(1));
    wait_for(&mut events, |e| e.is_transition_to("rviz", LifecycleState::Exited)).await;
    assert_eq!(sup.readiness(), Readiness::Ready);

    // A required crash flips readiness in the same step as the transition.
    launcher.crash("controller_server", Some(1));
    wait_for(&mut events, |e| {
        e.is_transition_to("controller_server", LifecycleState::Exited)
    })
    .await;
    let ev = events.recv().await.unwrap();
    assert_eq!(ev.kind, EventKind::ReadinessChanged);
    assert_eq!(ev.readiness, Some(Readiness::NotReady));

    // Respawned and active again.
    readiness.wait_for(|r| *r == Readiness::Ready).await.unwrap();

    // Out of budget: degraded.
    launcher.crash("controller_server", Some(1));
    readiness
        .wait_for(|r| *r == Readiness::Degraded)
        .await
        .unwrap();

    sup.shutdown();
    run.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn stopping_a_worker_makes_it_not_ready() {
    let launcher = FakeLauncher::new();
    let sup = supervisor(config(), &launcher);
    let run = spawn_run(&sup, registry(vec![worker("a", 1), worker("b", 2)]));
    assert_eq!(sup.bring_up().await, BringUpOutcome::Success);

    let mut readiness = sup.watch_readiness();
    sup.request_stop("b").await.unwrap();
    readiness
        .wait_for(|r| *r == Readiness::NotReady)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(sup.snapshot()[1].state, LifecycleState::Finalized);

    // A finalized worker cannot be relaunched or stopped again.
    let err = sup.request_launch("b").await.unwrap_err();
    assert_eq!(err.as_label(), "control_invalid_transition");
    let err = sup.request_stop("b").await.unwrap_err();
    assert_eq!(err.as_label(), "control_invalid_transition");

    sup.shutdown();
    run.await.unwrap().unwrap();
}

#![cfg(unix)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{eventually, exited, missing, next_matching, sh, sleeper};
use mcpvisor::{Bus, ConfigStore, EventKind, LaunchDescriptor, Registry, SupervisorError};

const WAIT: Duration = Duration::from_secs(5);

fn registry(entries: Vec<(&str, LaunchDescriptor)>) -> Arc<Registry> {
    let store = ConfigStore::from_entries(entries).unwrap();
    Registry::new(Arc::new(store), Bus::new(256))
}

async fn pid_of(reg: &Registry, name: &str) -> Option<u32> {
    reg.info(name).await.and_then(|i| i.pid)
}

#[tokio::test]
async fn start_twice_keeps_single_process() {
    let reg = registry(vec![("a", sleeper())]);

    reg.start("a").await.unwrap();
    let first = pid_of(&reg, "a").await;
    assert!(first.is_some());

    reg.start("a").await.unwrap();
    assert_eq!(pid_of(&reg, "a").await, first);
    assert_eq!(reg.running().await, vec!["a"]);

    reg.stop("a").await.unwrap();
}

#[tokio::test]
async fn concurrent_starts_launch_once() {
    let reg = registry(vec![("a", sleeper())]);
    let mut rx = reg.bus().subscribe();

    let (r1, r2) = tokio::join!(reg.start("a"), reg.start("a"));
    r1.unwrap();
    r2.unwrap();

    let started = next_matching(&mut rx, WAIT, |ev| ev.kind == EventKind::ServerStarted).await;
    let again = next_matching(&mut rx, WAIT, |ev| ev.kind == EventKind::ServerAlreadyRunning).await;
    assert_eq!(started.pid, again.pid);

    reg.stop("a").await.unwrap();
}

#[tokio::test]
async fn stop_terminates_and_removes() {
    let reg = registry(vec![("a", sleeper())]);
    let mut rx = reg.bus().subscribe();

    reg.start("a").await.unwrap();
    reg.stop("a").await.unwrap();
    assert!(!reg.is_running("a").await);

    let ev = next_matching(&mut rx, WAIT, exited("a")).await;
    assert_eq!(ev.expected, Some(true));
    assert!(!ev.is_unexpected_exit());

    // Second stop is a no-op.
    reg.stop("a").await.unwrap();
}

#[tokio::test]
async fn unexpected_exit_is_removed_and_reported() {
    let reg = registry(vec![("flaky", sh("exit 3"))]);
    let mut rx = reg.bus().subscribe();

    reg.start("flaky").await.unwrap();

    let ev = next_matching(&mut rx, WAIT, exited("flaky")).await;
    assert_eq!(ev.exit_code, Some(3));
    assert_eq!(ev.expected, Some(false));
    assert!(ev.is_unexpected_exit());

    assert!(eventually(WAIT, || async { !reg.is_running("flaky").await }).await);

    // No automatic restart.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(reg.running().await.is_empty());
}

#[tokio::test]
async fn restart_is_not_clobbered_by_old_exit() {
    let reg = registry(vec![("a", sleeper())]);
    let mut rx = reg.bus().subscribe();

    reg.start("a").await.unwrap();
    let old = pid_of(&reg, "a").await;
    reg.stop("a").await.unwrap();
    reg.start("a").await.unwrap();
    let new = pid_of(&reg, "a").await;
    assert_ne!(old, new);

    let ev = next_matching(&mut rx, WAIT, |ev| {
        ev.kind == EventKind::ServerExited && ev.pid == old
    })
    .await;
    assert_eq!(ev.expected, Some(true));

    // Give the old watcher time to run its cleanup.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(reg.is_running("a").await);
    assert_eq!(pid_of(&reg, "a").await, new);

    reg.stop("a").await.unwrap();
}

#[tokio::test]
async fn start_all_is_best_effort() {
    let reg = registry(vec![("a", sleeper()), ("ghost", missing()), ("b", sleeper())]);

    let report = reg.start_all().await;
    assert_eq!(report.succeeded, vec!["a", "b"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "ghost");
    assert_eq!(reg.running().await, vec!["a", "b"]);

    match report.into_result() {
        Err(SupervisorError::Batch { failed, .. }) => assert_eq!(failed, vec!["ghost"]),
        other => panic!("unexpected: {other:?}"),
    }

    let stopped = reg.stop_all().await;
    assert!(stopped.is_ok());
    assert_eq!(stopped.succeeded, vec!["a", "b"]);
    assert!(reg.running().await.is_empty());
}

#[tokio::test]
async fn running_is_always_subset_of_configured() {
    let reg = registry(vec![("a", sleeper()), ("b", sh("exit 0"))]);

    reg.start_all().await;
    let _ = reg.start("c").await;

    let status = reg.status().await;
    assert!(
        status
            .running
            .iter()
            .all(|n| status.configured.contains(n))
    );
    assert_eq!(status.configured, vec!["a", "b"]);

    reg.stop_all().await;
}

#[tokio::test]
async fn independent_servers_scenario() {
    let reg = registry(vec![("a", sleeper()), ("b", sleeper())]);

    reg.start("a").await.unwrap();
    assert_eq!(reg.status().await.running, vec!["a"]);

    reg.start("b").await.unwrap();
    assert_eq!(reg.status().await.running, vec!["a", "b"]);

    reg.stop("a").await.unwrap();
    assert_eq!(reg.status().await.running, vec!["b"]);

    let err = reg.start("c").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(reg.status().await.running, vec!["b"]);

    reg.stop_all().await;
    assert!(reg.status().await.running.is_empty());
}

#[tokio::test]
async fn environment_overrides_reach_the_child() {
    let reg = registry(vec![(
        "env",
        sh("test \"$MCPVISOR_TEST_VAR\" = expected && exit 7; exit 1")
            .with_env("MCPVISOR_TEST_VAR", "expected"),
    )]);
    let mut rx = reg.bus().subscribe();

    reg.start("env").await.unwrap();
    let ev = next_matching(&mut rx, WAIT, exited("env")).await;
    assert_eq!(ev.exit_code, Some(7));
}

#[tokio::test]
async fn environment_override_wins_over_inherited_value() {
    // PATH is always inherited; shadow it with a value the child can recognise
    // while keeping `sh` reachable through its absolute path.
    let inherited = std::env::var("PATH").unwrap_or_default();
    assert_ne!(inherited, "/bin:/usr/bin:/mcpvisor-override");

    let reg = registry(vec![(
        "env",
        LaunchDescriptor::new("/bin/sh")
            .with_args([
                "-c",
                "test \"$PATH\" = /bin:/usr/bin:/mcpvisor-override && exit 7; exit 1",
            ])
            .with_env("PATH", "/bin:/usr/bin:/mcpvisor-override"),
    )]);
    let mut rx = reg.bus().subscribe();

    reg.start("env").await.unwrap();
    let ev = next_matching(&mut rx, WAIT, exited("env")).await;
    assert_eq!(ev.exit_code, Some(7));
}

#[tokio::test]
async fn wait_stopped_reports_stubborn_children() {
    let reg = registry(vec![(
        "stubborn",
        sh("trap '' TERM; while true; do sleep 1; done"),
    )]);

    reg.start("stubborn").await.unwrap();
    // Let the shell install its trap before asking it to stop.
    tokio::time::sleep(Duration::from_millis(300)).await;

    reg.close();
    reg.stop_all().await;
    let stuck = reg
        .wait_stopped(Duration::from_millis(200))
        .await
        .unwrap_err();
    assert_eq!(stuck, vec!["stubborn"]);
}

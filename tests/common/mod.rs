#![allow(dead_code)]

use std::future::Future;
use std::time::Duration;

use mcpvisor::{Event, EventKind, LaunchDescriptor};
use tokio::sync::broadcast;

/// A server that runs a shell snippet.
pub fn sh(script: &str) -> LaunchDescriptor {
    LaunchDescriptor::new("sh").with_args(["-c", script])
}

/// A server that stays up until terminated.
pub fn sleeper() -> LaunchDescriptor {
    sh("exec sleep 30")
}

/// A server whose executable does not exist.
pub fn missing() -> LaunchDescriptor {
    LaunchDescriptor::new("/nonexistent/mcpvisor-test-binary")
}

/// Polls `check` every 10ms until it returns true or `timeout` elapses.
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Receives events until one matches `pred`, or panics after `timeout`.
pub async fn next_matching<P>(
    rx: &mut broadcast::Receiver<Event>,
    timeout: Duration,
    pred: P,
) -> Event
where
    P: Fn(&Event) -> bool,
{
    tokio::time::timeout(timeout, async {
        loop {
            match rx.recv().await {
                Ok(ev) if pred(&ev) => return ev,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("bus closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Matches a `ServerExited` event for `server`.
pub fn exited(server: &'static str) -> impl Fn(&Event) -> bool {
    move |ev| ev.kind == EventKind::ServerExited && ev.server.as_deref() == Some(server)
}

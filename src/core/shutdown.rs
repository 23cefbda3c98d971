//! # Shutdown coordination.
//!
//! Two halves:
//! - [`wait_for_shutdown_signal`] completes when the process is asked to terminate
//! - [`drain`] stops every registered server and waits for their exits, bounded
//!   by the grace period
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//! - `SIGQUIT`
//!
//! **Other platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]
//!
//! ## Drain sequence
//! ```text
//! publish(ShutdownRequested)
//!   └─► registry.close()         no more launches
//!   └─► registry.stop_all()      request termination of every child
//!   └─► registry.wait_stopped(grace)
//!          ├─ Ok        → publish(AllStoppedWithin)
//!          └─ Err(stuck) → publish(GraceExceeded), RuntimeError::GraceExceeded
//! ```

use std::time::Duration;

use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};

use super::registry::Registry;

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners.
///
/// Returns `Ok(())` when any signal is received, or `Err` if signal registration fails.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal.
///
/// Returns `Ok(())` when Ctrl-C is received, or `Err` if registration fails.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Stops every registered server and waits up to `grace` for them to exit.
///
/// A stop failure for one server never prevents the others from being stopped.
pub(crate) async fn drain(
    registry: &Registry,
    bus: &Bus,
    grace: Duration,
) -> Result<(), RuntimeError> {
    bus.publish(Event::new(EventKind::ShutdownRequested));
    registry.close();

    let report = registry.stop_all().await;
    if let Err(e) = report.into_result() {
        tracing::warn!(error = %e, "stop-all reported failures during shutdown");
    }

    match registry.wait_stopped(grace).await {
        Ok(()) => {
            bus.publish(Event::new(EventKind::AllStoppedWithin));
            Ok(())
        }
        Err(stuck) => {
            bus.publish(Event::new(EventKind::GraceExceeded).with_reason(stuck.join(", ")));
            Err(RuntimeError::GraceExceeded { grace, stuck })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{ConfigStore, LaunchDescriptor};

    #[tokio::test]
    async fn empty_registry_drains_within_grace() {
        let store = ConfigStore::from_entries(vec![("a", LaunchDescriptor::new("true"))]).unwrap();
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let registry = Registry::new(Arc::new(store), bus.clone());

        drain(&registry, &bus, Duration::from_millis(50)).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().kind, EventKind::ShutdownRequested);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::AllStoppedWithin);
        assert!(registry.start("a").await.is_err());
    }
}

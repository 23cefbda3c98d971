//! # Server registry: name → live process.
//!
//! The registry is the only owner of [`ProcessHandle`]s and the single source of
//! truth for "is this server running": a name is present **iff** the supervisor
//! believes a live process exists for it.
//!
//! ## Architecture
//! ```text
//! Control API / Supervisor
//!         │
//!         ▼
//! Registry ──┬─► start(name)  ─► launch() ─► insert handle ─► TaskTracker.spawn(Watcher::run)
//!            ├─► stop(name)   ─► remove handle ─► handle.request_stop()      (fire-and-forget)
//!            ├─► start_all()  ─► start(n) for n in store order               (best-effort)
//!            ├─► stop_all()   ─► stop(n) for n in registered names           (best-effort)
//!            └─► status()     ─► { running, configured }
//!
//! Watcher (one per child) ── exit ──► publish ServerExited ──► remove entry iff id matches
//! ```
//!
//! ## Rules
//! - Check-then-insert for a name happens under one lock acquisition, so
//!   concurrent `start(name)` calls produce exactly one process
//! - `start` on a running name and `stop` on an absent name are no-op successes
//! - A failed launch never leaves an entry behind
//! - Registry keys are always a subset of configured names

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::config::ConfigStore;
use crate::error::SupervisorError;
use crate::events::{Bus, Event, EventKind};

use super::handle::{ProcessHandle, ServerInfo};
use super::status::{BatchReport, Status};
use super::watcher::{Entries, Watcher, launch};

/// Registry of running servers.
pub struct Registry {
    store: Arc<ConfigStore>,
    entries: Entries,
    bus: Bus,
    watchers: TaskTracker,
    watching: Arc<Mutex<BTreeMap<u64, Arc<str>>>>,
    closed: CancellationToken,
}

impl Registry {
    /// Creates an empty registry over `store`.
    pub fn new(store: Arc<ConfigStore>, bus: Bus) -> Arc<Self> {
        Arc::new(Self {
            store,
            entries: Arc::new(Mutex::new(HashMap::new())),
            bus,
            watchers: TaskTracker::new(),
            watching: Arc::new(Mutex::new(BTreeMap::new())),
            closed: CancellationToken::new(),
        })
    }

    /// The configuration store this registry launches from.
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// The bus lifecycle events are published on.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Starts `name` unless it is already running.
    ///
    /// Returns once the OS accepted the launch.
    pub async fn start(&self, name: &str) -> Result<(), SupervisorError> {
        let Some(desc) = self.store.get(name) else {
            debug!(server = name, "start requested for unconfigured server");
            return Err(SupervisorError::UnknownServer {
                name: name.to_string(),
            });
        };

        let mut entries = self.entries.lock().await;
        // Checked under the lock so a concurrent stop_all never misses a late launch.
        if self.closed.is_cancelled() {
            return Err(SupervisorError::ShuttingDown {
                name: name.to_string(),
            });
        }
        if let Some(live) = entries.get(name) {
            self.bus.publish(
                Event::new(EventKind::ServerAlreadyRunning)
                    .with_server(name)
                    .with_pid(live.pid()),
            );
            return Ok(());
        }

        let mut handle = ProcessHandle::new(name);
        self.bus
            .publish(Event::new(EventKind::ServerStarting).with_server(name));

        let child = match launch(desc) {
            Ok(child) => child,
            Err(source) => {
                self.bus.publish(
                    Event::new(EventKind::ServerLaunchFailed)
                        .with_server(name)
                        .with_reason(source.to_string()),
                );
                return Err(SupervisorError::LaunchFailure {
                    name: name.to_string(),
                    source,
                });
            }
        };
        handle.mark_running(child.id());

        // Published before the watcher exists, so it always precedes ServerExited.
        self.bus.publish(
            Event::new(EventKind::ServerStarted)
                .with_server(name)
                .with_pid(handle.pid()),
        );

        let watcher = Watcher::new(&handle, Arc::clone(&self.entries), self.bus.clone());
        let id = handle.id();
        self.watching
            .lock()
            .await
            .insert(id, Arc::clone(handle.name()));
        let watching = Arc::clone(&self.watching);
        self.watchers.spawn(async move {
            watcher.run(child).await;
            watching.lock().await.remove(&id);
        });

        entries.insert(name.to_string(), handle);
        Ok(())
    }

    /// Stops `name` if it is running.
    ///
    /// The entry is removed immediately; the OS teardown completes asynchronously.
    pub async fn stop(&self, name: &str) -> Result<(), SupervisorError> {
        let Some(handle) = self.entries.lock().await.remove(name) else {
            debug!(server = name, "stop requested for server that is not running");
            return Ok(());
        };

        handle.request_stop();
        self.bus.publish(
            Event::new(EventKind::ServerStopRequested)
                .with_server(name)
                .with_pid(handle.pid()),
        );
        Ok(())
    }

    /// Starts every configured server in configuration order (best-effort).
    pub async fn start_all(&self) -> BatchReport {
        let mut report = BatchReport::default();
        for name in self.store.names() {
            let res = self.start(&name).await;
            if let Err(e) = &res {
                warn!(server = %name, error = %e, "start failed");
            }
            report.record(name, res);
        }
        report
    }

    /// Stops every registered server (best-effort).
    pub async fn stop_all(&self) -> BatchReport {
        let mut report = BatchReport::default();
        for name in self.running().await {
            let res = self.stop(&name).await;
            if let Err(e) = &res {
                warn!(server = %name, error = %e, "stop failed");
            }
            report.record(name, res);
        }
        report
    }

    /// Sorted names currently registered.
    pub async fn running(&self) -> Vec<String> {
        let entries = self.entries.lock().await;
        let mut names: Vec<String> = entries.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Returns true if `name` has a live handle.
    pub async fn is_running(&self, name: &str) -> bool {
        self.entries.lock().await.contains_key(name)
    }

    /// Snapshot of running and configured names.
    pub async fn status(&self) -> Status {
        Status {
            running: self.running().await,
            configured: self.store.names(),
        }
    }

    /// Details for one configured server; `None` if `name` is not configured.
    pub async fn info(&self, name: &str) -> Option<ServerInfo> {
        if !self.store.contains(name) {
            return None;
        }
        let entries = self.entries.lock().await;
        Some(
            entries
                .get(name)
                .map(ProcessHandle::info)
                .unwrap_or_else(|| ServerInfo::stopped(name)),
        )
    }

    /// Refuses further launches. Idempotent.
    pub fn close(&self) {
        self.closed.cancel();
        self.watchers.close();
    }

    /// Waits up to `grace` for every child watcher to observe its process exit.
    ///
    /// Returns the sorted names still being watched when time ran out.
    /// Only meaningful after [`close`](Self::close).
    pub async fn wait_stopped(&self, grace: Duration) -> Result<(), Vec<String>> {
        if tokio::time::timeout(grace, self.watchers.wait()).await.is_ok() {
            return Ok(());
        }
        let watching = self.watching.lock().await;
        let mut stuck: Vec<String> = watching.values().map(|n| n.to_string()).collect();
        stuck.sort_unstable();
        stuck.dedup();
        Err(stuck)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LaunchDescriptor;

    fn registry(entries: Vec<(&str, LaunchDescriptor)>) -> Arc<Registry> {
        let store = ConfigStore::from_entries(entries).unwrap();
        Registry::new(Arc::new(store), Bus::new(64))
    }

    #[tokio::test]
    async fn unknown_server_is_rejected_without_entry() {
        let reg = registry(vec![("a", LaunchDescriptor::new("true"))]);

        let err = reg.start("c").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(reg.running().await.is_empty());
        assert!(reg.info("c").await.is_none());
    }

    #[tokio::test]
    async fn launch_failure_leaves_no_entry() {
        let reg = registry(vec![(
            "ghost",
            LaunchDescriptor::new("/nonexistent/mcpvisor-test-binary"),
        )]);
        let mut rx = reg.bus.subscribe();

        let err = reg.start("ghost").await.unwrap_err();
        assert_eq!(err.as_label(), "launch_failure");
        assert!(!reg.is_running("ghost").await);

        assert_eq!(rx.recv().await.unwrap().kind, EventKind::ServerStarting);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::ServerLaunchFailed);
    }

    #[tokio::test]
    async fn stop_of_absent_name_is_noop() {
        let reg = registry(vec![("a", LaunchDescriptor::new("true"))]);
        reg.stop("a").await.unwrap();
        reg.stop("not-configured").await.unwrap();
        assert!(reg.running().await.is_empty());
    }

    #[tokio::test]
    async fn closed_registry_refuses_start() {
        let reg = registry(vec![("a", LaunchDescriptor::new("true"))]);
        reg.close();

        let err = reg.start("a").await.unwrap_err();
        assert_eq!(err.as_label(), "shutting_down");
        assert!(reg.wait_stopped(Duration::from_millis(10)).await.is_ok());
    }

    #[tokio::test]
    async fn status_lists_configured_in_store_order() {
        let reg = registry(vec![
            ("b", LaunchDescriptor::new("true")),
            ("a", LaunchDescriptor::new("true")),
        ]);
        let status = reg.status().await;
        assert_eq!(status.configured, vec!["b", "a"]);
        assert!(status.running.is_empty());

        let info = reg.info("a").await.unwrap();
        assert!(!info.running);
        assert_eq!(info.pid, None);
    }
}

//! # Process handle: one launched child as seen by the registry.
//!
//! A [`ProcessHandle`] is created by a successful launch and owned exclusively
//! by the registry map. The OS-level [`Child`](tokio::process::Child) itself is
//! owned by the watcher task; the handle only keeps what the registry needs to
//! identify and stop it.
//!
//! ## Rules
//! - Every handle gets a process-unique `id`; exit cleanup only removes an entry
//!   whose id matches the exiting process
//! - `request_stop` is idempotent (cancelling an already cancelled token is a no-op)

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

static HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Observed lifecycle state of a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    /// Launch issued, pid not yet recorded.
    Starting,
    /// The OS accepted the launch.
    Running,
    /// The process terminated.
    Exited,
}

/// Registry-side handle of one live child.
#[derive(Debug)]
pub(crate) struct ProcessHandle {
    id: u64,
    name: Arc<str>,
    pid: Option<u32>,
    state: ProcessState,
    started_at: Instant,
    stop: CancellationToken,
}

impl ProcessHandle {
    /// Creates a handle in state [`ProcessState::Starting`].
    pub(crate) fn new(name: &str) -> Self {
        Self {
            id: HANDLE_ID.fetch_add(1, AtomicOrdering::Relaxed),
            name: Arc::from(name),
            pid: None,
            state: ProcessState::Starting,
            started_at: Instant::now(),
            stop: CancellationToken::new(),
        }
    }

    /// Records the OS pid and moves to [`ProcessState::Running`].
    pub(crate) fn mark_running(&mut self, pid: Option<u32>) {
        self.pid = pid;
        self.state = ProcessState::Running;
    }

    pub(crate) fn mark_exited(&mut self) {
        self.state = ProcessState::Exited;
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub(crate) fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Token the watcher listens on for termination requests.
    pub(crate) fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Asks the watcher to terminate the child. Does not wait.
    pub(crate) fn request_stop(&self) {
        self.stop.cancel();
    }

    /// Point-in-time view for status queries.
    pub(crate) fn info(&self) -> ServerInfo {
        ServerInfo {
            name: self.name.to_string(),
            running: self.state != ProcessState::Exited,
            state: Some(self.state),
            pid: self.pid,
            uptime: Some(self.started_at.elapsed()),
        }
    }
}

/// Snapshot of one configured server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    /// Logical name.
    pub name: String,
    /// True if the registry holds a live handle for this name.
    pub running: bool,
    /// Lifecycle state of the live handle (`None` when not running).
    pub state: Option<ProcessState>,
    /// OS pid of the live process.
    pub pid: Option<u32>,
    /// Time since launch.
    #[serde(rename = "uptime_ms", serialize_with = "serialize_uptime")]
    pub uptime: Option<Duration>,
}

impl ServerInfo {
    /// Info for a configured server with no live process.
    pub(crate) fn stopped(name: &str) -> Self {
        Self {
            name: name.to_string(),
            running: false,
            state: None,
            pid: None,
            uptime: None,
        }
    }
}

fn serialize_uptime<S: serde::Serializer>(
    uptime: &Option<Duration>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match uptime {
        Some(d) => {
            let ms = d.as_millis().min(u128::from(u64::MAX)) as u64;
            serializer.serialize_some(&ms)
        }
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_get_distinct_ids() {
        let a = ProcessHandle::new("a");
        let b = ProcessHandle::new("a");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn lifecycle_is_reflected_in_info() {
        let mut h = ProcessHandle::new("zotero");
        assert_eq!(h.info().state, Some(ProcessState::Starting));

        h.mark_running(Some(42));
        let info = h.info();
        assert!(info.running);
        assert_eq!(info.pid, Some(42));
        assert_eq!(info.state, Some(ProcessState::Running));

        h.mark_exited();
        assert!(!h.info().running);
    }

    #[test]
    fn request_stop_cancels_watcher_token() {
        let h = ProcessHandle::new("a");
        let token = h.stop_token();
        h.request_stop();
        h.request_stop();
        assert!(token.is_cancelled());
    }
}

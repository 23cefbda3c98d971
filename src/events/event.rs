//! # Runtime events emitted by the registry, watchers and supervisor.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Server lifecycle events**: launch, already-running, stop request, exit
//! - **Shutdown events**: signal observed, children stopped or grace exceeded
//! - **Subscriber events**: overflow and panic reports from the fan-out
//!
//! The [`Event`] struct carries additional metadata such as timestamps, server
//! name, pid, exit code and reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! For one server, `ServerStarted` is always published before the `ServerExited`
//! of the same process, because the watcher is spawned after the publish.
//!
//! ## Example
//! ```rust
//! use mcpvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ServerExited)
//!     .with_server("zotero")
//!     .with_exit_code(1)
//!     .with_expected(false);
//!
//! assert_eq!(ev.kind, EventKind::ServerExited);
//! assert_eq!(ev.server.as_deref(), Some("zotero"));
//! assert_eq!(ev.exit_code, Some(1));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `server`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `server`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Shutdown events ===
    /// Shutdown requested (OS signal observed).
    ShutdownRequested,

    /// Every watched child exited within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some children had not exited in time.
    ///
    /// Sets:
    /// - `reason`: comma-separated stuck server names
    GraceExceeded,

    // === Server lifecycle events ===
    /// A launch is about to be issued.
    ///
    /// Sets:
    /// - `server`: server name
    ServerStarting,

    /// The OS accepted the launch; the server is registered as running.
    ///
    /// Sets:
    /// - `server`: server name
    /// - `pid`: OS process id (when known)
    ServerStarted,

    /// `start` was called for a server that is already registered (no-op).
    ///
    /// Sets:
    /// - `server`: server name
    /// - `pid`: pid of the live process
    ServerAlreadyRunning,

    /// The OS refused to launch the configured command.
    ///
    /// Sets:
    /// - `server`: server name
    /// - `reason`: spawn error message
    ServerLaunchFailed,

    /// Termination was requested and the registry entry removed.
    ///
    /// Sets:
    /// - `server`: server name
    /// - `pid`: OS process id (when known)
    ServerStopRequested,

    /// The child process terminated.
    ///
    /// Sets:
    /// - `server`: server name
    /// - `pid`: OS process id (when known)
    /// - `exit_code`: exit status code (absent when killed by a signal)
    /// - `reason`: signal or wait error description, if any
    /// - `expected`: `true` if a stop had been requested for this process
    ServerExited,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Logical server name (or subscriber name for subscriber events).
    pub server: Option<Arc<str>>,
    /// OS process id of the child.
    pub pid: Option<u32>,
    /// Exit status code of the child.
    pub exit_code: Option<i32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Whether an exit was requested by the supervisor.
    pub expected: Option<bool>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            server: None,
            pid: None,
            exit_code: None,
            reason: None,
            expected: None,
        }
    }

    /// Attaches a server name.
    #[inline]
    pub fn with_server(mut self, server: impl Into<Arc<str>>) -> Self {
        self.server = Some(server.into());
        self
    }

    /// Attaches a process id, if known.
    #[inline]
    pub fn with_pid(mut self, pid: Option<u32>) -> Self {
        self.pid = pid;
        self
    }

    /// Attaches an exit code.
    #[inline]
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Marks whether the exit was requested.
    #[inline]
    pub fn with_expected(mut self, expected: bool) -> Self {
        self.expected = Some(expected);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_server(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_server(subscriber)
            .with_reason(info)
    }

    /// True for an exit nobody asked for (crash or voluntary exit).
    #[inline]
    pub fn is_unexpected_exit(&self) -> bool {
        self.kind == EventKind::ServerExited && self.expected == Some(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::ServerStarting);
        let b = Event::new(EventKind::ServerStarted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn unexpected_exit_requires_flag() {
        let exit = Event::new(EventKind::ServerExited).with_server("a");
        assert!(!exit.is_unexpected_exit());
        assert!(exit.clone().with_expected(false).is_unexpected_exit());
        assert!(!exit.with_expected(true).is_unexpected_exit());
    }
}

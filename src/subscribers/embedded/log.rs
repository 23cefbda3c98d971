//! # LogWriter: event renderer backed by `tracing`
//!
//! A subscriber that turns incoming [`Event`]s into structured `tracing` records
//! under the `mcpvisor::events` target.
//!
//! ## Example output (fmt layer)
//! ```text
//! INFO  mcpvisor::events: server starting server="zotero"
//! INFO  mcpvisor::events: server started server="zotero" pid=4242
//! WARN  mcpvisor::events: server exited unexpectedly server="zotero" pid=4242 exit_code=Some(1)
//! ERROR mcpvisor::events: server launch failed server="github" reason="No such file or directory (os error 2)"
//! WARN  mcpvisor::events: shutdown requested
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "mcpvisor::events";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let server = e.server.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::ServerStarting => {
                debug!(target: TARGET, server, "server starting");
            }
            EventKind::ServerStarted => {
                info!(target: TARGET, server, pid = ?e.pid, "server started");
            }
            EventKind::ServerAlreadyRunning => {
                info!(target: TARGET, server, pid = ?e.pid, "server already running");
            }
            EventKind::ServerLaunchFailed => {
                error!(target: TARGET, server, reason, "server launch failed");
            }
            EventKind::ServerStopRequested => {
                info!(target: TARGET, server, pid = ?e.pid, "server stop requested");
            }
            EventKind::ServerExited if e.is_unexpected_exit() => {
                warn!(
                    target: TARGET,
                    server,
                    pid = ?e.pid,
                    exit_code = ?e.exit_code,
                    reason,
                    "server exited unexpectedly"
                );
            }
            EventKind::ServerExited => {
                info!(target: TARGET, server, pid = ?e.pid, exit_code = ?e.exit_code, "server exited");
            }
            EventKind::ShutdownRequested => {
                warn!(target: TARGET, "shutdown requested");
            }
            EventKind::AllStoppedWithin => {
                info!(target: TARGET, "all servers stopped within grace");
            }
            EventKind::GraceExceeded => {
                error!(target: TARGET, stuck = reason, "grace exceeded");
            }
            EventKind::SubscriberOverflow => {
                warn!(target: TARGET, subscriber = server, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                error!(target: TARGET, subscriber = server, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

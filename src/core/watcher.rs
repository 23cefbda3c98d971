//! # Launch and observe one child process.
//!
//! [`launch`] turns a [`LaunchDescriptor`] into a running child with piped stdio.
//! [`Watcher::run`] then owns the child until it exits:
//!
//! ```text
//! launch(desc) ──► Child ──► Watcher::run()
//!                              ├─► forward stdout chunks ──► tracing (INFO, target mcpvisor::output)
//!                              ├─► forward stderr chunks ──► tracing (WARN, target mcpvisor::output)
//!                              ├─► hold stdin open (stdio servers exit on EOF)
//!                              └─► select! {
//!                                    child.wait()       → unexpected exit
//!                                    stop.cancelled()   → terminate(child), child.wait()
//!                                  }
//!                                  ├─► join forwarders (bounded by OUTPUT_DRAIN)
//!                                  ├─► publish ServerExited { exit_code, expected }
//!                                  └─► remove registry entry iff entry.id == handle id
//! ```
//!
//! ## Rules
//! - The watcher is the only owner of the [`Child`]
//! - Cleanup is scoped to the handle id it was spawned for, so a late exit of an
//!   old process never removes a newer process registered under the same name
//! - Output is forwarded as it arrives, at most [`OUTPUT_CHUNK`] bytes per record;
//!   a partial line is never held back waiting for a newline
//! - Invalid UTF-8 is replaced, never fatal

use std::collections::HashMap;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::LaunchDescriptor;
use crate::events::{Bus, Event, EventKind};

use super::handle::ProcessHandle;

const OUTPUT_TARGET: &str = "mcpvisor::output";

/// Largest slice of child output logged as one record.
pub(crate) const OUTPUT_CHUNK: usize = 8 * 1024;

/// How long to wait for the output pipes to drain after the child exited.
///
/// A grandchild that inherited the pipes can keep them open indefinitely.
const OUTPUT_DRAIN: Duration = Duration::from_millis(500);

/// Shared registry map: name → live handle.
pub(crate) type Entries = Arc<Mutex<HashMap<String, ProcessHandle>>>;

/// Spawns the descriptor's command.
///
/// The child inherits the supervisor's environment with the descriptor's
/// overrides applied on top (overrides win on conflict).
pub(crate) fn launch(desc: &LaunchDescriptor) -> std::io::Result<Child> {
    Command::new(&desc.command)
        .args(&desc.args)
        .envs(&desc.env)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
}

/// Exit observer bound to one [`ProcessHandle`].
pub(crate) struct Watcher {
    id: u64,
    name: Arc<str>,
    pid: Option<u32>,
    stop: CancellationToken,
    entries: Entries,
    bus: Bus,
}

impl Watcher {
    pub(crate) fn new(handle: &ProcessHandle, entries: Entries, bus: Bus) -> Self {
        Self {
            id: handle.id(),
            name: Arc::clone(handle.name()),
            pid: handle.pid(),
            stop: handle.stop_token(),
            entries,
            bus,
        }
    }

    /// Observes `child` until it exits, then publishes and cleans up.
    pub(crate) async fn run(self, mut child: Child) {
        let stdin = child.stdin.take();
        let mut forwarders = Vec::with_capacity(2);
        if let Some(out) = child.stdout.take() {
            forwarders.push(tokio::spawn(forward_output(
                Arc::clone(&self.name),
                Stream::Stdout,
                out,
            )));
        }
        if let Some(err) = child.stderr.take() {
            forwarders.push(tokio::spawn(forward_output(
                Arc::clone(&self.name),
                Stream::Stderr,
                err,
            )));
        }

        let (status, expected) = tokio::select! {
            status = child.wait() => (status, false),
            _ = self.stop.cancelled() => {
                terminate(&mut child, &self.name);
                (child.wait().await, true)
            }
        };
        drop(stdin);
        self.drain_output(forwarders).await;

        self.publish_exit(status, expected);
        self.cleanup().await;
    }

    /// Waits for the forwarders to reach EOF so the last output precedes `ServerExited`.
    async fn drain_output(&self, forwarders: Vec<JoinHandle<()>>) {
        let aborts: Vec<_> = forwarders.iter().map(JoinHandle::abort_handle).collect();
        let joined = futures::future::join_all(forwarders);
        if tokio::time::timeout(OUTPUT_DRAIN, joined).await.is_err() {
            debug!(server = %self.name, "output still open after exit, detaching forwarders");
            for handle in aborts {
                handle.abort();
            }
        }
    }

    fn publish_exit(&self, status: std::io::Result<ExitStatus>, expected: bool) {
        let mut ev = Event::new(EventKind::ServerExited)
            .with_server(Arc::clone(&self.name))
            .with_pid(self.pid)
            .with_expected(expected || self.stop.is_cancelled());

        match status {
            Ok(status) => {
                if let Some(code) = status.code() {
                    ev = ev.with_exit_code(code);
                }
                if let Some(signal) = exit_signal(&status) {
                    ev = ev.with_reason(format!("terminated by signal {signal}"));
                }
            }
            Err(e) => {
                ev = ev.with_reason(format!("wait failed: {e}"));
            }
        }
        self.bus.publish(ev);
    }

    /// Removes the registry entry, but only if it still belongs to this process.
    async fn cleanup(&self) {
        let mut entries = self.entries.lock().await;
        let owned = entries
            .get(self.name.as_ref())
            .is_some_and(|h| h.id() == self.id);
        if !owned {
            return;
        }
        if let Some(mut handle) = entries.remove(self.name.as_ref()) {
            handle.mark_exited();
            let info = handle.info();
            debug!(server = %self.name, uptime = ?info.uptime, "removed exited server from registry");
        }
    }
}

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Forwards one output stream to the log as chunks arrive, tagged with the server name.
async fn forward_output<R>(server: Arc<str>, stream: Stream, mut reader: R)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; OUTPUT_CHUNK];
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!(server = %server, error = %e, "output stream closed with error");
                break;
            }
        };
        let chunk = String::from_utf8_lossy(&buf[..n]);
        for line in chunk.split_terminator('\n') {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            match stream {
                Stream::Stdout => info!(target: OUTPUT_TARGET, server = %server, "{line}"),
                Stream::Stderr => warn!(target: OUTPUT_TARGET, server = %server, "{line}"),
            }
        }
    }
}

/// Requests termination: SIGTERM on Unix, hard kill otherwise or as a fallback.
fn terminate(child: &mut Child, name: &str) {
    #[cfg(unix)]
    if let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        match kill(Pid::from_raw(pid), Signal::SIGTERM) {
            Ok(()) => return,
            Err(e) => warn!(server = %name, pid, error = %e, "SIGTERM failed, killing"),
        }
    }
    if let Err(e) = child.start_kill() {
        warn!(server = %name, error = %e, "failed to kill server process");
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

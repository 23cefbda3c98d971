#![cfg(unix)]

mod common;

use std::io;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use common::{eventually, exited, next_matching, sh};
use mcpvisor::{Bus, ConfigStore, LaunchDescriptor, Registry};

const WAIT: Duration = Duration::from_secs(5);

/// In-memory sink for the fmt layer.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn line_with(&self, needle: &str) -> Option<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .find(|l| l.contains(needle))
            .map(str::to_owned)
    }
}

/// Installs the capturing subscriber once for this test binary.
fn log() -> &'static Captured {
    static LOG: OnceLock<Captured> = OnceLock::new();
    LOG.get_or_init(|| {
        let log = Captured::default();
        let writer = log.clone();
        tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .init();
        log
    })
}

fn registry(entries: Vec<(&str, LaunchDescriptor)>) -> Arc<Registry> {
    let store = ConfigStore::from_entries(entries).unwrap();
    Registry::new(Arc::new(store), Bus::new(64))
}

fn assert_output_line(line: &str, level: &str, server: &str) {
    assert!(line.contains(level), "wrong level: {line}");
    assert!(line.contains("mcpvisor::output"), "wrong target: {line}");
    assert!(line.contains(&format!("server={server}")), "missing server: {line}");
}

#[tokio::test]
async fn partial_output_is_forwarded_while_running() {
    let log = log();
    let reg = registry(vec![(
        "partial",
        sh("printf PARTIAL_STDOUT_9f1; printf PARTIAL_STDERR_9f1 >&2; exec sleep 5"),
    )]);

    reg.start("partial").await.unwrap();

    let both = eventually(WAIT, || async {
        log.line_with("PARTIAL_STDOUT_9f1").is_some()
            && log.line_with("PARTIAL_STDERR_9f1").is_some()
    })
    .await;
    assert!(both, "output without a newline was held back");
    assert!(reg.is_running("partial").await);

    assert_output_line(&log.line_with("PARTIAL_STDOUT_9f1").unwrap(), "INFO", "partial");
    assert_output_line(&log.line_with("PARTIAL_STDERR_9f1").unwrap(), "WARN", "partial");

    reg.stop("partial").await.unwrap();
}

#[tokio::test]
async fn trailing_output_precedes_exit_event() {
    let log = log();
    let reg = registry(vec![(
        "chatty",
        sh("printf 'FIRST_LINE_4c2\\nSECOND_LINE_4c2\\nTAIL_4c2'"),
    )]);
    let mut rx = reg.bus().subscribe();

    reg.start("chatty").await.unwrap();
    next_matching(&mut rx, WAIT, exited("chatty")).await;

    let first = log.line_with("FIRST_LINE_4c2").unwrap();
    let second = log.line_with("SECOND_LINE_4c2").unwrap();
    let tail = log.line_with("TAIL_4c2").unwrap();

    // One record per line, even when the lines arrive in a single read.
    assert!(!first.contains("SECOND_LINE_4c2"));
    for line in [&first, &second, &tail] {
        assert_output_line(line, "INFO", "chatty");
    }
}

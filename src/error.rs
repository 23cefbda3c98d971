//! Error types used by the mcpvisor runtime.
//!
//! This module defines the error enums of the crate:
//!
//! - [`SupervisorError`]: failures of registry operations (`start`, `stop`, batches).
//! - [`ConfigError`]: failures while loading the configuration store at startup.
//! - [`RuntimeError`]: failures of the hosting runtime itself (bind, serve, shutdown).
//!
//! Each type provides `as_label` for logs; [`SupervisorError`] additionally
//! knows whether it should be surfaced to callers as "not found".

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced by registry operations.
///
/// These are always recovered at the registry boundary: they are returned to
/// the caller of the specific operation and published on the event bus, but
/// never terminate the supervisor.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// The name is not present in the configuration store.
    #[error("server '{name}' is not configured")]
    UnknownServer {
        /// Requested logical name.
        name: String,
    },

    /// The OS refused to spawn the configured command (missing executable, permissions, ...).
    #[error("failed to launch server '{name}': {source}")]
    LaunchFailure {
        /// Logical name of the server.
        name: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The supervisor is shutting down and no longer launches servers.
    #[error("supervisor is shutting down; '{name}' not started")]
    ShuttingDown {
        /// Logical name of the server.
        name: String,
    },

    /// One or more items of a best-effort batch failed.
    #[error("{} server(s) failed: {failed:?}; first error: {first}", .failed.len())]
    Batch {
        /// Names that failed, in batch order.
        failed: Vec<String>,
        /// Message of the first failure.
        first: String,
    },
}

impl SupervisorError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use mcpvisor::SupervisorError;
    ///
    /// let err = SupervisorError::UnknownServer { name: "zotero".into() };
    /// assert_eq!(err.as_label(), "unknown_server");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SupervisorError::UnknownServer { .. } => "unknown_server",
            SupervisorError::LaunchFailure { .. } => "launch_failure",
            SupervisorError::ShuttingDown { .. } => "shutting_down",
            SupervisorError::Batch { .. } => "batch_failure",
        }
    }

    /// Indicates whether the error means "no such server".
    pub fn is_not_found(&self) -> bool {
        matches!(self, SupervisorError::UnknownServer { .. })
    }
}

/// # Errors produced while loading the configuration store.
///
/// Loading happens once at startup; any of these is fatal.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file is missing or unreadable.
    #[error("cannot read config {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON or has the wrong shape.
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A server entry is structurally valid JSON but unusable.
    #[error("invalid server '{name}': {reason}")]
    InvalidServer {
        /// Logical name of the offending entry.
        name: String,
        /// What is wrong with it.
        reason: &'static str,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Io { .. } => "config_io",
            ConfigError::Parse(_) => "config_parse",
            ConfigError::InvalidServer { .. } => "config_invalid_server",
        }
    }
}

/// # Errors produced by the hosting runtime.
///
/// These represent failures of the supervisor process itself,
/// such as a shutdown sequence exceeding its grace period.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some children were still being watched.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Servers whose processes had not exited in time.
        stuck: Vec<String>,
    },

    /// The control API listener could not be bound.
    #[error("cannot bind control api on {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The control API server failed while serving.
    #[error("control api failed: {0}")]
    Serve(#[source] std::io::Error),

    /// OS signal handlers could not be installed.
    #[error("cannot install signal handlers: {0}")]
    Signal(#[source] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use mcpvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Bind { .. } => "runtime_bind",
            RuntimeError::Serve(_) => "runtime_serve",
            RuntimeError::Signal(_) => "runtime_signal",
        }
    }
}

//! # mcpvisor
//!
//! **mcpvisor** supervises a fixed set of named, long-running child processes
//! (typically stdio MCP servers) and exposes start/stop/status over HTTP.
//!
//! Servers are declared once in a JSON configuration store. The supervisor
//! launches them on demand, remembers which ones it believes are running,
//! forwards their output to the log and stops all of them when it is asked to
//! terminate. There is no automatic restart and no health probing: a process
//! that exits on its own is simply removed from the registry.
//!
//! ## Architecture
//! ```text
//!   mcp_config.json
//!          │ ConfigStore::load
//!          ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                       │
//! │  - Registry (name → live process, the only "is running" truth)    │
//! │  - Bus (broadcast events)                                         │
//! │  - SubscriberSet (fans out to subscribers, e.g. LogWriter)        │
//! └──────┬──────────────────────────┬──────────────────────────┬──────┘
//!        │                          │                          │
//!        ▼                          ▼                          ▼
//!   Control API (axum)        autostart task            shutdown signal
//!   GET  /api/servers         sleep(delay)              SIGINT / SIGTERM
//!   POST .../{name}/start     └─► start_all()           └─► stop_all()
//!   POST .../{name}/stop                                    └─► wait ≤ grace
//!   POST .../start-all
//!   POST .../stop-all
//!        │
//!        ▼
//!   Registry::start(name) ──► spawn child ──► Watcher (one per child)
//!                                               ├─ stdout/stderr → tracing
//!                                               └─ exit → ServerExited,
//!                                                  remove entry iff same handle
//! ```
//!
//! ## Features
//! | Area              | Description                                             | Key types                                |
//! |-------------------|---------------------------------------------------------|------------------------------------------|
//! | **Configuration** | Server launch descriptors and runtime settings.         | [`ConfigStore`], [`SupervisorConfig`]    |
//! | **Registry**      | Idempotent start/stop, best-effort batches, snapshots.  | [`Registry`], [`Status`], [`BatchReport`]|
//! | **Control API**   | HTTP/JSON boundary over the registry.                   | [`router`]                               |
//! | **Events**        | Lifecycle events and subscriber fan-out.                | [`Event`], [`Subscribe`], [`LogWriter`]  |
//! | **Errors**        | Typed errors for operations, config and runtime.        | [`SupervisorError`], [`RuntimeError`]    |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use mcpvisor::{Bus, ConfigStore, LaunchDescriptor, Registry};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = ConfigStore::from_entries(vec![
//!         ("zotero", LaunchDescriptor::new("zotero-mcp").with_args(["--stdio"])),
//!     ])?;
//!     let registry = Registry::new(Arc::new(store), Bus::new(64));
//!
//!     assert!(registry.start("unknown").await.is_err());
//!     assert_eq!(registry.status().await.configured, vec!["zotero"]);
//!     Ok(())
//! }
//! ```

pub mod api;
mod config;
mod core;
mod error;
pub mod events;
pub mod subscribers;

// ---- Public re-exports ----

pub use api::{ApiError, router};
pub use config::{ConfigStore, LaunchDescriptor, SupervisorConfig};
pub use core::{
    BatchReport, ProcessState, Registry, ServerInfo, Status, Supervisor, SupervisorBuilder,
    wait_for_shutdown_signal,
};
pub use error::{ConfigError, RuntimeError, SupervisorError};
pub use events::{Bus, Event, EventKind};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};

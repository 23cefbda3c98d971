//! Runtime core: process registry and lifecycle.
//!
//! Internal modules:
//! - [`handle`]: registry-side view of one launched child;
//! - [`watcher`]: launches a child and observes it until exit;
//! - [`registry`]: name → live process map with start/stop/batch operations;
//! - [`status`]: registry snapshots and batch outcomes;
//! - [`shutdown`]: signal handling and the bounded drain on exit;
//! - [`supervisor`]: hosts the registry, the control API and subscribers.

mod builder;
mod handle;
mod registry;
mod shutdown;
mod status;
mod supervisor;
mod watcher;

pub use builder::SupervisorBuilder;
pub use handle::{ProcessState, ServerInfo};
pub use registry::Registry;
pub use shutdown::wait_for_shutdown_signal;
pub use status::{BatchReport, Status};
pub use supervisor::Supervisor;

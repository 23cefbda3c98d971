//! Configuration: what can be launched and how the supervisor behaves.
//!
//! - [`ConfigStore`], [`LaunchDescriptor`]: name → launch descriptor, loaded once
//! - [`SupervisorConfig`]: runtime settings (grace, bus capacity, auto start)

mod runtime;
mod store;

pub use runtime::SupervisorConfig;
pub use store::{ConfigStore, LaunchDescriptor};

//! # Event subscribers for the mcpvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and
//! built-in implementations for handling runtime events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Registry / watchers ── publish(Event) ──► Bus ──► subscriber_listener
//!                                                          │
//!                                                          ▼
//!                                                   SubscriberSet::emit
//!                                                  ┌───────┼────────┐
//!                                                  ▼       ▼        ▼
//!                                              LogWriter  Custom   ...
//! ```

mod embedded;
mod set;
mod subscribe;

pub use embedded::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;

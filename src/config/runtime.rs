//! # Runtime configuration.
//!
//! Provides [`SupervisorConfig`] centralized settings for the supervisor runtime.
//!
//! Unlike the [`ConfigStore`](crate::ConfigStore), which describes *what* can be
//! launched, this struct describes *how* the supervisor itself behaves: event
//! bus sizing, auto start after boot and the shutdown grace period.
//!
//! ## Sentinel values
//! - `grace = 0s` → do not wait for children after stop-all
//! - `autostart_delay = 0s` → start-all runs as soon as the listener is bound

use std::time::Duration;

/// Global configuration for the supervisor runtime.
///
/// ## Field semantics
/// - `grace`: Maximum wait for child watchers after stop-all on shutdown
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `autostart`: Run start-all once the control API is listening
/// - `autostart_delay`: Delay between listener bind and auto start
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Maximum time to wait for child processes to exit during shutdown.
    ///
    /// When a shutdown signal is received:
    /// - every registered server is asked to stop
    /// - the supervisor waits up to `grace` for their watchers to observe exit
    /// - if time runs out, `RuntimeError::GraceExceeded` is returned
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items. Minimum value is 1 (enforced by Bus).
    pub bus_capacity: usize,

    /// Whether to start every configured server after boot.
    pub autostart: bool,

    /// Delay before the boot-time start-all.
    pub autostart_delay: Duration,
}

impl SupervisorConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the auto start delay if auto start is enabled.
    ///
    /// - `None` → auto start disabled
    /// - `Some(d)` → run start-all `d` after the listener is bound
    #[inline]
    pub fn autostart_after(&self) -> Option<Duration> {
        self.autostart.then_some(self.autostart_delay)
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `grace = 5s`
    /// - `bus_capacity = 1024`
    /// - `autostart = true`
    /// - `autostart_delay = 1s`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(5),
            bus_capacity: 1024,
            autostart: true,
            autostart_delay: Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_clamped() {
        let cfg = SupervisorConfig {
            bus_capacity: 0,
            ..SupervisorConfig::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }

    #[test]
    fn autostart_can_be_disabled() {
        let mut cfg = SupervisorConfig::default();
        assert_eq!(cfg.autostart_after(), Some(Duration::from_secs(1)));

        cfg.autostart = false;
        assert_eq!(cfg.autostart_after(), None);
    }
}

//! Configuration for the simulation manager.

use std::time::Duration;

/// Configuration for a [`Manager`](crate::Manager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Fixed base tick. When unset, the base tick is the greatest common
    /// divisor of all scheduled periods. Every period must be a multiple of
    /// an explicit resolution.
    pub resolution: Option<Duration>,
    /// Upper bound on events dispatched within one tick, including events
    /// emitted by watch handlers during dispatch.
    pub max_dispatch_per_tick: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            resolution: None,
            max_dispatch_per_tick: 10_000,
        }
    }
}

impl ManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an explicit base tick. A zero resolution is ignored.
    pub fn with_resolution(mut self, resolution: Duration) -> Self {
        self.resolution = Some(resolution).filter(|r| !r.is_zero());
        self
    }

    pub fn with_max_dispatch_per_tick(mut self, limit: usize) -> Self {
        self.max_dispatch_per_tick = limit;
        self
    }
}

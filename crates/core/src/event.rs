//! Named, valued, timestamped events carried by the event bus.

use std::fmt;
use std::time::Duration;

/// Name of the synthetic event passed to a state's `entry` hook when a
/// state machine starts.
pub const START_EVENT: &str = "start";

/// An immutable event record.
///
/// Events are **passive data**: they describe something that happened.
/// Dispatch matches on the name only; two events with the same name are still
/// distinct instances.
///
/// The timestamp is assigned by the kernel when the event is emitted, so a
/// freshly constructed event carries `Duration::ZERO`.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    name: String,
    value: f64,
    timestamp: Duration,
}

impl Event {
    /// Create an event with the default value of zero.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_value(name, 0.0)
    }

    /// Create an event carrying a value.
    pub fn with_value(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            timestamp: Duration::ZERO,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Virtual time at which the event was emitted.
    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    /// Emission time in whole milliseconds.
    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp.as_millis() as u64
    }

    /// Copy of this event stamped with the emission time.
    pub(crate) fn stamped(self, at: Duration) -> Self {
        Self {
            timestamp: at,
            ..self
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={} @{}ms",
            self.name,
            self.value,
            self.timestamp.as_millis()
        )
    }
}

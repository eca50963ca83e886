//! Deterministic lock-step simulation of tickwork processes.
//!
//! The [`Manager`] owns every process, channel and watcher, and drives them
//! in virtual time:
//!
//! ```text
//! init ─▶ start ─▶ [ tick: update due processes ─▶ dispatch events ]* ─▶ stop
//! ```
//!
//! Virtual time advances in fixed base ticks, so a run is reproducible: the
//! same registrations always yield the same channel histories and event
//! deliveries.

mod config;
mod runner;

pub use config::ManagerConfig;
pub use runner::{Manager, ManagerPhase, SimulationStats};

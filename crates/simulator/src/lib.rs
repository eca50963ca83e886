//! Drive-my-car: a demo scenario for the tickwork kernel.
//!
//! A car with a six-speed gearbox (or a brake drivetrain), a cruise
//! controller following a fickle driver, optional seeded wind gusts, turn
//! signals and a drive-mode state machine, all scheduled on one manager.
//!
//! ```text
//! Driver ──"desired speed"──▶ CruiseControl ──Throttle──▶ Gearbox ──Velocity──▶ CruiseControl, Car
//! Car ──"change gear"──▶ Gearbox ◀──Wind── Wind
//! Timeline ──buttons──▶ TurnSignal ──"left on", "light on"──▶ SignalLights
//! Timeline ──"key in", "fuel low"──▶ Drive
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use tickwork_simulator::{scenario, ScenarioConfig};
//!
//! let report = scenario::run(&ScenarioConfig::default(), Duration::from_secs(40))?;
//! println!("final velocity: {:.2}", report.final_velocity);
//! # Ok::<(), tickwork_simulator::ScenarioError>(())
//! ```

mod config;
mod control;
pub mod drive;
mod drivetrain;
mod error;
pub mod scenario;
pub mod signals;
mod timeline;
mod wind;

pub use config::{default_timeline, CarConfig, ScenarioConfig, WindConfig};
pub use control::{CruiseControl, Driver};
pub use drive::{drive_machine, DriveState};
pub use drivetrain::{Brake, Car, GearPosition, Gearbox, TOP_GEAR};
pub use error::ScenarioError;
pub use scenario::ScenarioReport;
pub use signals::{turn_signal, SignalLights, SignalState};
pub use timeline::Timeline;
pub use wind::Wind;

/// Throttle force from the cruise controller.
pub const THROTTLE: &str = "Throttle";
/// Car velocity from the drivetrain.
pub const VELOCITY: &str = "Velocity";
/// Wind force, present only when wind is enabled.
pub const WIND: &str = "Wind";

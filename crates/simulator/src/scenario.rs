//! Assembling and running the drive-my-car scenario.

use crate::{
    drive_machine, turn_signal, Brake, Car, CruiseControl, Driver, GearPosition, Gearbox,
    ScenarioConfig, ScenarioError, SignalLights, Timeline, Wind, THROTTLE, VELOCITY, WIND,
};
use std::time::Duration;
use tickwork_core::{Channel, StateMachine};
use tickwork_simulation::{Manager, ManagerConfig, SimulationStats};
use tracing::info;

/// Register every process and channel of the scenario and initialize the
/// manager. The returned manager is ready to `run`.
pub fn build(config: &ScenarioConfig) -> Result<Manager, ScenarioError> {
    config.validate()?;

    let mut manager_config = ManagerConfig::new();
    if let Some(resolution) = config.resolution {
        manager_config = manager_config.with_resolution(resolution);
    }
    let mut manager = Manager::with_config(manager_config);
    let tick = config.tick;

    manager
        .schedule(Timeline::new(config.timeline.clone()), tick)?
        .schedule(Car::new(), tick)?;

    if let Some(wind) = &config.wind {
        manager
            .schedule(Wind::new(wind.clone(), config.seed), wind.period)?
            .add_channel(Channel::new(WIND))?;
    }

    if config.use_brake {
        manager.schedule(Brake::new(config.car.clone()), tick)?;
    } else {
        manager.schedule(Gearbox::new(config.car.clone()), tick)?;
    }

    manager
        .schedule(CruiseControl::new(config.kp), tick)?
        .schedule(
            Driver::new(config.low_speed, config.high_speed),
            config.driver_period,
        )?
        .schedule(turn_signal()?, tick)?
        .schedule(SignalLights::new(), tick)?
        .schedule(drive_machine()?, tick)?
        .add_channel(Channel::new(THROTTLE))?
        .add_channel(Channel::new(VELOCITY))?
        .init()?;

    info!(
        brake = config.use_brake,
        wind = config.wind.is_some(),
        seed = config.seed,
        processes = manager.process_names().count(),
        "Scenario assembled"
    );
    Ok(manager)
}

/// Build the scenario, run it for `duration` and summarize the outcome.
pub fn run(config: &ScenarioConfig, duration: Duration) -> Result<ScenarioReport, ScenarioError> {
    let mut manager = build(config)?;
    manager.run(duration)?;
    ScenarioReport::collect(&manager)
}

/// Outcome of a scenario run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioReport {
    /// Virtual time the run ended at.
    pub end_time: Duration,
    /// Last velocity sent, zero if none was.
    pub final_velocity: f64,
    pub peak_velocity: f64,
    pub mean_velocity: f64,
    pub velocity_samples: usize,
    pub gear: GearPosition,
    pub drive_mode: String,
    pub turn_signal: String,
    pub blinks: u32,
    pub stats: SimulationStats,
}

impl ScenarioReport {
    /// Read the report off a manager that has run the scenario.
    pub fn collect(manager: &Manager) -> Result<Self, ScenarioError> {
        let velocity = manager.channel(VELOCITY)?.values();
        let final_velocity = velocity.last().copied().unwrap_or(0.0);
        let peak_velocity = velocity.iter().copied().fold(0.0, f64::max);
        let mean_velocity = if velocity.is_empty() {
            0.0
        } else {
            velocity.iter().sum::<f64>() / velocity.len() as f64
        };

        let gear = match manager.process::<Gearbox>("Gear") {
            Some(gearbox) => gearbox.position(),
            None => manager
                .process::<Brake>("Brake")
                .map(Brake::position)
                .ok_or_else(|| ScenarioError::MissingProcess("Gear".to_string()))?,
        };

        let lights = manager
            .process::<SignalLights>("Signals")
            .ok_or_else(|| ScenarioError::MissingProcess("Signals".to_string()))?;

        Ok(Self {
            end_time: manager.now(),
            final_velocity,
            peak_velocity,
            mean_velocity,
            velocity_samples: velocity.len(),
            gear,
            drive_mode: current_state(manager, "Drive")?,
            turn_signal: current_state(manager, "TurnSignal")?,
            blinks: lights.blinks(),
            stats: manager.stats().clone(),
        })
    }
}

fn current_state(manager: &Manager, machine: &str) -> Result<String, ScenarioError> {
    let machine = manager
        .process::<StateMachine>(machine)
        .ok_or_else(|| ScenarioError::MissingProcess(machine.to_string()))?;
    Ok(machine.current_state().unwrap_or("-").to_string())
}

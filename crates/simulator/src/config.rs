//! Scenario configuration.

use crate::ScenarioError;
use std::time::Duration;
use tickwork_core::Event;

/// Physical parameters of the car.
#[derive(Debug, Clone, PartialEq)]
pub struct CarConfig {
    /// Mass in kg.
    pub mass: f64,
    /// Linear drag coefficient.
    pub drag: f64,
    /// Velocity is clamped to this limit (kph).
    pub speed_limit: f64,
    /// Speed band covered by each forward gear (kph).
    pub gear_step: f64,
    /// Braking force applied by the brake drivetrain (N).
    pub brake_force: f64,
    /// Speed the brake drivetrain starts from when no velocity is known yet.
    pub brake_initial_speed: f64,
}

impl Default for CarConfig {
    fn default() -> Self {
        Self {
            mass: 1000.0,
            drag: 0.02,
            speed_limit: 60.0,
            gear_step: 10.0,
            brake_force: 4000.0,
            brake_initial_speed: 60.0,
        }
    }
}

impl CarConfig {
    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_speed_limit(mut self, limit: f64) -> Self {
        self.speed_limit = limit;
        self
    }

    pub fn with_brake_force(mut self, force: f64) -> Self {
        self.brake_force = force;
        self
    }
}

/// Random gusts pushing on the car.
#[derive(Debug, Clone, PartialEq)]
pub struct WindConfig {
    /// Largest gust force in either direction (N).
    pub max_gust: f64,
    /// Weight of a new gust against the current force (0.0 - 1.0).
    pub gustiness: f64,
    /// How often the wind changes.
    pub period: Duration,
}

impl Default for WindConfig {
    fn default() -> Self {
        Self {
            max_gust: 300.0,
            gustiness: 0.3,
            period: Duration::from_millis(500),
        }
    }
}

/// Everything needed to assemble the drive-my-car scenario.
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub car: CarConfig,
    /// Proportional gain of the cruise controller.
    pub kp: f64,
    /// The driver alternates between these two speeds (kph).
    pub low_speed: f64,
    pub high_speed: f64,
    /// Period of the drivetrain, controller and signal processes.
    pub tick: Duration,
    /// Period of the driver changing their mind.
    pub driver_period: Duration,
    /// Schedule the brake drivetrain instead of the gearbox.
    pub use_brake: bool,
    /// Enable wind gusts.
    pub wind: Option<WindConfig>,
    /// Seed for every random source in the scenario.
    pub seed: u64,
    /// Explicit base tick for the manager.
    pub resolution: Option<Duration>,
    /// Scripted events: ignition, turn signals, refuelling.
    pub timeline: Vec<(Duration, Event)>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            car: CarConfig::default(),
            kp: 314.15,
            low_speed: 50.0,
            high_speed: 60.0,
            tick: Duration::from_millis(100),
            driver_period: Duration::from_secs(5),
            use_brake: false,
            wind: None,
            seed: 42,
            resolution: None,
            timeline: default_timeline(),
        }
    }
}

impl ScenarioConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_car(mut self, car: CarConfig) -> Self {
        self.car = car;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_brake(mut self, use_brake: bool) -> Self {
        self.use_brake = use_brake;
        self
    }

    pub fn with_wind(mut self, wind: WindConfig) -> Self {
        self.wind = Some(wind);
        self
    }

    pub fn with_resolution(mut self, resolution: Duration) -> Self {
        self.resolution = Some(resolution);
        self
    }

    pub fn with_speeds(mut self, low: f64, high: f64) -> Self {
        self.low_speed = low;
        self.high_speed = high;
        self
    }

    pub fn with_timeline(mut self, timeline: Vec<(Duration, Event)>) -> Self {
        self.timeline = timeline;
        self
    }

    /// Reject configurations the physics cannot run with.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let invalid = |reason: &str| Err(ScenarioError::InvalidConfig(reason.to_string()));

        if self.car.mass <= 0.0 {
            return invalid("car mass must be positive");
        }
        if self.car.gear_step <= 0.0 {
            return invalid("gear step must be positive");
        }
        if self.car.brake_force < 0.0 {
            return invalid("brake force must not be negative");
        }
        if self.low_speed > self.high_speed {
            return invalid("low speed exceeds high speed");
        }
        if self.tick.is_zero() || self.driver_period.is_zero() {
            return invalid("periods must be non-zero");
        }
        if let Some(wind) = &self.wind {
            if wind.max_gust < 0.0 {
                return invalid("wind gust must not be negative");
            }
            if !(0.0..=1.0).contains(&wind.gustiness) {
                return invalid("gustiness must be within 0.0 - 1.0");
            }
            if wind.period.is_zero() {
                return invalid("periods must be non-zero");
            }
        }
        Ok(())
    }
}

/// Ignition, a drive with turn signals, a refuelling stop and a breakdown.
pub fn default_timeline() -> Vec<(Duration, Event)> {
    let at = Duration::from_secs;
    vec![
        (at(1), Event::new("key in")),
        (at(2), Event::new("start drive")),
        (at(8), Event::with_value("left signal button on", 100.0)),
        (at(12), Event::new("signal button off")),
        (at(18), Event::with_value("emergency signal button on", 80.0)),
        (at(22), Event::new("signal button off")),
        (at(24), Event::new("fuel low")),
        (at(26), Event::new("find gas station")),
        (at(28), Event::new("fuel full")),
        (at(29), Event::new("key in")),
        (at(30), Event::new("start drive")),
        (at(34), Event::with_value("right signal button on", 100.0)),
        (at(36), Event::new("signal button off")),
        (at(37), Event::new("issue")),
        (at(38), Event::new("find issue")),
        (at(39), Event::new("issue fixed")),
    ]
}

//! The car, its gearbox and the brake drivetrain.
//!
//! Velocity follows `v += dt * (force - drag * v) / mass`, integrated once
//! per update with `dt` the process period in seconds. The drivetrain that
//! owns the integration publishes velocity on [`VELOCITY`] and its gear as a
//! `"gear"` event.

use crate::{CarConfig, THROTTLE, VELOCITY, WIND};
use std::fmt;
use tickwork_core::{Context, Event, InitContext, KernelError, Process};
use tracing::debug;

/// Highest forward gear.
pub const TOP_GEAR: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GearPosition {
    Park,
    Forward(u8),
}

impl GearPosition {
    /// Numeric form carried by `"gear"` events. Park is zero.
    pub fn value(self) -> f64 {
        match self {
            GearPosition::Park => 0.0,
            GearPosition::Forward(n) => f64::from(n),
        }
    }

    /// The gear a car moving at `velocity` is in, for gears `step` kph wide.
    pub fn for_speed(velocity: f64, step: f64) -> Self {
        let band = (velocity / step).ceil().clamp(1.0, f64::from(TOP_GEAR) + 1.0) as u8;
        GearPosition::Forward(band.saturating_sub(1).max(1))
    }
}

impl fmt::Display for GearPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GearPosition::Park => write!(f, "P"),
            GearPosition::Forward(n) => write!(f, "{n}"),
        }
    }
}

fn integrate(car: &CarConfig, velocity: f64, force: f64, dt: f64) -> f64 {
    velocity + dt * (force - car.drag * velocity) / car.mass
}

/// Reads the latest value of `name`, if it has one.
fn latest(ctx: &mut Context<'_>, name: &str) -> Result<Option<f64>, KernelError> {
    let channel = ctx.channel(name)?;
    if channel.nonempty() {
        channel.latest().map(Some)
    } else {
        Ok(None)
    }
}

/// Asks the gearbox to engage on every update, reporting the current speed.
#[derive(Debug, Default)]
pub struct Car {
    speed: f64,
}

impl Car {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }
}

impl Process for Car {
    fn name(&self) -> &str {
        "Car"
    }

    fn start(&mut self, _ctx: &mut Context<'_>) -> Result<(), KernelError> {
        self.speed = 0.0;
        Ok(())
    }

    fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), KernelError> {
        if let Some(speed) = latest(ctx, VELOCITY)? {
            self.speed = speed;
        }
        ctx.emit(Event::with_value("change gear", self.speed));
        Ok(())
    }
}

/// Six-speed gearbox that integrates velocity from the throttle.
///
/// The car starts in park with both brakes set. Leaving park requires the
/// car to be running (a `"change gear"` event has arrived) while both brakes
/// are set, and releases them. While either brake is set in gear, the
/// throttle is ignored and the gear is held.
#[derive(Debug)]
pub struct Gearbox {
    car: CarConfig,
    position: GearPosition,
    velocity: f64,
    force: f64,
    wind: f64,
    running: bool,
    brake_on: bool,
    hand_brake: bool,
    shifts: u32,
}

impl Gearbox {
    pub fn new(car: CarConfig) -> Self {
        Self {
            car,
            position: GearPosition::Park,
            velocity: 0.0,
            force: 0.0,
            wind: 0.0,
            running: false,
            brake_on: true,
            hand_brake: true,
            shifts: 0,
        }
    }

    pub fn position(&self) -> GearPosition {
        self.position
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn shifts(&self) -> u32 {
        self.shifts
    }

    pub fn is_braked(&self) -> bool {
        self.brake_on || self.hand_brake
    }

    fn shift(&mut self) {
        let next = match self.position {
            GearPosition::Park if self.running && self.brake_on && self.hand_brake => {
                self.brake_on = false;
                self.hand_brake = false;
                GearPosition::Forward(1)
            }
            GearPosition::Forward(n) if !self.is_braked() => {
                let step = self.car.gear_step;
                if n < TOP_GEAR && self.velocity >= step * f64::from(n) {
                    GearPosition::Forward(n + 1)
                } else if n > 1 && self.velocity < step * f64::from(n - 1) {
                    GearPosition::Forward(n - 1)
                } else {
                    return;
                }
            }
            _ => return,
        };

        debug!(from = %self.position, to = %next, velocity = self.velocity, "Gear change");
        self.position = next;
        self.shifts += 1;
    }
}

impl Process for Gearbox {
    fn name(&self) -> &str {
        "Gear"
    }

    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), KernelError> {
        ctx.watch("change gear", |this: &mut Self, _: &Event, _: &mut Context<'_>| {
            this.running = true;
            Ok(())
        })?;
        ctx.watch("brake on", |this: &mut Self, _: &Event, _: &mut Context<'_>| {
            this.brake_on = true;
            Ok(())
        })?;
        ctx.watch("hand brake", |this: &mut Self, _: &Event, _: &mut Context<'_>| {
            this.hand_brake = true;
            Ok(())
        })
    }

    fn start(&mut self, _ctx: &mut Context<'_>) -> Result<(), KernelError> {
        *self = Self::new(self.car.clone());
        Ok(())
    }

    fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), KernelError> {
        if let Some(force) = latest(ctx, THROTTLE)? {
            self.force = force;
        }
        if ctx.has_channel(WIND) {
            if let Some(wind) = latest(ctx, WIND)? {
                self.wind = wind;
            }
        }

        self.shift();

        let dt = ctx.delta().as_secs_f64();
        let force = match self.position {
            GearPosition::Park => 0.0,
            GearPosition::Forward(_) if self.is_braked() => self.wind,
            GearPosition::Forward(_) => self.force + self.wind,
        };
        self.velocity = integrate(&self.car, self.velocity, force, dt).min(self.car.speed_limit);

        ctx.emit(Event::with_value("gear", self.position.value()));
        ctx.channel(VELOCITY)?.send(self.velocity);
        Ok(())
    }
}

/// Drivetrain that brakes the car down from speed and parks it.
///
/// Braking ignores the throttle. After a `"release brake"` event the
/// throttle drives the car again; a `"brake"` event re-applies the brake.
#[derive(Debug)]
pub struct Brake {
    car: CarConfig,
    engaged: bool,
    velocity: f64,
    force: f64,
    position: GearPosition,
}

impl Brake {
    pub fn new(car: CarConfig) -> Self {
        Self {
            car,
            engaged: true,
            velocity: 0.0,
            force: 0.0,
            position: GearPosition::Park,
        }
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn position(&self) -> GearPosition {
        self.position
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }
}

impl Process for Brake {
    fn name(&self) -> &str {
        "Brake"
    }

    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), KernelError> {
        ctx.watch("brake", |this: &mut Self, _: &Event, _: &mut Context<'_>| {
            this.engaged = true;
            Ok(())
        })?;
        ctx.watch("release brake", |this: &mut Self, _: &Event, _: &mut Context<'_>| {
            this.engaged = false;
            Ok(())
        })
    }

    fn start(&mut self, ctx: &mut Context<'_>) -> Result<(), KernelError> {
        self.engaged = true;
        self.force = 0.0;
        self.velocity = latest(ctx, VELOCITY)?.unwrap_or(self.car.brake_initial_speed);
        self.position = GearPosition::for_speed(self.velocity, self.car.gear_step);
        Ok(())
    }

    fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), KernelError> {
        if let Some(force) = latest(ctx, THROTTLE)? {
            self.force = force;
        }

        let dt = ctx.delta().as_secs_f64();
        if self.engaged && self.velocity <= self.car.gear_step {
            if self.position != GearPosition::Park {
                debug!(velocity = self.velocity, "Car stopped");
            }
            self.velocity = 0.0;
            self.position = GearPosition::Park;
        } else {
            let force = if self.engaged {
                -self.car.brake_force
            } else {
                self.force
            };
            self.velocity = integrate(&self.car, self.velocity, force, dt)
                .clamp(0.0, self.car.speed_limit);
            self.position = GearPosition::for_speed(self.velocity, self.car.gear_step);
        }

        ctx.emit(Event::with_value("gear", self.position.value()));
        ctx.channel(VELOCITY)?.send(self.velocity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gear_for_speed() {
        let step = 10.0;
        assert_eq!(GearPosition::for_speed(0.0, step), GearPosition::Forward(1));
        assert_eq!(GearPosition::for_speed(15.0, step), GearPosition::Forward(1));
        assert_eq!(GearPosition::for_speed(25.0, step), GearPosition::Forward(2));
        assert_eq!(GearPosition::for_speed(55.0, step), GearPosition::Forward(5));
        assert_eq!(GearPosition::for_speed(500.0, step), GearPosition::Forward(TOP_GEAR));
    }

    #[test]
    fn test_gear_display_and_value() {
        assert_eq!(GearPosition::Park.to_string(), "P");
        assert_eq!(GearPosition::Forward(3).to_string(), "3");
        assert_eq!(GearPosition::Park.value(), 0.0);
        assert_eq!(GearPosition::Forward(4).value(), 4.0);
    }

    #[test]
    fn test_integrate() {
        let car = CarConfig::default();
        // One second of 1000 N on a 1000 kg car at rest.
        assert_eq!(integrate(&car, 0.0, 1000.0, 1.0), 1.0);
        // Drag slows a coasting car.
        assert!(integrate(&car, 50.0, 0.0, 1.0) < 50.0);
    }

    #[test]
    fn test_gearbox_shift_rules() {
        let mut gearbox = Gearbox::new(CarConfig::default());

        // Parked and not running: stays in park.
        gearbox.shift();
        assert_eq!(gearbox.position(), GearPosition::Park);

        gearbox.running = true;
        gearbox.shift();
        assert_eq!(gearbox.position(), GearPosition::Forward(1));
        assert!(!gearbox.is_braked());

        gearbox.velocity = 12.0;
        gearbox.shift();
        assert_eq!(gearbox.position(), GearPosition::Forward(2));

        // One shift per call.
        gearbox.velocity = 45.0;
        gearbox.shift();
        assert_eq!(gearbox.position(), GearPosition::Forward(3));

        gearbox.velocity = 5.0;
        gearbox.shift();
        assert_eq!(gearbox.position(), GearPosition::Forward(2));

        gearbox.brake_on = true;
        gearbox.shift();
        assert_eq!(gearbox.position(), GearPosition::Forward(2));
        assert_eq!(gearbox.shifts(), 4);
    }
}

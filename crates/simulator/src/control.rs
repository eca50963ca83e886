//! The cruise controller and the driver setting its target.

use crate::{THROTTLE, VELOCITY};
use tickwork_core::{Context, Event, InitContext, KernelError, Process};
use tracing::debug;

/// Proportional controller: throttle is `-kp * (speed - desired)`.
///
/// The desired speed arrives as `"desired speed"` events; speed is read from
/// the velocity channel and the last known value is kept when it is empty.
#[derive(Debug)]
pub struct CruiseControl {
    kp: f64,
    speed: f64,
    desired_speed: f64,
}

impl CruiseControl {
    pub fn new(kp: f64) -> Self {
        Self {
            kp,
            speed: 0.0,
            desired_speed: 0.0,
        }
    }

    pub fn desired_speed(&self) -> f64 {
        self.desired_speed
    }

    pub fn throttle(&self) -> f64 {
        -self.kp * (self.speed - self.desired_speed)
    }
}

impl Process for CruiseControl {
    fn name(&self) -> &str {
        "Control"
    }

    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), KernelError> {
        ctx.watch(
            "desired speed",
            |this: &mut Self, event: &Event, _: &mut Context<'_>| {
                this.desired_speed = event.value();
                Ok(())
            },
        )
    }

    fn start(&mut self, _ctx: &mut Context<'_>) -> Result<(), KernelError> {
        self.speed = 0.0;
        self.desired_speed = 0.0;
        Ok(())
    }

    fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), KernelError> {
        let velocity = ctx.channel(VELOCITY)?;
        if velocity.nonempty() {
            self.speed = velocity.latest()?;
        }
        let throttle = self.throttle();
        ctx.channel(THROTTLE)?.send(throttle);
        Ok(())
    }
}

/// A driver who keeps changing their mind between two speeds.
///
/// Announces `high` on start, then alternates on every update.
#[derive(Debug)]
pub struct Driver {
    low: f64,
    high: f64,
    desired_speed: f64,
}

impl Driver {
    pub fn new(low: f64, high: f64) -> Self {
        Self {
            low,
            high,
            desired_speed: high,
        }
    }

    pub fn desired_speed(&self) -> f64 {
        self.desired_speed
    }
}

impl Process for Driver {
    fn name(&self) -> &str {
        "Driver"
    }

    fn start(&mut self, ctx: &mut Context<'_>) -> Result<(), KernelError> {
        self.desired_speed = self.high;
        ctx.emit(Event::with_value("desired speed", self.desired_speed));
        Ok(())
    }

    fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), KernelError> {
        self.desired_speed = if self.desired_speed == self.low {
            self.high
        } else {
            self.low
        };
        debug!(desired_speed = self.desired_speed, now_ms = ctx.now_ms(), "Driver changed speed");
        ctx.emit(Event::with_value("desired speed", self.desired_speed));
        Ok(())
    }
}

//! Tests for deterministic simulation.
//!
//! Identical registrations must produce identical channel histories and
//! event deliveries, run after run.

use std::time::Duration;
use tickwork_core::{Channel, Context, Event, InitContext, KernelError, Process};
use tickwork_simulation::Manager;
use tracing_test::traced_test;

/// A small feedback loop: the plant integrates throttle into velocity, the
/// controller answers velocity with throttle and retargets on "setpoint".
struct Plant {
    velocity: f64,
}

impl Process for Plant {
    fn name(&self) -> &str {
        "Plant"
    }

    fn start(&mut self, _ctx: &mut Context<'_>) -> Result<(), KernelError> {
        self.velocity = 0.0;
        Ok(())
    }

    fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), KernelError> {
        let throttle = ctx.channel("Throttle")?;
        let force = if throttle.nonempty() {
            throttle.latest()?
        } else {
            0.0
        };
        let dt = ctx.delta().as_secs_f64();
        self.velocity += dt * (force - 0.5 * self.velocity);
        ctx.channel("Velocity")?.send(self.velocity);
        Ok(())
    }
}

struct Controller {
    target: f64,
}

impl Process for Controller {
    fn name(&self) -> &str {
        "Controller"
    }

    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), KernelError> {
        ctx.watch("setpoint", |this: &mut Self, e: &Event, _ctx: &mut Context<'_>| {
            this.target = e.value();
            Ok(())
        })
    }

    fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), KernelError> {
        let velocity = ctx.channel("Velocity")?;
        if velocity.nonempty() {
            let error = self.target - velocity.latest()?;
            ctx.channel("Throttle")?.send(2.0 * error);
        }
        Ok(())
    }
}

/// Alternates the setpoint between two values.
struct Operator {
    high: bool,
}

impl Process for Operator {
    fn name(&self) -> &str {
        "Operator"
    }

    fn start(&mut self, ctx: &mut Context<'_>) -> Result<(), KernelError> {
        self.high = false;
        ctx.emit(Event::with_value("setpoint", 10.0));
        Ok(())
    }

    fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), KernelError> {
        self.high = !self.high;
        let value = if self.high { 20.0 } else { 10.0 };
        ctx.emit(Event::with_value("setpoint", value));
        Ok(())
    }
}

fn build() -> Manager {
    let mut manager = Manager::new();
    manager
        .schedule(Plant { velocity: 0.0 }, Duration::from_millis(50))
        .unwrap()
        .schedule(Controller { target: 0.0 }, Duration::from_millis(100))
        .unwrap()
        .schedule(Operator { high: false }, Duration::from_secs(2))
        .unwrap()
        .add_channel(Channel::new("Throttle"))
        .unwrap()
        .add_channel(Channel::new("Velocity"))
        .unwrap()
        .init()
        .unwrap();
    manager
}

fn velocity_trace(manager: &Manager) -> Vec<(Duration, f64)> {
    manager
        .channel("Velocity")
        .unwrap()
        .history()
        .map(|sample| (sample.timestamp, sample.value))
        .collect()
}

#[traced_test]
#[test]
fn test_same_setup_same_trace() {
    let mut first = build();
    first.run(Duration::from_secs(10)).unwrap();
    let mut second = build();
    second.run(Duration::from_secs(10)).unwrap();

    let trace = velocity_trace(&first);
    assert_eq!(trace.len(), 200);
    assert_eq!(trace, velocity_trace(&second));
    assert_eq!(first.stats(), second.stats());
}

#[traced_test]
#[test]
fn test_rerun_reproduces_first_run() {
    let mut manager = build();
    manager.run(Duration::from_secs(10)).unwrap();
    let first = velocity_trace(&manager);
    let stats = manager.stats().clone();

    manager.run(Duration::from_secs(10)).unwrap();
    assert_eq!(velocity_trace(&manager), first);
    assert_eq!(manager.stats().runs, 2);
    assert_eq!(manager.stats().updates, stats.updates * 2);
}

#[traced_test]
#[test]
fn test_samples_are_stamped_with_virtual_time() {
    let mut manager = build();
    manager.run(Duration::from_millis(300)).unwrap();

    let stamps: Vec<Duration> = velocity_trace(&manager).into_iter().map(|(t, _)| t).collect();
    let expected: Vec<Duration> = (1..=6).map(|k| Duration::from_millis(50 * k)).collect();
    assert_eq!(stamps, expected);
}

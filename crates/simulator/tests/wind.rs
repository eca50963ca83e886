//! Seeded wind gusts.

use std::time::Duration;
use tickwork_simulator::{scenario, ScenarioConfig, Wind, WindConfig, VELOCITY, WIND};
use tracing_test::traced_test;

fn windy(seed: u64) -> ScenarioConfig {
    ScenarioConfig::default()
        .with_seed(seed)
        .with_wind(WindConfig::default())
}

fn velocity_trace(seed: u64) -> Vec<f64> {
    let mut manager = scenario::build(&windy(seed)).unwrap();
    manager.run(Duration::from_secs(20)).unwrap();
    manager.channel(VELOCITY).unwrap().values()
}

#[traced_test]
#[test]
fn test_wind_is_reproducible_per_seed() {
    assert_eq!(velocity_trace(42), velocity_trace(42));
    assert_ne!(velocity_trace(1), velocity_trace(2));
}

#[traced_test]
#[test]
fn test_wind_channel_and_gust_bounds() {
    let config = windy(42);
    let mut manager = scenario::build(&config).unwrap();
    manager.run(Duration::from_secs(10)).unwrap();

    let gusts = manager.channel(WIND).unwrap().values();
    // One gust every 500ms.
    assert_eq!(gusts.len(), 20);
    let max = WindConfig::default().max_gust;
    assert!(gusts.iter().all(|g| g.abs() <= max));
    assert!(gusts.iter().any(|g| *g != 0.0));

    let wind = manager.process::<Wind>("Wind").unwrap();
    assert_eq!(wind.force(), *gusts.last().unwrap());
}

#[traced_test]
#[test]
fn test_restart_replays_the_same_gusts() {
    let mut manager = scenario::build(&windy(9)).unwrap();
    manager.run(Duration::from_secs(5)).unwrap();
    let first = manager.channel(WIND).unwrap().values();

    manager.run(Duration::from_secs(5)).unwrap();
    assert_eq!(manager.channel(WIND).unwrap().values(), first);
}

#[traced_test]
#[test]
fn test_cruise_control_rides_out_the_wind() {
    let report = scenario::run(&windy(42), Duration::from_secs(40)).unwrap();
    assert!(
        report.final_velocity > 45.0 && report.final_velocity <= 60.0,
        "final velocity {}",
        report.final_velocity
    );
}

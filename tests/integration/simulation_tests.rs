//! End-to-end firings against the simulated thermal plant.

use std::sync::Arc;

use super::mock_hw::{MemorySnapshots, RecordingSink, test_config};

use kiln::adapters::simulated::SimulatedKiln;
use kiln::adapters::time::VirtualClock;
use kiln::app::events::OvenEvent;
use kiln::app::oven::Oven;
use kiln::app::state::Phase;
use kiln::config::{KilnConfig, SimulationConfig};
use kiln::control::pid::PidController;
use kiln::control::tuner::{record_step_response, ziegler_nichols};
use kiln::schedule::Schedule;
use kiln::sensors::FaultPolicy;
use kiln::sensors::tracker::SensorTracker;

fn sim_config(speedup_factor: f64) -> KilnConfig {
    KilnConfig {
        automatic_restarts: false,
        sim: SimulationConfig {
            speedup_factor,
            ..SimulationConfig::default()
        },
        ..test_config()
    }
}

fn sim_kiln(config: &KilnConfig) -> (SimulatedKiln, VirtualClock, Arc<SensorTracker>) {
    let clock = VirtualClock::new(config.sim.speedup_factor);
    let tracker = Arc::new(SensorTracker::new(
        config.temperature_average_samples,
        config.temperature_fault_limit_percent,
        FaultPolicy::new(config.faults.clone()),
    ));
    let kiln = SimulatedKiln::new(config, clock.clone(), tracker.clone());
    (kiln, clock, tracker)
}

// ── Closed loop ───────────────────────────────────────────────

#[test]
fn default_gains_track_a_ramp_to_completion() {
    let config = sim_config(1000.0);
    let (kiln, clock, tracker) = sim_kiln(&config);
    let sink = RecordingSink::new();
    let mut oven = Oven::new(config, kiln, clock, tracker)
        .unwrap()
        .with_snapshot_store(MemorySnapshots::new())
        .with_event_sink(sink.clone());

    oven.run(Schedule::new("ramp", [(0.0, 25.0), (3600.0, 200.0)]).unwrap(), 0.0, false);
    let mut ticks = 0;
    while oven.phase() != Phase::Idle && ticks < 5000 {
        oven.tick();
        ticks += 1;
    }
    assert_eq!(oven.phase(), Phase::Idle, "firing did not finish in {ticks} ticks");

    let events = sink.events();
    let cost = events.iter().find_map(|e| match e {
        OvenEvent::ScheduleComplete { cost, .. } => Some(*cost),
        _ => None,
    });
    assert!(cost.is_some_and(|c| c > 0.0));

    let final_temp = events
        .iter()
        .rev()
        .find_map(|e| match e {
            OvenEvent::Tick(s) => Some(s.temperature),
            _ => None,
        })
        .unwrap();
    assert!((final_temp - 200.0).abs() < 10.0, "ended at {final_temp:.1}");
    assert!(
        !events.iter().any(|e| matches!(e, OvenEvent::Emergency(_))),
        "no emergency expected"
    );
}

// ── Tuning ────────────────────────────────────────────────────

#[test]
fn step_response_yields_usable_gains() {
    let config = sim_config(1e9);
    let (mut kiln, clock, tracker) = sim_kiln(&config);

    let samples = record_step_response(&mut kiln, &tracker, &clock, 100.0).unwrap();
    let peak = samples.iter().map(|s| s.1).fold(f64::MIN, f64::max);
    assert!(peak > 100.0, "element heat carries the chamber past target");
    assert!(samples.last().unwrap().1 < 100.0);

    let gains = ziegler_nichols(&samples, 8.0).unwrap();
    assert!(gains.kp > 0.0 && gains.ki > 0.0 && gains.kd > 0.0);
    assert!(PidController::new(gains, config.pid_control_window, 0.0).is_ok());
}

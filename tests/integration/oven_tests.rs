//! Oven duty-cycle loop tests against the mock kiln.

use super::mock_hw::{ActuatorCall, MemorySnapshots, ramp, rig, rig_with};

use kiln::app::events::{EmergencyReason, OvenEvent};
use kiln::app::ports::Clock;
use kiln::app::state::Phase;
use kiln::config::{FaultIgnoreConfig, KilnConfig};
use kiln::schedule::Schedule;
use kiln::sensors::FaultKind;

fn hold(temp: f64) -> Schedule {
    Schedule::new("hold", [(0.0, temp), (3600.0, temp)]).unwrap()
}

// ── Catch-up ──────────────────────────────────────────────────

#[test]
fn catch_up_shifts_start_by_one_step_per_tick() {
    let mut r = rig(400.0);
    r.oven.run(hold(500.0), 0.0, false);

    r.oven.tick();
    assert_eq!(r.oven.run_start_time(), 0.0);
    r.oven.tick();
    assert_eq!(r.oven.run_start_time(), 2.0);
    assert_eq!(r.oven.get_state().runtime, 0.0);
    r.oven.tick();
    assert_eq!(r.oven.run_start_time(), 4.0);
    assert_eq!(r.oven.get_state().runtime, 0.0);

    // Wall-clock plot time keeps counting while the schedule is held.
    assert_eq!(r.oven.get_state().plot_runtime, 4.0);
}

#[test]
fn schedule_advances_once_inside_window() {
    let mut r = rig(400.0);
    r.oven.run(hold(500.0), 0.0, false);
    for _ in 0..3 {
        r.oven.tick();
    }
    r.read(500.0);
    r.oven.tick();
    assert_eq!(r.oven.get_state().runtime, 2.0);
}

#[test]
fn catch_up_disabled_lets_schedule_run_away() {
    let cfg = KilnConfig {
        kiln_must_catch_up: false,
        ..KilnConfig::default()
    };
    let mut r = rig_with(cfg, 400.0, MemorySnapshots::new());
    r.oven.run(hold(500.0), 0.0, false);
    for _ in 0..3 {
        r.oven.tick();
    }
    assert_eq!(r.oven.get_state().runtime, 4.0);
}

#[test]
fn too_hot_also_holds_schedule() {
    let mut r = rig(600.0);
    r.oven.run(hold(500.0), 0.0, false);
    for _ in 0..4 {
        r.oven.tick();
    }
    assert_eq!(r.oven.get_state().runtime, 0.0);
    assert_eq!(r.oven.get_state().heat, 0.0);
    assert_eq!(r.oven.actuator().heat_secs(), 0.0);
}

// ── Duty cycle ────────────────────────────────────────────────

#[test]
fn full_duty_far_below_target() {
    let mut r = rig(20.0);
    r.oven.run(ramp(), 0.0, false);
    r.oven.tick();
    assert_eq!(
        r.oven.actuator().calls,
        vec![ActuatorCall::Heat(2.0)],
        "one full-power cycle"
    );
    assert_eq!(r.clock.now(), 2.0);
}

#[test]
fn thermocouple_offset_applies_everywhere() {
    let cfg = KilnConfig {
        thermocouple_offset: 10.0,
        ..KilnConfig::default()
    };
    let mut r = rig_with(cfg, 90.0, MemorySnapshots::new());
    assert_eq!(r.oven.temperature(), 100.0);
    r.oven.run(ramp(), 0.0, false);
    r.oven.tick();
    assert_eq!(r.oven.get_state().temperature, 100.0);
    // 100 + offset is on target, so catch-up never triggers.
    r.oven.tick();
    assert_eq!(r.oven.get_state().runtime, 2.0);
}

// ── Pause / resume ────────────────────────────────────────────

#[test]
fn pause_freezes_schedule_and_elements() {
    let mut r = rig(100.0);
    r.oven.run(ramp(), 0.0, false);
    r.oven.tick();
    r.oven.tick();
    assert_eq!(r.oven.get_state().runtime, 2.0);

    r.oven.pause();
    let calls_before = r.oven.actuator().calls.len();
    for _ in 0..5 {
        r.oven.tick();
    }
    let s = r.oven.get_state();
    assert_eq!(s.state, Phase::Paused);
    assert_eq!(s.runtime, 2.0);
    assert!(
        r.oven.actuator().calls[calls_before..]
            .iter()
            .all(|c| *c == ActuatorCall::Cool(2.0))
    );
    assert_eq!(r.snapshots.last().unwrap().state, Phase::Paused);

    r.oven.resume();
    r.oven.tick();
    assert_eq!(r.oven.phase(), Phase::Running);
    assert_eq!(r.oven.get_state().runtime, 2.0);
    r.oven.tick();
    assert_eq!(r.oven.get_state().runtime, 4.0);
}

#[test]
fn resume_while_running_is_ignored() {
    let mut r = rig(100.0);
    r.oven.run(ramp(), 0.0, false);
    r.oven.resume();
    assert_eq!(r.oven.phase(), Phase::Running);
}

// ── Safety ────────────────────────────────────────────────────

#[test]
fn over_temperature_aborts_run() {
    let mut r = rig(1300.0);
    r.oven.run(ramp(), 0.0, false);
    r.oven.tick();

    assert_eq!(r.oven.phase(), Phase::Idle);
    assert_eq!(r.oven.actuator().last_call(), Some(&ActuatorCall::Cool(0.0)));
    assert!(
        r.sink
            .milestones()
            .iter()
            .any(|e| matches!(e, OvenEvent::Emergency(EmergencyReason::OverTemperature)))
    );
    assert_eq!(r.snapshots.last().unwrap().state, Phase::Idle);
}

#[test]
fn over_temperature_ignored_when_configured() {
    let cfg = KilnConfig {
        ignore_temp_too_high: true,
        ..KilnConfig::default()
    };
    let mut r = rig_with(cfg, 1300.0, MemorySnapshots::new());
    r.oven.run(ramp(), 0.0, false);
    r.oven.tick();
    r.oven.tick();
    assert_eq!(r.oven.phase(), Phase::Running);
}

#[test]
fn sensor_fault_ratio_aborts_run() {
    let mut r = rig(100.0);
    r.oven.run(ramp(), 0.0, false);
    r.oven.tick();

    // 7 of the trailing 20 outcomes bad = 35% > 30%.
    for _ in 0..7 {
        r.tracker.add_sample(0.0, Some(FaultKind::NotConnected));
    }
    assert_eq!(r.oven.temperature(), 100.0, "faulted reads are never averaged");
    r.oven.tick();

    assert_eq!(r.oven.phase(), Phase::Idle);
    assert!(
        r.sink
            .milestones()
            .iter()
            .any(|e| matches!(e, OvenEvent::Emergency(EmergencyReason::TooManySensorFaults)))
    );
}

#[test]
fn fault_ratio_at_limit_keeps_running() {
    let mut r = rig(100.0);
    r.oven.run(ramp(), 0.0, false);
    // 6 of 20 = exactly 30%.
    for _ in 0..6 {
        r.tracker.add_sample(0.0, Some(FaultKind::ShortToGround));
    }
    r.oven.tick();
    assert_eq!(r.oven.phase(), Phase::Running);
}

#[test]
fn ignored_fault_kind_counts_as_good() {
    let cfg = KilnConfig {
        faults: FaultIgnoreConfig {
            ignore_tc_lost_connection: true,
            ..FaultIgnoreConfig::default()
        },
        ..KilnConfig::default()
    };
    let mut r = rig_with(cfg, 100.0, MemorySnapshots::new());
    r.oven.run(ramp(), 0.0, false);
    for _ in 0..20 {
        r.tracker.add_sample(0.0, Some(FaultKind::NotConnected));
    }
    r.oven.tick();
    assert_eq!(r.oven.phase(), Phase::Running);
    assert_eq!(r.oven.temperature(), 100.0);
}

#[test]
fn too_many_errors_ignored_when_configured() {
    let cfg = KilnConfig {
        ignore_tc_too_many_errors: true,
        ..KilnConfig::default()
    };
    let mut r = rig_with(cfg, 100.0, MemorySnapshots::new());
    r.oven.run(ramp(), 0.0, false);
    for _ in 0..20 {
        r.tracker.add_sample(0.0, Some(FaultKind::Unknown));
    }
    r.oven.tick();
    assert_eq!(r.oven.phase(), Phase::Running);
}

// ── Completion ────────────────────────────────────────────────

#[test]
fn schedule_completes_after_duration() {
    let mut r = rig(100.0);
    r.oven
        .run(Schedule::new("short", [(0.0, 100.0), (10.0, 100.0)]).unwrap(), 0.0, false);

    let mut ticks = 0;
    while r.oven.phase() == Phase::Running && ticks < 20 {
        r.oven.tick();
        ticks += 1;
    }
    // Elapsed 0, 2, ..., 12: the run ends on the first tick past 10 s.
    assert_eq!(ticks, 7);
    assert_eq!(r.oven.phase(), Phase::Idle);

    let milestones = r.sink.milestones();
    assert!(milestones.iter().any(
        |e| matches!(e, OvenEvent::ScheduleComplete { profile, .. } if profile == "short")
    ));
    assert!(matches!(
        milestones.last(),
        Some(OvenEvent::PhaseChanged {
            from: Phase::Running,
            to: Phase::Idle
        })
    ));
}

#[test]
fn running_ticks_persist_snapshots() {
    let mut r = rig(100.0);
    r.oven.run(ramp(), 0.0, false);
    for _ in 0..3 {
        r.oven.tick();
    }
    let saved = r.snapshots.saved.lock().unwrap().clone();
    assert_eq!(saved.len(), 3);
    assert!(saved.iter().all(|s| s.state == Phase::Running));
    assert!(saved.iter().all(|s| s.profile.as_deref() == Some("ramp")));
    assert_eq!(saved[0].totaltime, 3600.0);

    r.oven.abort();
    let last = r.snapshots.last().unwrap();
    assert_eq!(last.state, Phase::Idle);
    assert_eq!(last.profile, None);
}

// ── Handle ────────────────────────────────────────────────────

#[test]
fn commands_from_another_thread() {
    let mut r = rig(100.0);
    let handle = r.oven.handle();

    let remote = handle.clone();
    std::thread::spawn(move || assert!(remote.run(ramp(), 0.0, false)))
        .join()
        .unwrap();

    r.oven.tick();
    assert_eq!(r.oven.phase(), Phase::Running);
    assert_eq!(handle.state().state, Phase::Running);
    assert_eq!(handle.state().profile.as_deref(), Some("ramp"));

    handle.abort();
    r.oven.tick();
    assert_eq!(handle.state().state, Phase::Idle);
}

#[test]
fn handle_reports_closed_oven() {
    let r = rig(100.0);
    let handle = r.oven.handle();
    drop(r);
    assert!(!handle.pause());
}

#[test]
fn telemetry_only_while_active() {
    let mut r = rig(100.0);
    r.oven.run(ramp(), 0.0, false);
    r.oven.tick();
    r.oven.abort();
    let ticks = r.sink.ticks();
    assert!(ticks >= 2);

    assert!(
        r.sink
            .events()
            .iter()
            .filter_map(|e| match e {
                OvenEvent::Tick(s) => Some(s.state),
                _ => None,
            })
            .all(|p| p != Phase::Idle)
    );
}

//! Automatic restart from a persisted run snapshot.

use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::mock_hw::{
    MemoryProfiles, MemorySnapshots, MockKiln, RecordingSink, ramp, rig_full, test_config,
};

use kiln::adapters::profile_store::FileProfileStore;
use kiln::adapters::restart_store::RestartStore;
use kiln::adapters::time::VirtualClock;
use kiln::app::events::OvenEvent;
use kiln::app::oven::Oven;
use kiln::app::state::{Phase, RestartSnapshot};
use kiln::config::KilnConfig;
use kiln::error::Error;
use kiln::sensors::FaultPolicy;
use kiln::sensors::tracker::SensorTracker;

fn snapshot(state: Phase, profile: &str) -> RestartSnapshot {
    RestartSnapshot {
        state,
        runtime: 1800.0,
        temperature: 550.0,
        target: 550.0,
        totaltime: 3600.0,
        profile: Some(profile.into()),
        cost: 1.25,
    }
}

// ── In-memory stores ──────────────────────────────────────────

#[test]
fn resumes_running_snapshot_with_cost() {
    let mut r = rig_full(
        test_config(),
        550.0,
        MemorySnapshots::with(snapshot(Phase::Running, "ramp")),
        MemoryProfiles::with(ramp()),
    );
    assert!(r.oven.should_restart());

    r.oven.tick();

    let s = r.oven.get_state();
    assert_eq!(s.state, Phase::Running);
    assert_eq!(s.runtime, 1800.0);
    assert_eq!(s.target, 550.0);
    assert_eq!(s.cost, 1.25);
    assert!(r.sink.milestones().iter().any(|e| matches!(
        e,
        OvenEvent::Started { profile, start_offset_secs, resumed: true }
            if profile == "ramp" && *start_offset_secs == 1800.0
    )));
}

#[test]
fn restart_never_seeks() {
    // Kiln already far above the snapshot's target: a seek would jump ahead.
    let mut r = rig_full(
        test_config(),
        900.0,
        MemorySnapshots::with(snapshot(Phase::Running, "ramp")),
        MemoryProfiles::with(ramp()),
    );
    r.oven.restart().unwrap();
    assert_eq!(r.oven.get_state().runtime, 1800.0);
}

#[test]
fn cost_keeps_accumulating_after_restart() {
    let mut r = rig_full(
        test_config(),
        20.0,
        MemorySnapshots::with(snapshot(Phase::Running, "ramp")),
        MemoryProfiles::with(ramp()),
    );
    r.oven.restart().unwrap();
    // Full duty, then billed on the following tick.
    r.oven.tick();
    r.oven.tick();
    assert!(r.oven.get_state().cost > 1.25);
}

#[test]
fn paused_snapshot_is_not_resumed() {
    let mut r = rig_full(
        test_config(),
        550.0,
        MemorySnapshots::with(snapshot(Phase::Paused, "ramp")),
        MemoryProfiles::with(ramp()),
    );
    assert!(!r.oven.should_restart());
    r.oven.tick();
    assert_eq!(r.oven.phase(), Phase::Idle);
}

#[test]
fn stale_snapshot_is_not_resumed() {
    let mut snapshots = MemorySnapshots::with(snapshot(Phase::Running, "ramp"));
    snapshots.fresh = false;
    let mut r = rig_full(test_config(), 550.0, snapshots, MemoryProfiles::with(ramp()));
    r.oven.tick();
    assert_eq!(r.oven.phase(), Phase::Idle);
}

#[test]
fn disabled_restarts_ignore_snapshot() {
    let cfg = KilnConfig {
        automatic_restarts: false,
        ..test_config()
    };
    let mut r = rig_full(
        cfg,
        550.0,
        MemorySnapshots::with(snapshot(Phase::Running, "ramp")),
        MemoryProfiles::with(ramp()),
    );
    assert!(!r.oven.should_restart());
    r.oven.tick();
    assert_eq!(r.oven.phase(), Phase::Idle);
}

#[test]
fn missing_profile_leaves_oven_idle() {
    let mut r = rig_full(
        test_config(),
        550.0,
        MemorySnapshots::with(snapshot(Phase::Running, "gone")),
        MemoryProfiles::with(ramp()),
    );
    assert!(matches!(r.oven.restart(), Err(Error::ProfileNotFound(name)) if name == "gone"));
    r.oven.tick();
    assert_eq!(r.oven.phase(), Phase::Idle);
}

#[test]
fn failed_restart_is_not_retried() {
    let cfg = KilnConfig {
        idle_poll_secs: 0.05,
        ..test_config()
    };
    let mut r = rig_full(
        cfg,
        550.0,
        MemorySnapshots::with(snapshot(Phase::Running, "gone")),
        MemoryProfiles::with(ramp()),
    );
    assert!(r.oven.should_restart());

    r.oven.tick();
    assert!(!r.oven.should_restart());
    let last = r.snapshots.last().unwrap();
    assert_eq!(last.state, Phase::Idle);
    assert_eq!(last.profile, None);

    // Later idle ticks wait for commands instead of retrying.
    let started = Instant::now();
    for _ in 0..3 {
        r.oven.tick();
    }
    assert!(started.elapsed() >= Duration::from_millis(150));
    assert_eq!(r.snapshots.saved.lock().unwrap().len(), 1);
    assert!(r.sink.milestones().is_empty());
}

// ── File-backed stores ────────────────────────────────────────

fn file_oven(
    dir: &std::path::Path,
    max_age: Duration,
) -> (Oven<MockKiln, VirtualClock>, RecordingSink) {
    let clock = VirtualClock::new(1e9);
    let tracker = Arc::new(SensorTracker::new(10, 30.0, FaultPolicy::default()));
    for _ in 0..10 {
        tracker.add_sample(550.0, None);
    }
    let sink = RecordingSink::new();
    let oven = Oven::new(test_config(), MockKiln::new(clock.clone()), clock, tracker)
        .unwrap()
        .with_snapshot_store(RestartStore::new(dir.join("state.json"), max_age))
        .with_profile_store(FileProfileStore::new(dir))
        .with_event_sink(sink.clone());
    (oven, sink)
}

fn write_profile(dir: &std::path::Path) {
    fs::write(
        dir.join("ramp.json"),
        r#"{"name": "ramp", "data": [[0, 100], [3600, 1000]]}"#,
    )
    .unwrap();
}

#[test]
fn restart_from_state_file() {
    let dir = tempfile::tempdir().unwrap();
    write_profile(dir.path());
    let store = RestartStore::new(dir.path().join("state.json"), Duration::from_secs(900));
    store.write(&snapshot(Phase::Running, "ramp")).unwrap();

    let (mut oven, _sink) = file_oven(dir.path(), Duration::from_secs(900));
    oven.tick();
    assert_eq!(oven.phase(), Phase::Running);
    assert_eq!(oven.get_state().runtime, 1800.0);

    // The running tick rewrote the file; abort leaves an idle snapshot.
    oven.tick();
    assert_eq!(store.read().unwrap().state, Phase::Running);
    oven.abort();
    let last = store.read().unwrap();
    assert_eq!(last.state, Phase::Idle);
    assert_eq!(last.profile, None);
}

#[test]
fn old_state_file_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    write_profile(dir.path());
    let store = RestartStore::new(dir.path().join("state.json"), Duration::ZERO);
    store.write(&snapshot(Phase::Running, "ramp")).unwrap();
    std::thread::sleep(Duration::from_millis(20));

    let (mut oven, sink) = file_oven(dir.path(), Duration::ZERO);
    assert!(!oven.should_restart());
    oven.tick();
    assert_eq!(oven.phase(), Phase::Idle);
    assert!(sink.milestones().is_empty());
}

//! Fuzz target: profile document parsing
//!
//! Feeds arbitrary bytes to `Schedule::from_json` and, for every schedule
//! that parses, checks:
//! - `target_at` inside the schedule stays within the control temperatures
//! - `seek_offset` never lands outside the schedule
//!
//! cargo fuzz run fuzz_profile_json

#![no_main]

use kiln::schedule::Schedule;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(schedule) = Schedule::from_json(json) else {
        return;
    };
    // Kiln-scale values only; beyond this the interpolation overflows.
    if schedule
        .points()
        .iter()
        .any(|p| p.temperature.abs() > 1e6 || p.offset_secs > 1e9)
    {
        return;
    }

    let temps = schedule.points().iter().map(|p| p.temperature);
    let lo = temps.clone().fold(f64::INFINITY, f64::min);
    let hi = temps.fold(f64::NEG_INFINITY, f64::max);
    let duration = schedule.duration();

    for i in 0..=16 {
        let t = duration * f64::from(i) / 16.0;
        let target = schedule.target_at(t);
        let slack = 1e-6 * (hi.abs() + lo.abs() + 1.0);
        assert!(
            target >= lo - slack && target <= hi + slack,
            "target {target} outside [{lo}, {hi}] at t={t}"
        );
    }

    for p in schedule.points() {
        let offset = schedule.seek_offset(p.temperature + 1.0, 0.0);
        assert!(
            offset >= 0.0 && offset <= duration * (1.0 + 1e-9),
            "seek {offset} outside 0..={duration}"
        );
    }
});

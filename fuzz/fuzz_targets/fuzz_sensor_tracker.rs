//! Fuzz target: `SensorTracker` windows
//!
//! Drives arbitrary good/faulted sample sequences and verifies:
//! - No panics for any window size in `1..=MAX_SAMPLES`
//! - The fault percentage stays within `0..=100`
//! - A faulted reading never becomes the reported temperature
//!
//! cargo fuzz run fuzz_sensor_tracker

#![no_main]

use kiln::sensors::tracker::SensorTracker;
use kiln::sensors::{FaultKind, FaultPolicy, MAX_SAMPLES};
use libfuzzer_sys::fuzz_target;

const FAULTED: f64 = -12345.0;

fuzz_target!(|data: &[u8]| {
    let Some((&n, samples)) = data.split_first() else {
        return;
    };
    let tracker = SensorTracker::new(n as usize % MAX_SAMPLES + 1, 30.0, FaultPolicy::default());

    for &b in samples {
        if b & 0x80 != 0 {
            tracker.add_sample(FAULTED, Some(FaultKind::Unknown));
        } else {
            tracker.add_sample(f64::from(b) * 10.0, None);
        }
        let pct = tracker.fault_percentage();
        assert!((0.0..=100.0).contains(&pct), "fault percentage {pct}");
        assert_ne!(tracker.current_temperature(), FAULTED);
    }
});

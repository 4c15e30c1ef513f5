//! Fuzz target: restart snapshot decoding
//!
//! A snapshot file can be truncated by a power cut mid-write.  Arbitrary
//! bytes must either fail to parse or round-trip through serialization.
//!
//! cargo fuzz run fuzz_restart_snapshot

#![no_main]

use kiln::app::state::RestartSnapshot;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(snap) = serde_json::from_slice::<RestartSnapshot>(data) else {
        return;
    };
    let json = serde_json::to_vec(&snap).expect("snapshot serializes");
    let back: RestartSnapshot = serde_json::from_slice(&json).expect("snapshot re-parses");
    assert_eq!(back.state, snap.state);
    assert_eq!(back.profile, snap.profile);
});

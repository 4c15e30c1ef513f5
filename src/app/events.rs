//! Outbound oven events.
//!
//! The [`Oven`](super::oven::Oven) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (log, push to a web front end, alert).

use super::state::{Phase, RunStateSnapshot};

/// Why a run was cut short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmergencyReason {
    OverTemperature,
    TooManySensorFaults,
}

/// Structured events emitted by the oven.
#[derive(Debug, Clone)]
pub enum OvenEvent {
    /// A run began (fresh, seeked, or resumed from a snapshot).
    Started {
        profile: String,
        start_offset_secs: f64,
        resumed: bool,
    },

    /// The oven moved between phases.
    PhaseChanged { from: Phase, to: Phase },

    /// A safety condition aborted the run.
    Emergency(EmergencyReason),

    /// The schedule ran to completion.
    ScheduleComplete { profile: String, cost: f64 },

    /// Per-tick telemetry.
    Tick(Box<RunStateSnapshot>),
}

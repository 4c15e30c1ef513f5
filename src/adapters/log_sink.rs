//! Log-based adapters.
//!
//! [`LogEventSink`] implements [`EventSink`] by writing structured oven
//! events through the `log` facade.  [`DedupLog`] suppresses repeats of
//! messages that would otherwise flood the log every sample.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use log::{error, info, Level};

use crate::app::events::{EmergencyReason, OvenEvent};
use crate::app::ports::EventSink;

/// Adapter that logs every [`OvenEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink {
    currency: String,
}

impl LogEventSink {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
        }
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &OvenEvent) {
        match event {
            OvenEvent::Tick(s) => {
                info!(
                    "TICK | {} | temp={:.2} target={:.2} error={:.2} | duty={:.2} \
                     p={:.2} i={:.2} d={:.2} | run_time={:.0} total_time={:.0} \
                     time_left={:.0} | rate={:.0}/h cost={}{:.2}",
                    s.state,
                    s.temperature,
                    s.target,
                    s.pidstats.error,
                    s.heat,
                    s.pidstats.p,
                    s.pidstats.i,
                    s.pidstats.d,
                    s.runtime,
                    s.totaltime,
                    s.totaltime - s.runtime,
                    s.heat_rate,
                    self.currency,
                    s.cost,
                );
            }
            OvenEvent::PhaseChanged { from, to } => {
                info!("STATE | {from} -> {to}");
            }
            OvenEvent::Started {
                profile,
                start_offset_secs,
                resumed,
            } => {
                info!(
                    "START | profile={profile} at {:.1} min{}",
                    start_offset_secs / 60.0,
                    if *resumed { " (automatic restart)" } else { "" }
                );
            }
            OvenEvent::Emergency(reason) => match reason {
                EmergencyReason::OverTemperature => {
                    error!("EMERGENCY | temperature too high, run aborted");
                }
                EmergencyReason::TooManySensorFaults => {
                    error!("EMERGENCY | too many thermocouple errors, run aborted");
                }
            },
            OvenEvent::ScheduleComplete { profile, cost } => {
                info!(
                    "DONE | schedule {profile} ended, total cost = {}{cost:.2}",
                    self.currency
                );
            }
        }
    }
}

/// Logs each distinct message once.
///
/// Created once by the entry point and shared (via `Arc`) with every
/// component that reports recurring conditions.
#[derive(Debug, Default)]
pub struct DedupLog {
    seen: Mutex<HashSet<String>>,
}

impl DedupLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log `msg` at `level` unless it was logged before.
    ///
    /// Returns `true` if the message was emitted.
    pub fn log(&self, level: Level, msg: impl Into<String>) -> bool {
        let msg = msg.into();
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        if seen.contains(&msg) {
            return false;
        }
        log::log!(level, "{msg}");
        seen.insert(msg);
        true
    }

    pub fn info(&self, msg: impl Into<String>) -> bool {
        self.log(Level::Info, msg)
    }

    pub fn warn(&self, msg: impl Into<String>) -> bool {
        self.log(Level::Warn, msg)
    }

    pub fn error(&self, msg: impl Into<String>) -> bool {
        self.log(Level::Error, msg)
    }

    /// Allow every message to be logged once more.
    pub fn reset(&self) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

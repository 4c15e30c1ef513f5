//! Sensor subsystem: thermocouple fault model, the reliability tracker,
//! and the sampling activity that feeds it.
//!
//! ```text
//!  TemperatureSource ──▶ Sampler ──▶ SensorTracker ◀── Oven (once per tick)
//!   (driver thread)                  (mutex-guarded)
//! ```
//!
//! The tracker is the only piece of state shared between the sampler and
//! the control loop.

pub mod sampler;
pub mod tracker;

use core::fmt;

use crate::config::FaultIgnoreConfig;

/// Upper bound for the configured samples per duty cycle.
pub const MAX_SAMPLES: usize = 64;

/// Fault flags a thermocouple amplifier can report with a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    NotConnected,
    ShortToGround,
    ShortToVcc,
    ColdJunctionRangeFault,
    ThermocoupleRangeFault,
    ColdJunctionTooHigh,
    ColdJunctionTooLow,
    ThermocoupleTooHigh,
    ThermocoupleTooLow,
    VoltageFault,
    Unknown,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::NotConnected => "not connected",
            Self::ShortToGround | Self::ShortToVcc => "short circuit",
            Self::ColdJunctionRangeFault => "cold junction range fault",
            Self::ThermocoupleRangeFault => "thermocouple range fault",
            Self::ColdJunctionTooHigh => "cold junction temp too high",
            Self::ColdJunctionTooLow => "cold junction temp too low",
            Self::ThermocoupleTooHigh => "thermocouple temp too high",
            Self::ThermocoupleTooLow => "thermocouple temp too low",
            Self::VoltageFault => "voltage too high or low",
            Self::Unknown => "unknown",
        };
        f.write_str(msg)
    }
}

/// One raw reading from a temperature source, in degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub celsius: f64,
    pub fault: Option<FaultKind>,
}

impl Reading {
    pub const fn good(celsius: f64) -> Self {
        Self {
            celsius,
            fault: None,
        }
    }

    pub const fn faulted(kind: FaultKind) -> Self {
        Self {
            celsius: 0.0,
            fault: Some(kind),
        }
    }
}

/// Lookup table deciding which fault kinds are ignored.
///
/// Ignored faults still keep the reading out of the average, but count as
/// good outcomes so they never trip the fault-ratio emergency.
#[derive(Debug, Clone, Default)]
pub struct FaultPolicy {
    ignore: FaultIgnoreConfig,
}

impl FaultPolicy {
    pub fn new(ignore: FaultIgnoreConfig) -> Self {
        Self { ignore }
    }

    pub fn is_ignored(&self, kind: FaultKind) -> bool {
        let i = &self.ignore;
        match kind {
            FaultKind::NotConnected => i.ignore_tc_lost_connection,
            FaultKind::ShortToGround | FaultKind::ShortToVcc => i.ignore_tc_short_errors,
            FaultKind::ColdJunctionRangeFault => i.ignore_tc_cold_junction_range_error,
            FaultKind::ThermocoupleRangeFault => i.ignore_tc_range_error,
            FaultKind::ColdJunctionTooHigh => i.ignore_tc_cold_junction_temp_high,
            FaultKind::ColdJunctionTooLow => i.ignore_tc_cold_junction_temp_low,
            FaultKind::ThermocoupleTooHigh => i.ignore_tc_temp_high,
            FaultKind::ThermocoupleTooLow => i.ignore_tc_temp_low,
            FaultKind::VoltageFault => i.ignore_tc_voltage_error,
            FaultKind::Unknown => i.ignore_tc_unknown_error,
        }
    }
}

//! Safety supervisor.
//!
//! The supervisor runs **every running tick after the duty cycle** and
//! accumulates a fault bitmask.  The oven aborts the run when any active
//! fault is not on the ignore list.
//!
//! ## Fault lifecycle
//!
//! 1. A condition triggers a fault (e.g. chamber above the shutoff temperature).
//! 2. The supervisor sets the corresponding bit and logs it once.
//! 3. Unless the fault is ignored, [`evaluate`](SafetySupervisor::evaluate)
//!    reports it and the oven aborts the run.
//! 4. Each tick the supervisor re-evaluates; when the condition clears the
//!    bit is unset.  Ignored faults therefore stay visible in the mask for
//!    as long as they persist.

use core::fmt;

use log::{error, info};

use crate::app::events::EmergencyReason;
use crate::config::KilnConfig;

/// Individual safety faults, one bit each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SafetyFault {
    OverTemperature = 0b0000_0001,
    TooManySensorFaults = 0b0000_0010,
}

impl SafetyFault {
    pub const fn mask(self) -> u8 {
        self as u8
    }

    const fn reason(self) -> EmergencyReason {
        match self {
            Self::OverTemperature => EmergencyReason::OverTemperature,
            Self::TooManySensorFaults => EmergencyReason::TooManySensorFaults,
        }
    }
}

impl fmt::Display for SafetyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OverTemperature => write!(f, "temperature too high"),
            Self::TooManySensorFaults => write!(f, "too many thermocouple errors"),
        }
    }
}

/// Safety supervisor.
pub struct SafetySupervisor {
    shutoff_temp: f64,
    /// Latched fault bitmask.
    faults: u8,
    /// Faults that are reported but never abort a run.
    ignored: u8,
}

impl SafetySupervisor {
    pub fn new(config: &KilnConfig) -> Self {
        let mut ignored = 0;
        if config.ignore_temp_too_high {
            ignored |= SafetyFault::OverTemperature.mask();
        }
        if config.ignore_tc_too_many_errors {
            ignored |= SafetyFault::TooManySensorFaults.mask();
        }
        Self {
            shutoff_temp: config.emergency_shutoff_temp,
            faults: 0,
            ignored,
        }
    }

    /// Evaluate all safety conditions.
    ///
    /// Returns the first active, non-ignored fault as an abort reason.
    pub fn evaluate(&mut self, temperature: f64, over_fault_limit: bool) -> Option<EmergencyReason> {
        // ── Temperature ───────────────────────────────────────────
        self.eval_fault(SafetyFault::OverTemperature, temperature >= self.shutoff_temp);

        // ── Sensor fault ratio ────────────────────────────────────
        self.eval_fault(SafetyFault::TooManySensorFaults, over_fault_limit);

        [SafetyFault::OverTemperature, SafetyFault::TooManySensorFaults]
            .into_iter()
            .find(|f| self.faults & !self.ignored & f.mask() != 0)
            .map(SafetyFault::reason)
    }

    /// Current fault bitmask.
    pub fn faults(&self) -> u8 {
        self.faults
    }

    /// True if **any** fault is active.
    pub fn has_faults(&self) -> bool {
        self.faults != 0
    }

    /// Check if a specific fault is active.
    pub fn has_fault(&self, fault: SafetyFault) -> bool {
        self.faults & fault.mask() != 0
    }

    /// Forget latched faults (start of a new run).
    pub fn clear(&mut self) {
        self.faults = 0;
    }

    // ── Internal ──────────────────────────────────────────────────

    /// Set or clear a fault bit based on a boolean condition.
    fn eval_fault(&mut self, fault: SafetyFault, condition: bool) {
        if condition {
            if self.faults & fault.mask() == 0 {
                if self.ignored & fault.mask() != 0 {
                    error!("SAFETY FAULT SET (ignored): {fault}");
                } else {
                    error!("SAFETY FAULT SET: {fault}");
                }
            }
            self.faults |= fault.mask();
        } else {
            if self.faults & fault.mask() != 0 {
                info!("SAFETY FAULT CLEARED: {fault}");
            }
            self.faults &= !fault.mask();
        }
    }
}

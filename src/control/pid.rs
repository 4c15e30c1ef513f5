//! Bounded PID controller for the kiln elements.
//!
//! Outside a symmetric control window around the setpoint the controller
//! is a bang-bang switch (full heat / no heat) and the integral does not
//! accumulate.  Inside the window it is a textbook PID whose raw output is
//! clamped to `[-OUTPUT_SCALE, OUTPUT_SCALE]` and normalised to a duty
//! fraction.  There is no active cooling, so negative output maps to 0.
//!
//! Timestamps are plain seconds from whatever [`Clock`](crate::app::ports::Clock)
//! drives the loop, so the simulator's virtual clock works unchanged.

use serde::Serialize;

use crate::error::{Error, Result};

/// Internal output range; raw output is clamped to `±OUTPUT_SCALE`.
pub const OUTPUT_SCALE: f64 = 100.0;

/// Controller gains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub kp: f64,
    /// Integral time constant (integral accumulates `error * dt / ki`).
    pub ki: f64,
    pub kd: f64,
}

/// Diagnostics from the most recent `compute` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PidStats {
    pub time: f64,
    pub time_delta: f64,
    pub setpoint: f64,
    pub measured: f64,
    pub error: f64,
    pub error_delta: f64,
    pub p: f64,
    pub i: f64,
    pub d: f64,
    /// Clamped raw output before normalisation (0 outside the window).
    pub raw: f64,
    /// Duty fraction actually returned.
    pub out: f64,
}

/// PID controller
#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    window: f64,
    integral: f64,
    last_error: f64,
    last_timestamp: f64,
    last_output: f64,
    stats: PidStats,
}

impl PidController {
    /// Create a controller whose first derivative is measured from `now`.
    pub fn new(gains: PidGains, window: f64, now: f64) -> Result<Self> {
        if !(gains.kp.is_finite() && gains.ki.is_finite() && gains.kd.is_finite()) {
            return Err(Error::InvalidGains("gains must be finite"));
        }
        if gains.ki == 0.0 {
            return Err(Error::InvalidGains("ki must be non-zero"));
        }
        if !(window.is_finite() && window > 0.0) {
            return Err(Error::InvalidGains("control window must be > 0"));
        }
        Ok(Self {
            gains,
            window,
            integral: 0.0,
            last_error: 0.0,
            last_timestamp: now,
            last_output: 0.0,
            stats: PidStats::default(),
        })
    }

    /// Compute the duty fraction in `[0, 1]`.
    pub fn compute(&mut self, setpoint: f64, measured: f64, now: f64) -> f64 {
        let dt = now - self.last_timestamp;
        let error = setpoint - measured;

        let mut stats = PidStats {
            time: now,
            time_delta: dt,
            setpoint,
            measured,
            error,
            p: self.gains.kp * error,
            i: self.integral,
            ..PidStats::default()
        };

        let output = if error < -self.window {
            log::debug!("outside control window, no heat (error {error:.2})");
            0.0
        } else if error > self.window {
            log::debug!("outside control window, full heat (error {error:.2})");
            1.0
        } else if dt <= 0.0 {
            // No time has passed: no integral, no derivative.
            self.last_output
        } else {
            self.integral += error * dt / self.gains.ki;
            let derivative = (error - self.last_error) / dt;
            let raw = (self.gains.kp * error + self.integral + self.gains.kd * derivative)
                .clamp(-OUTPUT_SCALE, OUTPUT_SCALE);

            stats.error_delta = derivative;
            stats.i = self.integral;
            stats.d = self.gains.kd * derivative;
            stats.raw = raw;
            raw.max(0.0) / OUTPUT_SCALE
        };

        self.last_error = error;
        self.last_timestamp = now;
        self.last_output = output;

        stats.out = output;
        self.stats = stats;
        output
    }

    /// Forget accumulated state; the next derivative is measured from `now`.
    pub fn reset(&mut self, now: f64) {
        self.integral = 0.0;
        self.last_error = 0.0;
        self.last_timestamp = now;
        self.last_output = 0.0;
        self.stats = PidStats::default();
    }

    pub fn stats(&self) -> PidStats {
        self.stats
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn window(&self) -> f64 {
        self.window
    }
}

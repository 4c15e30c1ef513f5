//! System configuration parameters
//!
//! All tunable parameters for the kiln controller.  Values are loaded from a
//! JSON file by [`JsonConfigFile`](crate::adapters::config_file::JsonConfigFile);
//! any field missing from the file keeps its default.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sensors::MAX_SAMPLES;

/// Longest idle wait between command checks.
const MAX_IDLE_POLL_SECS: f64 = 3600.0;
/// Longest age of a restart snapshot that may still be resumed (one week).
const MAX_RESTART_WINDOW_MINS: f64 = 7.0 * 24.0 * 60.0;

/// Display/measurement scale for every temperature in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureScale {
    #[serde(alias = "c")]
    Celsius,
    #[serde(alias = "f")]
    Fahrenheit,
}

impl TemperatureScale {
    /// Convert a Celsius thermocouple reading into this scale.
    pub fn from_celsius(self, celsius: f64) -> f64 {
        match self {
            Self::Celsius => celsius,
            Self::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }
}

/// Lumped-capacitance plant parameters for the simulated kiln.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Environment temperature (deg).
    pub t_env: f64,
    /// Heat capacity of the heating element (J/K).
    pub c_heat: f64,
    /// Heat capacity of the oven chamber (J/K).
    pub c_oven: f64,
    /// Heating power of the elements (W).
    pub p_heat: f64,
    /// Thermal resistance oven -> environment (K/W).
    pub r_o_nocool: f64,
    /// Thermal resistance element -> oven (K/W).
    pub r_ho_noair: f64,
    /// Virtual seconds per wall-clock second.
    pub speedup_factor: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            t_env: 25.0,
            c_heat: 100.0,
            c_oven: 5000.0,
            p_heat: 5450.0,
            r_o_nocool: 1.0,
            r_ho_noair: 0.1,
            speedup_factor: 1.0,
        }
    }
}

/// Per-fault-kind ignore switches.  An ignored fault is still logged but
/// counts as a good outcome in the fault ratio.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultIgnoreConfig {
    pub ignore_tc_lost_connection: bool,
    pub ignore_tc_short_errors: bool,
    pub ignore_tc_unknown_error: bool,
    pub ignore_tc_cold_junction_range_error: bool,
    pub ignore_tc_range_error: bool,
    pub ignore_tc_cold_junction_temp_high: bool,
    pub ignore_tc_cold_junction_temp_low: bool,
    pub ignore_tc_temp_high: bool,
    pub ignore_tc_temp_low: bool,
    pub ignore_tc_voltage_error: bool,
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KilnConfig {
    // --- Mode ---
    /// Drive the simulated plant instead of a relay.
    pub simulate: bool,

    // --- Timing ---
    /// Duty-cycle period in seconds.
    pub step_secs: f64,
    /// Raw thermocouple samples taken per duty cycle.
    pub temperature_average_samples: usize,
    /// How long an idle oven waits between restart checks (seconds).
    pub idle_poll_secs: f64,

    // --- PID ---
    pub pid_kp: f64,
    /// Integral time constant: the integral accumulates `error * dt / ki`.
    pub pid_ki: f64,
    pub pid_kd: f64,
    /// Half-width of the band around the setpoint where PID applies.
    pub pid_control_window: f64,

    // --- Schedule tracking ---
    /// Hold the schedule clock while the kiln is outside the control window.
    pub kiln_must_catch_up: bool,
    /// Start partway into a schedule when the kiln is already hot.
    pub seek_start: bool,
    /// Degrees above the schedule's first target before seek applies.
    pub seek_start_margin: f64,

    // --- Sensor ---
    pub temp_scale: TemperatureScale,
    /// Constant added to every measured temperature.
    pub thermocouple_offset: f64,
    /// Fault ratio (percent) above which the run is aborted.
    pub temperature_fault_limit_percent: f64,
    pub faults: FaultIgnoreConfig,

    // --- Safety ---
    pub emergency_shutoff_temp: f64,
    pub ignore_temp_too_high: bool,
    pub ignore_tc_too_many_errors: bool,

    // --- Cost ---
    /// Electricity price per kWh.
    pub kwh_rate: f64,
    /// Element power in kW.
    pub kw_elements: f64,
    pub currency_type: String,

    // --- Restart ---
    pub automatic_restarts: bool,
    /// Maximum snapshot age (minutes) for an automatic restart.
    pub automatic_restart_window_mins: f64,
    pub automatic_restart_state_file: String,
    pub kiln_profiles_directory: String,

    // --- Simulation ---
    pub sim: SimulationConfig,
}

impl Default for KilnConfig {
    fn default() -> Self {
        Self {
            simulate: true,

            step_secs: 2.0,
            temperature_average_samples: 10,
            idle_poll_secs: 1.0,

            pid_kp: 25.0,
            pid_ki: 1088.0,
            pid_kd: 217.0,
            pid_control_window: 5.0,

            kiln_must_catch_up: true,
            seek_start: true,
            seek_start_margin: 5.0,

            temp_scale: TemperatureScale::Celsius,
            thermocouple_offset: 0.0,
            temperature_fault_limit_percent: 30.0,
            faults: FaultIgnoreConfig::default(),

            emergency_shutoff_temp: 1250.0,
            ignore_temp_too_high: false,
            ignore_tc_too_many_errors: false,

            kwh_rate: 0.18,
            kw_elements: 9.46,
            currency_type: "$".into(),

            automatic_restarts: true,
            automatic_restart_window_mins: 15.0,
            automatic_restart_state_file: "state.json".into(),
            kiln_profiles_directory: "storage/profiles".into(),

            sim: SimulationConfig::default(),
        }
    }
}

impl KilnConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<()> {
        fn fail(msg: &str) -> Result<()> {
            Err(Error::Config(msg.to_string()))
        }

        if !(self.step_secs.is_finite() && self.step_secs > 0.0) {
            return fail("step_secs must be > 0");
        }
        if !(1..=MAX_SAMPLES).contains(&self.temperature_average_samples) {
            return fail("temperature_average_samples must be 1-64");
        }
        if !(self.idle_poll_secs > 0.0 && self.idle_poll_secs <= MAX_IDLE_POLL_SECS) {
            return fail("idle_poll_secs must be > 0 and at most 3600");
        }
        if !(self.pid_kp.is_finite() && self.pid_ki.is_finite() && self.pid_kd.is_finite()) {
            return fail("PID gains must be finite");
        }
        if self.pid_ki == 0.0 {
            return fail("pid_ki must be non-zero");
        }
        if !(self.pid_control_window > 0.0) {
            return fail("pid_control_window must be > 0");
        }
        if !(0.0..=100.0).contains(&self.temperature_fault_limit_percent) {
            return fail("temperature_fault_limit_percent must be 0-100");
        }
        if !self.emergency_shutoff_temp.is_finite() {
            return fail("emergency_shutoff_temp must be finite");
        }
        if self.kwh_rate < 0.0 || self.kw_elements < 0.0 {
            return fail("kwh_rate and kw_elements must be >= 0");
        }
        if !(self.automatic_restart_window_mins > 0.0
            && self.automatic_restart_window_mins <= MAX_RESTART_WINDOW_MINS)
        {
            return fail("automatic_restart_window_mins must be > 0 and at most one week");
        }
        let sim = &self.sim;
        if !(sim.c_heat > 0.0 && sim.c_oven > 0.0 && sim.r_o_nocool > 0.0 && sim.r_ho_noair > 0.0)
        {
            return fail("simulation capacities and resistances must be > 0");
        }
        if !(sim.speedup_factor.is_finite() && sim.speedup_factor > 0.0) {
            return fail("sim.speedup_factor must be > 0");
        }
        Ok(())
    }

    /// Seconds between two sampler reads.
    pub fn sample_interval_secs(&self) -> f64 {
        self.step_secs / self.temperature_average_samples as f64
    }
}

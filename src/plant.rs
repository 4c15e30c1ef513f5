//! Lumped two-mass thermal model of a kiln.
//!
//! ```text
//!   p_heat·duty ──▶ [ element  c_heat ] ──R_ho──▶ [ chamber  c_oven ] ──R_o──▶ t_env
//! ```
//!
//! One call to [`ThermalPlant::step`] integrates the model over one duty
//! cycle with a single explicit Euler step.

use crate::config::SimulationConfig;

/// Energy flows from the most recent step, in watts.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlantFlux {
    pub heater_w: f64,
    pub element_to_oven_w: f64,
    pub oven_to_env_w: f64,
}

#[derive(Debug, Clone)]
pub struct ThermalPlant {
    t_env: f64,
    c_heat: f64,
    c_oven: f64,
    p_heat: f64,
    r_o: f64,
    r_ho: f64,
    element_temp: f64,
    oven_temp: f64,
    flux: PlantFlux,
}

impl ThermalPlant {
    /// Both masses start at ambient temperature.
    pub fn new(sim: &SimulationConfig) -> Self {
        Self {
            t_env: sim.t_env,
            c_heat: sim.c_heat,
            c_oven: sim.c_oven,
            p_heat: sim.p_heat,
            r_o: sim.r_o_nocool,
            r_ho: sim.r_ho_noair,
            element_temp: sim.t_env,
            oven_temp: sim.t_env,
            flux: PlantFlux::default(),
        }
    }

    /// Advance the model by `dt` seconds with the element on for `duty` of it.
    pub fn step(&mut self, duty: f64, dt: f64) -> f64 {
        let duty = duty.clamp(0.0, 1.0);
        let q = self.p_heat * dt * duty;
        self.element_temp += q / self.c_heat;

        let p_ho = (self.element_temp - self.oven_temp) / self.r_ho;
        self.oven_temp += p_ho * dt / self.c_oven;
        self.element_temp -= p_ho * dt / self.c_heat;

        let p_env = (self.oven_temp - self.t_env) / self.r_o;
        self.oven_temp -= p_env * dt / self.c_oven;

        self.flux = PlantFlux {
            heater_w: self.p_heat * duty,
            element_to_oven_w: p_ho,
            oven_to_env_w: p_env,
        };
        self.oven_temp
    }

    pub fn oven_temp(&self) -> f64 {
        self.oven_temp
    }

    pub fn element_temp(&self) -> f64 {
        self.element_temp
    }

    pub fn ambient(&self) -> f64 {
        self.t_env
    }

    pub fn flux(&self) -> PlantFlux {
        self.flux
    }
}

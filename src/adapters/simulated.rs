//! Simulated kiln: the thermal plant behind an [`Actuator`].
//!
//! Each duty cycle advances the [`ThermalPlant`] once, advances the
//! [`VirtualClock`] by the cycle length, and feeds the resulting chamber
//! temperature to the [`SensorTracker`] as if the sampler had read it
//! `sample_count` times during the cycle.

use std::sync::Arc;

use log::debug;

use crate::app::ports::{Actuator, Clock};
use crate::config::KilnConfig;
use crate::plant::ThermalPlant;
use crate::sensors::tracker::SensorTracker;

use super::time::VirtualClock;

pub struct SimulatedKiln {
    plant: ThermalPlant,
    clock: VirtualClock,
    tracker: Arc<SensorTracker>,
}

impl SimulatedKiln {
    /// Seeds the tracker with the ambient temperature so the first tick
    /// has a reading.
    pub fn new(config: &KilnConfig, clock: VirtualClock, tracker: Arc<SensorTracker>) -> Self {
        let plant = ThermalPlant::new(&config.sim);
        let kiln = Self {
            plant,
            clock,
            tracker,
        };
        kiln.publish();
        kiln
    }

    pub fn plant(&self) -> &ThermalPlant {
        &self.plant
    }

    fn publish(&self) {
        let t = self.plant.oven_temp();
        for _ in 0..self.tracker.sample_count() {
            self.tracker.add_sample(t, None);
        }
    }

    fn advance(&mut self, duty: f64, secs: f64) {
        if secs <= 0.0 {
            return;
        }
        self.plant.step(duty, secs);
        let f = self.plant.flux();
        debug!(
            "simulation: -> {:.0}W heater: {:.0} -> {:.0}W oven: {:.0} -> {:.0}W env",
            f.heater_w,
            self.plant.element_temp(),
            f.element_to_oven_w,
            self.plant.oven_temp(),
            f.oven_to_env_w,
        );
        self.clock.sleep(secs);
        self.publish();
    }
}

impl Actuator for SimulatedKiln {
    fn heat(&mut self, secs: f64) {
        self.advance(1.0, secs);
    }

    fn cool(&mut self, secs: f64) {
        self.advance(0.0, secs);
    }

    /// One plant step over the whole cycle with the element energy scaled
    /// by `duty`.
    fn drive(&mut self, duty: f64, step: f64) {
        self.advance(duty, step);
    }
}

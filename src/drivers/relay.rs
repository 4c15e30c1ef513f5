//! Solid-state relay driver for the heating elements.
//!
//! Drives any `embedded_hal` output pin, active-high or active-low, and
//! blocks on the injected [`Clock`] for the duration of each half cycle.
//!
//! ## Safety contract
//!
//! The relay is switched off on construction and on drop.  Over-temperature
//! and fault-ratio aborts are enforced by the safety supervisor; this driver
//! is a dumb actuator.

use embedded_hal::digital::OutputPin;
use log::error;

use crate::app::ports::{Actuator, Clock};

pub struct RelayActuator<P: OutputPin, C: Clock> {
    pin: P,
    clock: C,
    /// Relay closes on a low pin.
    active_low: bool,
    on: bool,
}

impl<P: OutputPin, C: Clock> RelayActuator<P, C> {
    pub fn new(pin: P, clock: C, active_low: bool) -> Self {
        let mut relay = Self {
            pin,
            clock,
            active_low,
            on: true,
        };
        relay.set(false);
        relay
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    fn set(&mut self, on: bool) {
        let high = on != self.active_low;
        let res = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        match res {
            Ok(()) => self.on = on,
            Err(e) => error!("relay pin write failed (on={on}): {e:?}"),
        }
    }
}

impl<P: OutputPin, C: Clock> Actuator for RelayActuator<P, C> {
    fn heat(&mut self, secs: f64) {
        self.set(true);
        self.clock.sleep(secs);
    }

    fn cool(&mut self, secs: f64) {
        self.set(false);
        self.clock.sleep(secs);
    }
}

impl<P: OutputPin, C: Clock> Drop for RelayActuator<P, C> {
    fn drop(&mut self) {
        self.set(false);
    }
}

//! Clock adapters.
//!
//! - [`SystemClock`] wraps `std::time::Instant` for a real kiln.
//! - [`VirtualClock`] runs `speedup_factor` times faster than wall time for
//!   the simulator.  Sleeping advances virtual time by the full amount and
//!   blocks the thread for `secs / speedup_factor`.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::app::ports::Clock;

/// Monotonic wall clock, seconds since construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn sleep(&self, secs: f64) {
        if secs > 0.0 {
            std::thread::sleep(Duration::from_secs_f64(secs));
        }
    }
}

/// Shared virtual clock.  Clones observe and advance the same time.
#[derive(Debug, Clone)]
pub struct VirtualClock {
    now: Arc<Mutex<f64>>,
    speedup_factor: f64,
}

impl VirtualClock {
    pub fn new(speedup_factor: f64) -> Self {
        Self {
            now: Arc::new(Mutex::new(0.0)),
            speedup_factor: speedup_factor.max(f64::MIN_POSITIVE),
        }
    }

    /// Move time forward without blocking.
    pub fn advance(&self, secs: f64) {
        if secs > 0.0 {
            *self.now.lock().unwrap_or_else(PoisonError::into_inner) += secs;
        }
    }

    pub fn speedup_factor(&self) -> f64 {
        self.speedup_factor
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> f64 {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sleep(&self, secs: f64) {
        if secs <= 0.0 {
            return;
        }
        let wall = secs / self.speedup_factor;
        if wall >= 1e-6 {
            std::thread::sleep(Duration::from_secs_f64(wall));
        }
        self.advance(secs);
    }
}

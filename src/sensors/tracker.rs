//! Sensor reliability tracker.
//!
//! Keeps a window of the last `N` trustworthy readings (median for the
//! control loop) and a window of the last `2N` good/bad outcomes (fault
//! ratio for the emergency check).  Both windows are fixed-capacity ring
//! buffers; `N` is configured at construction.
//!
//! All methods take `&self`: the sampler pushes while the control loop reads,
//! and the internal mutex is held only for a push or a median.

use std::sync::{Mutex, MutexGuard, PoisonError};

use heapless::Deque;

use super::{FaultKind, FaultPolicy, MAX_SAMPLES};

const MAX_OUTCOMES: usize = MAX_SAMPLES * 2;

struct Windows {
    values: Deque<f64, MAX_SAMPLES>,
    outcomes: Deque<bool, MAX_OUTCOMES>,
    last_known: f64,
}

/// Thread-safe temperature averaging and fault-ratio tracking.
pub struct SensorTracker {
    windows: Mutex<Windows>,
    sample_count: usize,
    fault_limit_percent: f64,
    policy: FaultPolicy,
}

impl SensorTracker {
    /// `sample_count` is clamped to `1..=MAX_SAMPLES`; config validation
    /// rejects values outside that range before they get here.
    pub fn new(sample_count: usize, fault_limit_percent: f64, policy: FaultPolicy) -> Self {
        let sample_count = sample_count.clamp(1, MAX_SAMPLES);
        let mut outcomes = Deque::new();
        for _ in 0..sample_count * 2 {
            let _ = outcomes.push_back(true);
        }
        Self {
            windows: Mutex::new(Windows {
                values: Deque::new(),
                outcomes,
                last_known: 0.0,
            }),
            sample_count,
            fault_limit_percent,
            policy,
        }
    }

    /// Record one raw sample.
    ///
    /// Returns `true` when the reading entered the averaging window.
    pub fn add_sample(&self, temperature: f64, fault: Option<FaultKind>) -> bool {
        let (accepted, good) = match fault {
            None if temperature.is_finite() => (true, true),
            None => (false, false),
            Some(kind) => (false, self.policy.is_ignored(kind)),
        };

        let mut w = self.lock();
        if accepted {
            if w.values.len() >= self.sample_count {
                w.values.pop_front();
            }
            let _ = w.values.push_back(temperature);
            w.last_known = temperature;
        }
        if w.outcomes.len() >= self.sample_count * 2 {
            w.outcomes.pop_front();
        }
        let _ = w.outcomes.push_back(good);
        accepted
    }

    /// Median of the averaging window, or the last known value when empty.
    pub fn current_temperature(&self) -> f64 {
        let w = self.lock();
        if w.values.is_empty() {
            return w.last_known;
        }
        let mut sorted: heapless::Vec<f64, MAX_SAMPLES> = w.values.iter().copied().collect();
        drop(w);

        sorted.sort_unstable_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        }
    }

    /// Percentage of bad outcomes over the trailing `2N` window.
    pub fn fault_percentage(&self) -> f64 {
        let w = self.lock();
        let bad = w.outcomes.iter().filter(|ok| !**ok).count();
        100.0 * bad as f64 / (self.sample_count * 2) as f64
    }

    pub fn over_fault_limit(&self) -> bool {
        self.fault_percentage() > self.fault_limit_percent
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Drop all readings and mark the outcome window healthy again.
    pub fn clear(&self) {
        let mut w = self.lock();
        w.values.clear();
        w.outcomes.clear();
        for _ in 0..self.sample_count * 2 {
            let _ = w.outcomes.push_back(true);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Windows> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

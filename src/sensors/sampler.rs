//! Thermocouple sampling activity.
//!
//! Reads a [`TemperatureSource`] `N` times per duty cycle, converts to the
//! configured scale, and pushes each sample into the [`SensorTracker`].
//! Faulted reads are reported once each through the [`DedupLog`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use log::info;

use crate::adapters::log_sink::DedupLog;
use crate::app::ports::{Clock, TemperatureSource};
use crate::config::{KilnConfig, TemperatureScale};
use crate::sensors::tracker::SensorTracker;
use crate::sensors::FaultPolicy;

pub struct Sampler<S: TemperatureSource, C: Clock> {
    source: S,
    clock: C,
    tracker: Arc<SensorTracker>,
    scale: TemperatureScale,
    interval_secs: f64,
    policy: FaultPolicy,
    dedup: Arc<DedupLog>,
}

impl<S, C> Sampler<S, C>
where
    S: TemperatureSource + 'static,
    C: Clock + 'static,
{
    pub fn new(
        config: &KilnConfig,
        source: S,
        clock: C,
        tracker: Arc<SensorTracker>,
        dedup: Arc<DedupLog>,
    ) -> Self {
        Self {
            source,
            clock,
            tracker,
            scale: config.temp_scale,
            interval_secs: config.sample_interval_secs(),
            policy: FaultPolicy::new(config.faults.clone()),
            dedup,
        }
    }

    /// Take one reading and feed it to the tracker.
    pub fn sample_once(&mut self) {
        let reading = self.source.read();
        match reading.fault {
            None => {
                self.tracker
                    .add_sample(self.scale.from_celsius(reading.celsius), None);
            }
            Some(kind) => {
                if self.policy.is_ignored(kind) {
                    self.dedup
                        .warn(format!("thermocouple {kind}, ignored by config"));
                } else {
                    self.dedup.error(format!("thermocouple {kind}"));
                }
                self.tracker.add_sample(reading.celsius, Some(kind));
            }
        }
    }

    /// Sample until `stop` is set.
    pub fn run(mut self, stop: &AtomicBool) {
        info!(
            "sampler running every {:.3}s ({:?})",
            self.interval_secs, self.scale
        );
        while !stop.load(Ordering::Relaxed) {
            self.sample_once();
            self.clock.sleep(self.interval_secs);
        }
        info!("sampler stopped");
    }

    /// Run on a dedicated thread.
    pub fn spawn(self, stop: Arc<AtomicBool>) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("sampler".into())
            .spawn(move || self.run(&stop))
    }
}

//! Port traits: the hexagonal boundary between the control engine and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Oven (domain)
//! ```
//!
//! Driven adapters (thermocouple drivers, relays, the simulated plant,
//! clocks, profile and snapshot storage, event sinks) implement these traits.
//! The [`Oven`](super::oven::Oven) consumes them via generics or boxed trait
//! objects, so the domain core never touches hardware or the filesystem
//! directly.

use crate::config::KilnConfig;
use crate::error::Result;
use crate::schedule::Schedule;
use crate::sensors::Reading;

use super::events::OvenEvent;
use super::state::RestartSnapshot;

// ───────────────────────────────────────────────────────────────
// Temperature source (driven adapter: thermocouple → domain)
// ───────────────────────────────────────────────────────────────

/// One thermocouple amplifier.  Reads are blocking and return Celsius.
pub trait TemperatureSource: Send {
    fn read(&mut self) -> Reading;
}

// ───────────────────────────────────────────────────────────────
// Actuator (driven adapter: domain → relay / plant)
// ───────────────────────────────────────────────────────────────

/// Heating output.  Every call blocks for the given number of seconds of
/// clock time.
pub trait Actuator {
    /// Element on for `secs`.
    fn heat(&mut self, secs: f64);

    /// Element off for `secs`.
    fn cool(&mut self, secs: f64);

    /// One duty cycle: on for `duty × step`, then off for the remainder.
    fn drive(&mut self, duty: f64, step: f64) {
        let on = duty.clamp(0.0, 1.0) * step;
        let off = step - on;
        if on > 0.0 {
            self.heat(on);
        }
        if off > 0.0 {
            self.cool(off);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Clock
// ───────────────────────────────────────────────────────────────

/// Monotonic time source in seconds.
///
/// Simulations plug in a virtual clock that runs faster than wall time;
/// the domain only ever sees the numbers.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
    fn sleep(&self, secs: f64);
}

// ───────────────────────────────────────────────────────────────
// Storage ports
// ───────────────────────────────────────────────────────────────

/// Loads firing schedules by name.
pub trait ProfileStore: Send {
    fn load(&self, name: &str) -> Result<Schedule>;
}

/// Persists the latest resumable run snapshot.
pub trait SnapshotStore: Send {
    /// Best-effort write; failures are logged by the implementation.
    fn save(&mut self, snapshot: &RestartSnapshot);

    /// The stored snapshot if it is fresh enough to resume from.
    fn load_fresh(&self) -> Option<RestartSnapshot>;
}

/// Loads and persists [`KilnConfig`].
///
/// Implementations MUST validate before returning or persisting a config.
pub trait ConfigPort {
    fn load(&self) -> Result<KilnConfig>;
    fn save(&self, config: &KilnConfig) -> Result<()>;
}

// ───────────────────────────────────────────────────────────────
// Event sink (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The oven emits structured [`OvenEvent`]s through this port.
pub trait EventSink: Send {
    fn emit(&mut self, event: &OvenEvent);
}

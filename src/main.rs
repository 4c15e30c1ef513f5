//! Kiln controller: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  SimulatedKiln   VirtualClock   LogEventSink   RestartStore  │
//! │  (Actuator)      (Clock)        (EventSink)    (Snapshots)   │
//! │  JsonConfigFile  FileProfileStore                            │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │              Oven (duty-cycle loop)                    │  │
//! │  │  Schedule · PID · Safety · SensorTracker               │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `kiln-controller [CONFIG.json] [PROFILE]`.  With a profile name the
//! firing starts immediately and the process exits when the oven is idle
//! again; without one the oven waits for an automatic restart.
#![deny(unused_must_use)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use log::info;

use kiln::adapters::config_file::JsonConfigFile;
use kiln::adapters::log_sink::{DedupLog, LogEventSink};
use kiln::adapters::profile_store::FileProfileStore;
use kiln::adapters::restart_store::{BackgroundSnapshotWriter, RestartStore};
use kiln::adapters::simulated::SimulatedKiln;
use kiln::adapters::time::VirtualClock;
use kiln::app::events::OvenEvent;
use kiln::app::oven::Oven;
use kiln::app::ports::{ConfigPort, EventSink, ProfileStore};
use kiln::app::state::Phase;
use kiln::sensors::tracker::SensorTracker;
use kiln::sensors::FaultPolicy;

// ── Completion sink ───────────────────────────────────────────
//
// Logs like `LogEventSink` and signals `main` when a run ends.

struct CompletionSink {
    log: LogEventSink,
    done: mpsc::Sender<()>,
}

impl EventSink for CompletionSink {
    fn emit(&mut self, event: &OvenEvent) {
        self.log.emit(event);
        if let OvenEvent::PhaseChanged { to: Phase::Idle, .. } = event {
            let _ = self.done.send(());
        }
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("kiln-controller v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Config ─────────────────────────────────────────────
    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "kiln.json".into());
    let profile = args.next();
    let config = JsonConfigFile::new(&config_path)
        .load()
        .with_context(|| format!("loading {config_path}"))?;

    if !config.simulate {
        bail!(
            "no thermocouple or relay adapter is available on this host; \
             set \"simulate\": true in {config_path}"
        );
    }

    // ── 2. Adapters ───────────────────────────────────────────
    let dedup = Arc::new(DedupLog::new());
    let tracker = Arc::new(SensorTracker::new(
        config.temperature_average_samples,
        config.temperature_fault_limit_percent,
        FaultPolicy::new(config.faults.clone()),
    ));
    let clock = VirtualClock::new(config.sim.speedup_factor);
    let kiln = SimulatedKiln::new(&config, clock.clone(), tracker.clone());
    let snapshots = BackgroundSnapshotWriter::spawn(RestartStore::from_config(&config))
        .context("starting snapshot writer")?;
    let profiles = FileProfileStore::new(&config.kiln_profiles_directory);
    let (done_tx, done_rx) = mpsc::channel();

    info!(
        "simulated kiln: step {:.1}s, speedup x{:.0}",
        config.step_secs, config.sim.speedup_factor
    );

    // ── 3. Oven ───────────────────────────────────────────────
    let mut oven = Oven::new(config.clone(), kiln, clock, tracker)?
        .with_snapshot_store(snapshots)
        .with_profile_store(profiles.clone())
        .with_event_sink(CompletionSink {
            log: LogEventSink::new(config.currency_type.clone()),
            done: done_tx,
        })
        .with_dedup_log(dedup);

    // ── 4. Run ────────────────────────────────────────────────
    let Some(name) = profile else {
        // Idle service: only an automatic restart can start a firing.
        info!("no profile given, running as a service");
        oven.run_forever();
    };

    let schedule = profiles.load(&name)?;
    let handle = oven.handle();
    let stop = Arc::new(AtomicBool::new(false));
    let worker = {
        let stop = stop.clone();
        std::thread::Builder::new()
            .name("oven".into())
            .spawn(move || oven.run_until(&stop))?
    };

    if !handle.run(schedule, 0.0, true) {
        bail!("oven loop exited before the run could start");
    }
    done_rx.recv().context("oven loop exited mid-run")?;
    info!("firing of {name} finished");
    stop.store(true, Ordering::Relaxed);

    worker.join().map_err(|_| anyhow!("oven thread panicked"))?;
    Ok(())
}

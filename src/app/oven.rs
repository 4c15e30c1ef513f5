//! Oven orchestrator: the duty-cycle loop.
//!
//! [`Oven`] owns the run state, the PID controller and the safety
//! supervisor.  All I/O flows through port traits: an [`Actuator`] for the
//! elements, a [`Clock`], the shared [`SensorTracker`], and boxed storage
//! and event-sink adapters.
//!
//! ```text
//!  SensorTracker ──▶ ┌───────────────────────────┐ ──▶ EventSink
//!                    │           Oven            │
//!      Actuator ◀────│ Schedule · PID · Safety   │ ──▶ SnapshotStore
//!                    └───────────────────────────┘
//!                         ▲ OvenCommand (mpsc)
//!                     OvenHandle (any thread)
//! ```
//!
//! Schedule time ("elapsed") is always `now - start_time`.  Catch-up and
//! pause hold it still by re-seating `start_time = now - elapsed`; the
//! schedule itself is never modified.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use heapless::HistoryBuffer;
use log::{error, info, warn};

use crate::adapters::log_sink::{DedupLog, LogEventSink};
use crate::adapters::profile_store::FileProfileStore;
use crate::adapters::restart_store::RestartStore;
use crate::config::KilnConfig;
use crate::control::pid::{PidController, PidGains};
use crate::error::{Error, Result};
use crate::safety::SafetySupervisor;
use crate::schedule::Schedule;
use crate::sensors::tracker::SensorTracker;

use super::commands::OvenCommand;
use super::events::OvenEvent;
use super::ports::{Actuator, Clock, EventSink, ProfileStore, SnapshotStore};
use super::state::{Phase, RestartSnapshot, RunStateSnapshot};

/// Samples used for the heat-rate estimate.
const HEAT_RATE_SAMPLES: usize = 60;

// ───────────────────────────────────────────────────────────────
// Run state
// ───────────────────────────────────────────────────────────────

struct RunState {
    phase: Phase,
    schedule: Option<Schedule>,
    start_time: f64,
    original_start_time: f64,
    elapsed: f64,
    plot_runtime: f64,
    cost: f64,
    target: f64,
    duty: f64,
    /// Element-on seconds of the last duty cycle, billed on the next tick.
    heat_secs: f64,
    heat_rate: f64,
    history: HistoryBuffer<(f64, f64), HEAT_RATE_SAMPLES>,
}

impl RunState {
    fn idle(now: f64) -> Self {
        Self {
            phase: Phase::Idle,
            schedule: None,
            start_time: now,
            original_start_time: now,
            elapsed: 0.0,
            plot_runtime: 0.0,
            cost: 0.0,
            target: 0.0,
            duty: 0.0,
            heat_secs: 0.0,
            heat_rate: 0.0,
            history: HistoryBuffer::new(),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Oven
// ───────────────────────────────────────────────────────────────

pub struct Oven<A: Actuator, C: Clock> {
    config: KilnConfig,
    actuator: A,
    clock: C,
    tracker: Arc<SensorTracker>,
    pid: PidController,
    safety: SafetySupervisor,
    snapshots: Box<dyn SnapshotStore>,
    profiles: Box<dyn ProfileStore>,
    sink: Box<dyn EventSink>,
    dedup: Arc<DedupLog>,
    commands: Receiver<OvenCommand>,
    sender: Sender<OvenCommand>,
    published: Arc<Mutex<RunStateSnapshot>>,
    run: RunState,
}

impl<A: Actuator, C: Clock> Oven<A, C> {
    /// Build an idle oven.
    ///
    /// Storage and event adapters default to the file-backed restart store,
    /// the profile directory from `config`, and a [`LogEventSink`]; replace
    /// them with the `with_*` methods.
    pub fn new(config: KilnConfig, actuator: A, clock: C, tracker: Arc<SensorTracker>) -> Result<Self> {
        config.validate()?;
        let now = clock.now();
        let pid = PidController::new(gains(&config), config.pid_control_window, now)?;
        let (sender, commands) = mpsc::channel();

        Ok(Self {
            safety: SafetySupervisor::new(&config),
            snapshots: Box::new(RestartStore::from_config(&config)),
            profiles: Box::new(FileProfileStore::new(&config.kiln_profiles_directory)),
            sink: Box::new(LogEventSink::new(config.currency_type.clone())),
            dedup: Arc::new(DedupLog::new()),
            published: Arc::new(Mutex::new(RunStateSnapshot::default())),
            run: RunState::idle(now),
            config,
            actuator,
            clock,
            tracker,
            pid,
            commands,
            sender,
        })
    }

    pub fn with_snapshot_store(mut self, store: impl SnapshotStore + 'static) -> Self {
        self.snapshots = Box::new(store);
        self
    }

    pub fn with_profile_store(mut self, store: impl ProfileStore + 'static) -> Self {
        self.profiles = Box::new(store);
        self
    }

    pub fn with_event_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn with_dedup_log(mut self, dedup: Arc<DedupLog>) -> Self {
        self.dedup = dedup;
        self
    }

    /// Thread-safe handle for commands and state queries.
    pub fn handle(&self) -> OvenHandle {
        OvenHandle {
            commands: self.sender.clone(),
            state: self.published.clone(),
        }
    }

    // ── Commands ──────────────────────────────────────────────

    /// Start `schedule` at `start_minute`.
    ///
    /// With `allow_seek`, an idle oven that is already more than the seek
    /// margin above the schedule's first target starts where the schedule
    /// crosses the current temperature instead.
    pub fn run(&mut self, schedule: Schedule, start_minute: f64, allow_seek: bool) {
        self.start_run(schedule, start_minute, allow_seek, false);
    }

    fn start_run(&mut self, schedule: Schedule, start_minute: f64, allow_seek: bool, resumed: bool) {
        let from = self.run.phase;
        let mut offset = (start_minute * 60.0).max(0.0);

        if allow_seek && from == Phase::Idle && self.config.seek_start {
            let temp = self.temperature();
            let seek = schedule.seek_offset(temp, self.config.seek_start_margin);
            if seek > 0.0 {
                info!("seek_start is in effect, starting at: {seek:.0} s, {temp:.0} deg");
                offset = seek;
            }
        }

        let now = self.clock.now();
        self.run = RunState::idle(now);
        self.pid.reset(now);
        self.safety.clear();
        // Each firing reports its own sensor faults.
        self.dedup.reset();

        self.run.start_time = now - offset;
        self.run.original_start_time = now - offset;
        self.run.elapsed = offset;
        self.run.plot_runtime = offset;
        self.run.target = schedule.target_at(offset);
        self.run.phase = Phase::Running;

        info!(
            "Running schedule {} starting at {:.0} minutes",
            schedule.name(),
            offset / 60.0
        );
        self.sink.emit(&OvenEvent::Started {
            profile: schedule.name().to_string(),
            start_offset_secs: offset,
            resumed,
        });
        self.run.schedule = Some(schedule);
        self.emit_phase_change(from);
        self.publish();
    }

    /// Stop the run, switch the elements off, and persist an idle snapshot.
    pub fn abort(&mut self) {
        let from = self.run.phase;
        let now = self.clock.now();
        self.run = RunState::idle(now);
        self.pid.reset(now);
        self.actuator.cool(0.0);
        self.persist_snapshot();
        self.emit_phase_change(from);
        self.publish();
    }

    pub fn pause(&mut self) {
        if self.run.phase != Phase::Running {
            warn!("pause ignored in {}", self.run.phase);
            return;
        }
        self.run.phase = Phase::Paused;
        self.emit_phase_change(Phase::Running);
        self.publish();
    }

    /// Resume a paused run.  The controller restarts its derivative and
    /// integral from now so the pause is not integrated.
    pub fn resume(&mut self) {
        if self.run.phase != Phase::Paused {
            warn!("resume ignored in {}", self.run.phase);
            return;
        }
        self.pid.reset(self.clock.now());
        self.run.phase = Phase::Running;
        self.emit_phase_change(Phase::Paused);
        self.publish();
    }

    fn apply(&mut self, cmd: OvenCommand) {
        match cmd {
            OvenCommand::Run {
                schedule,
                start_minute,
                allow_seek,
            } => self.run(schedule, start_minute, allow_seek),
            OvenCommand::Pause => self.pause(),
            OvenCommand::Resume => self.resume(),
            OvenCommand::Abort => self.abort(),
        }
    }

    // ── Loop ──────────────────────────────────────────────────

    /// One pass of the state machine.
    ///
    /// Running and paused ticks block for one duty cycle; an idle tick
    /// blocks for up to `idle_poll_secs` waiting for a command.
    pub fn tick(&mut self) {
        while let Ok(cmd) = self.commands.try_recv() {
            self.apply(cmd);
        }

        match self.run.phase {
            Phase::Idle => self.idle_tick(),
            Phase::Running => self.running_tick(),
            Phase::Paused => self.paused_tick(),
        }
    }

    /// Tick until `stop` is set.
    pub fn run_until(&mut self, stop: &AtomicBool) {
        info!("oven loop started (step {:.1}s)", self.config.step_secs);
        while !stop.load(Ordering::Relaxed) {
            self.tick();
        }
        if self.run.phase != Phase::Idle {
            warn!("oven loop stopped mid-run, switching elements off");
            self.actuator.cool(0.0);
        }
        info!("oven loop stopped");
    }

    /// Tick for the lifetime of the process.
    pub fn run_forever(&mut self) -> ! {
        loop {
            self.tick();
        }
    }

    fn idle_tick(&mut self) {
        if self.should_restart() {
            match self.restart() {
                Ok(()) => return,
                Err(e) => {
                    // An idle snapshot makes the failed one non-resumable.
                    self.dedup.error(format!("automatic restart failed: {e}"));
                    self.persist_snapshot();
                }
            }
        }
        let wait = Duration::try_from_secs_f64(self.config.idle_poll_secs)
            .unwrap_or(Duration::from_secs(1));
        match self.commands.recv_timeout(wait) {
            Ok(cmd) => self.apply(cmd),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {}
        }
    }

    fn running_tick(&mut self) {
        self.update_cost();
        self.persist_snapshot();
        self.catch_up();
        self.update_elapsed();

        let Some(schedule) = self.run.schedule.as_ref() else {
            error!("running without a schedule, aborting");
            self.abort();
            return;
        };
        self.run.target = schedule.target_at(self.run.elapsed);

        let step = self.config.step_secs;
        let temp = self.temperature();
        let duty = self.pid.compute(self.run.target, temp, self.clock.now());
        self.run.duty = duty;
        self.run.heat_secs = duty * step;
        self.actuator.drive(duty, step);

        self.publish();
        if self.check_emergency() {
            return;
        }
        self.check_complete();
    }

    fn paused_tick(&mut self) {
        self.run.duty = 0.0;
        self.run.heat_secs = 0.0;
        self.actuator.cool(self.config.step_secs);
        self.run.start_time = self.clock.now() - self.run.elapsed;
        self.persist_snapshot();
        self.publish();
    }

    // ── Tick steps ────────────────────────────────────────────

    /// Bill the element-on time of the previous duty cycle.
    pub fn update_cost(&mut self) {
        if self.run.heat_secs > 0.0 {
            self.run.cost +=
                self.config.kwh_rate * self.config.kw_elements * (self.run.heat_secs / 3600.0);
        }
    }

    fn persist_snapshot(&mut self) {
        let snap = RestartSnapshot::from(&self.get_state());
        self.snapshots.save(&snap);
    }

    /// Hold schedule time while the kiln is outside the control window.
    pub fn catch_up(&mut self) {
        if !self.config.kiln_must_catch_up {
            return;
        }
        let temp = self.temperature();
        let window = self.config.pid_control_window;
        if self.run.target - temp > window {
            info!("kiln must catch up, too cold, shifting schedule");
            self.run.start_time = self.clock.now() - self.run.elapsed;
        } else if temp - self.run.target > window {
            info!("kiln must catch up, too hot, shifting schedule");
            self.run.start_time = self.clock.now() - self.run.elapsed;
        }
    }

    fn update_elapsed(&mut self) {
        let now = self.clock.now();
        self.run.elapsed = (now - self.run.start_time).max(0.0);
        self.run.plot_runtime = (now - self.run.original_start_time).max(0.0);
    }

    fn check_emergency(&mut self) -> bool {
        let temp = self.temperature();
        match self.safety.evaluate(temp, self.tracker.over_fault_limit()) {
            Some(reason) => {
                self.sink.emit(&OvenEvent::Emergency(reason));
                self.abort();
                true
            }
            None => false,
        }
    }

    fn check_complete(&mut self) {
        let Some(schedule) = self.run.schedule.as_ref() else {
            return;
        };
        if self.run.elapsed > schedule.duration() {
            let profile = schedule.name().to_string();
            let cost = self.run.cost;
            info!("schedule ended, shutting down");
            info!("total cost = {}{cost:.2}", self.config.currency_type);
            self.sink
                .emit(&OvenEvent::ScheduleComplete { profile, cost });
            self.abort();
        }
    }

    // ── Restart ───────────────────────────────────────────────

    /// True when a fresh snapshot of a running firing exists.
    pub fn should_restart(&self) -> bool {
        if !self.config.automatic_restarts {
            return false;
        }
        let Some(snap) = self.snapshots.load_fresh() else {
            self.dedup.info(
                "automatic restart not possible. state file does not exist or is too old.",
            );
            return false;
        };
        if snap.state != Phase::Running {
            self.dedup.info(format!(
                "automatic restart not possible. state = {}",
                snap.state
            ));
            return false;
        }
        true
    }

    /// Resume the firing described by the stored snapshot, without seeking.
    pub fn restart(&mut self) -> Result<()> {
        let snap = self
            .snapshots
            .load_fresh()
            .ok_or_else(|| Error::Config("no fresh restart snapshot".into()))?;
        let name = snap
            .profile
            .ok_or_else(|| Error::ProfileNotFound("<none>".into()))?;
        let schedule = self.profiles.load(&name)?;
        let start_minute = snap.runtime / 60.0;

        info!("automatically restarting profile = {name} at minute = {start_minute:.0}");
        self.start_run(schedule, start_minute, false, true);
        self.run.cost = snap.cost;
        self.publish();
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    /// Measured temperature including the thermocouple offset.
    pub fn temperature(&self) -> f64 {
        self.tracker.current_temperature() + self.config.thermocouple_offset
    }

    pub fn phase(&self) -> Phase {
        self.run.phase
    }

    /// Reference start time on the oven's clock.
    pub fn run_start_time(&self) -> f64 {
        self.run.start_time
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn config(&self) -> &KilnConfig {
        &self.config
    }

    pub fn get_state(&self) -> RunStateSnapshot {
        let schedule = self.run.schedule.as_ref();
        RunStateSnapshot {
            state: self.run.phase,
            profile: schedule.map(|s| s.name().to_string()),
            runtime: self.run.elapsed,
            plot_runtime: self.run.plot_runtime,
            temperature: self.temperature(),
            target: self.run.target,
            heat: self.run.duty,
            heat_rate: self.run.heat_rate,
            totaltime: schedule.map_or(0.0, Schedule::duration),
            cost: self.run.cost,
            kwh_rate: self.config.kwh_rate,
            currency_type: self.config.currency_type.clone(),
            pidstats: self.pid.stats(),
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn update_heat_rate(&mut self, temp: f64) {
        let h = &mut self.run.history;
        h.write((self.run.elapsed, temp));
        let (Some(&(t1, temp1)), Some(&(t2, temp2))) = (h.oldest_ordered().next(), h.recent()) else {
            return;
        };
        if t2 > t1 {
            self.run.heat_rate = (temp2 - temp1) / (t2 - t1) * 3600.0;
        }
    }

    fn publish(&mut self) {
        if self.run.phase != Phase::Idle {
            let temp = self.temperature();
            self.update_heat_rate(temp);
        }
        let snap = self.get_state();
        if snap.state != Phase::Idle {
            self.sink.emit(&OvenEvent::Tick(Box::new(snap.clone())));
        }
        *self
            .published
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = snap;
    }

    fn emit_phase_change(&mut self, from: Phase) {
        let to = self.run.phase;
        if from != to {
            self.sink.emit(&OvenEvent::PhaseChanged { from, to });
        }
    }
}

fn gains(config: &KilnConfig) -> PidGains {
    PidGains {
        kp: config.pid_kp,
        ki: config.pid_ki,
        kd: config.pid_kd,
    }
}

// ───────────────────────────────────────────────────────────────
// OvenHandle
// ───────────────────────────────────────────────────────────────

/// Cloneable, thread-safe remote for an [`Oven`].
///
/// Commands are queued and applied at the start of the oven's next tick;
/// the state is the snapshot the oven published most recently.  Command
/// methods return `false` once the oven has been dropped.
#[derive(Clone)]
pub struct OvenHandle {
    commands: Sender<OvenCommand>,
    state: Arc<Mutex<RunStateSnapshot>>,
}

impl OvenHandle {
    pub fn run(&self, schedule: Schedule, start_minute: f64, allow_seek: bool) -> bool {
        self.send(OvenCommand::Run {
            schedule,
            start_minute,
            allow_seek,
        })
    }

    pub fn pause(&self) -> bool {
        self.send(OvenCommand::Pause)
    }

    pub fn resume(&self) -> bool {
        self.send(OvenCommand::Resume)
    }

    pub fn abort(&self) -> bool {
        self.send(OvenCommand::Abort)
    }

    pub fn send(&self, cmd: OvenCommand) -> bool {
        self.commands.send(cmd).is_ok()
    }

    pub fn state(&self) -> RunStateSnapshot {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

//! File-backed restart snapshot store.
//!
//! Implements [`SnapshotStore`] with a single JSON file.  Writes go to a
//! sibling temp file first and are renamed into place, so a crash mid-write
//! leaves either the old or the new snapshot, never half of one.
//!
//! [`BackgroundSnapshotWriter`] moves the disk write off the control loop:
//! `save` only replaces a one-slot mailbox and a writer thread persists
//! whatever is newest.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

use log::{debug, warn};

use crate::app::ports::SnapshotStore;
use crate::app::state::RestartSnapshot;
use crate::config::KilnConfig;
use crate::error::StorageError;

/// Synchronous snapshot file.
#[derive(Debug, Clone)]
pub struct RestartStore {
    path: PathBuf,
    max_age: Duration,
    enabled: bool,
}

impl RestartStore {
    pub fn new(path: impl Into<PathBuf>, max_age: Duration) -> Self {
        Self {
            path: path.into(),
            max_age,
            enabled: true,
        }
    }

    pub fn from_config(config: &KilnConfig) -> Self {
        Self {
            path: PathBuf::from(&config.automatic_restart_state_file),
            max_age: Duration::try_from_secs_f64(config.automatic_restart_window_mins * 60.0)
                .unwrap_or(Duration::ZERO),
            enabled: config.automatic_restarts,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Serialize and atomically replace the snapshot file.
    pub fn write(&self, snapshot: &RestartSnapshot) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(snapshot)?;
        let tmp = self.path.with_extension("tmp");
        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(&json)?;
            f.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Parse the snapshot file regardless of its age.
    pub fn read(&self) -> Result<RestartSnapshot, StorageError> {
        let bytes = fs::read(&self.path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Age of the snapshot file, from its modification time.
    pub fn age(&self) -> Result<Duration, StorageError> {
        let modified = fs::metadata(&self.path)?.modified()?;
        Ok(SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO))
    }
}

impl SnapshotStore for RestartStore {
    fn save(&mut self, snapshot: &RestartSnapshot) {
        if !self.enabled {
            return;
        }
        if let Err(e) = self.write(snapshot) {
            warn!("restart snapshot write to {} failed: {e}", self.path.display());
        }
    }

    fn load_fresh(&self) -> Option<RestartSnapshot> {
        if !self.enabled {
            return None;
        }
        match self.age() {
            Ok(age) if age <= self.max_age => {}
            Ok(age) => {
                debug!("restart snapshot is {}s old, ignoring", age.as_secs());
                return None;
            }
            Err(_) => return None,
        }
        match self.read() {
            Ok(snap) => Some(snap),
            Err(e) => {
                warn!("restart snapshot {} unreadable: {e}", self.path.display());
                None
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Background writer
// ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct Mailbox {
    pending: Option<RestartSnapshot>,
    closed: bool,
}

type Shared = Arc<(Mutex<Mailbox>, Condvar)>;

/// Non-blocking wrapper: the tick hands off the snapshot and returns.
///
/// Dropping the writer flushes the newest pending snapshot before the
/// thread exits.
pub struct BackgroundSnapshotWriter {
    store: RestartStore,
    shared: Shared,
    worker: Option<JoinHandle<()>>,
}

impl BackgroundSnapshotWriter {
    pub fn spawn(store: RestartStore) -> std::io::Result<Self> {
        let shared: Shared = Arc::default();
        let worker = {
            let shared = shared.clone();
            let store = store.clone();
            std::thread::Builder::new()
                .name("snapshot-writer".into())
                .spawn(move || writer_loop(&store, &shared))?
        };
        Ok(Self {
            store,
            shared,
            worker: Some(worker),
        })
    }
}

fn writer_loop(store: &RestartStore, shared: &Shared) {
    let (lock, cvar) = &**shared;
    loop {
        let next = {
            let mut mb = lock.lock().unwrap_or_else(PoisonError::into_inner);
            while mb.pending.is_none() && !mb.closed {
                mb = cvar.wait(mb).unwrap_or_else(PoisonError::into_inner);
            }
            match mb.pending.take() {
                Some(snap) => snap,
                None => return,
            }
        };
        if let Err(e) = store.write(&next) {
            warn!("restart snapshot write to {} failed: {e}", store.path().display());
        }
    }
}

impl SnapshotStore for BackgroundSnapshotWriter {
    fn save(&mut self, snapshot: &RestartSnapshot) {
        if !self.store.is_enabled() {
            return;
        }
        let (lock, cvar) = &*self.shared;
        let mut mb = lock.lock().unwrap_or_else(PoisonError::into_inner);
        if mb.pending.replace(snapshot.clone()).is_some() {
            debug!("restart snapshot superseded before it was written");
        }
        cvar.notify_one();
    }

    fn load_fresh(&self) -> Option<RestartSnapshot> {
        self.store.load_fresh()
    }
}

impl Drop for BackgroundSnapshotWriter {
    fn drop(&mut self) {
        {
            let (lock, cvar) = &*self.shared;
            lock.lock().unwrap_or_else(PoisonError::into_inner).closed = true;
            cvar.notify_one();
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

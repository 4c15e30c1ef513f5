//! Directory-backed profile store: `<dir>/<name>.json`.

use std::fs;
use std::path::PathBuf;

use crate::app::ports::ProfileStore;
use crate::error::{Error, Result, StorageError};
use crate::schedule::Schedule;

#[derive(Debug, Clone)]
pub struct FileProfileStore {
    dir: PathBuf,
}

impl FileProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, name: &str) -> Option<PathBuf> {
        // Profile names come from snapshot files; keep them inside `dir`.
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return None;
        }
        Some(self.dir.join(format!("{name}.json")))
    }
}

impl ProfileStore for FileProfileStore {
    fn load(&self, name: &str) -> Result<Schedule> {
        let path = self
            .path_for(name)
            .ok_or_else(|| Error::ProfileNotFound(name.to_string()))?;
        let json = fs::read_to_string(&path).map_err(|e| match StorageError::from(e) {
            StorageError::NotFound => Error::ProfileNotFound(name.to_string()),
            other => Error::Storage(other),
        })?;
        Schedule::from_json(&json)
    }
}

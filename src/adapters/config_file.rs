//! JSON configuration file adapter.
//!
//! Implements [`ConfigPort`].  A missing file yields
//! [`KilnConfig::default()`]; every loaded or saved config passes
//! [`KilnConfig::validate`] first.

use std::fs;
use std::path::PathBuf;

use log::info;

use crate::app::ports::ConfigPort;
use crate::config::KilnConfig;
use crate::error::{Error, Result, StorageError};

#[derive(Debug, Clone)]
pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<KilnConfig> {
        let config = match fs::read_to_string(&self.path) {
            Ok(json) => serde_json::from_str::<KilnConfig>(&json)
                .map_err(|e| Error::Config(format!("{}: {e}", self.path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("no config at {}, using defaults", self.path.display());
                KilnConfig::default()
            }
            Err(e) => return Err(StorageError::from(e).into()),
        };
        config.validate()?;
        Ok(config)
    }

    fn save(&self, config: &KilnConfig) -> Result<()> {
        config.validate()?;
        let json = serde_json::to_string_pretty(config).map_err(StorageError::from)?;
        fs::write(&self.path, json).map_err(StorageError::from)?;
        Ok(())
    }
}

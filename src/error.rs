//! Unified error types for the kiln controller.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! construction paths (config, schedule, gains) uniform.  The duty-cycle
//! loop itself never returns these: it logs and carries on.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A firing schedule could not be built (too few points, bad JSON, ...).
    InvalidSchedule(String),
    /// PID gains are unusable (`ki == 0`, non-finite values).
    InvalidGains(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(String),
    /// The restart snapshot or a profile file could not be read or written.
    Storage(StorageError),
    /// No profile with the given name exists in the profile store.
    ProfileNotFound(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSchedule(msg) => write!(f, "invalid schedule: {msg}"),
            Self::InvalidGains(msg) => write!(f, "invalid PID gains: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::ProfileNotFound(name) => write!(f, "profile '{name}' not found"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The requested file does not exist.
    NotFound,
    /// The file exists but its contents could not be decoded.
    Corrupted(String),
    /// Generic I/O failure (disk full, permissions, ...).
    Io(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Corrupted(msg) => write!(f, "corrupted: {msg}"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(e.to_string())
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Corrupted(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

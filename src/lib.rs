//! Kiln controller library.
//!
//! Exposes the control engine (schedule, PID, sensor tracking, oven state
//! machine, restart protocol) and its adapters for the binary and for
//! integration testing.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod drivers;
pub mod error;
pub mod plant;
pub mod safety;
pub mod schedule;
pub mod sensors;

pub use error::{Error, Result};

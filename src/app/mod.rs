//! Application core: the control engine behind the port traits.
//!
//! This module contains the business rules for the kiln: the oven state
//! machine, run-state snapshots, and the commands and events that cross the
//! boundary.  All interaction with hardware, clocks and storage happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without a kiln.

pub mod commands;
pub mod events;
pub mod oven;
pub mod ports;
pub mod state;

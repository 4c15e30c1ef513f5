//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises one part of the control
//! engine against mock or simulated adapters.  No relay or thermocouple is
//! required.

mod oven_tests;
mod restart_tests;
mod simulation_tests;

//! Control laws.

pub mod pid;
pub mod tuner;

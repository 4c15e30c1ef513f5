//! Inbound commands to the oven.
//!
//! These represent actions requested by the outside world (web front end,
//! CLI, tests) and travel through an [`OvenHandle`](super::oven::OvenHandle).
//! The oven applies them at the start of its next tick.

use crate::schedule::Schedule;

/// Commands that external adapters can send into the oven.
#[derive(Debug, Clone)]
pub enum OvenCommand {
    /// Start a schedule `start_minute` minutes in, optionally seeking
    /// forward when the kiln is already hot.
    Run {
        schedule: Schedule,
        start_minute: f64,
        allow_seek: bool,
    },

    Pause,

    Resume,

    /// Stop the current run and return to idle.
    Abort,
}

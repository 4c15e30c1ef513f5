//! Run phase and the immutable views of the oven's run state.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::control::pid::PidStats;

/// Oven phase.
///
/// ```text
///   Idle ──run──▶ Running ──pause──▶ Paused
///    ▲              │  ▲               │
///    │              │  └────resume─────┘
///    └──abort / schedule complete──────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    #[default]
    Idle,
    Running,
    Paused,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "IDLE",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
        })
    }
}

/// Point-in-time view of the oven, published once per tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStateSnapshot {
    pub state: Phase,
    pub profile: Option<String>,
    /// Schedule time in seconds (frozen during catch-up and pause).
    pub runtime: f64,
    /// Clock time since the run started, including catch-up holds.
    pub plot_runtime: f64,
    pub temperature: f64,
    pub target: f64,
    /// Duty fraction applied in the last cycle.
    pub heat: f64,
    /// Degrees per hour over the recent history.
    pub heat_rate: f64,
    pub totaltime: f64,
    pub cost: f64,
    pub kwh_rate: f64,
    pub currency_type: String,
    pub pidstats: PidStats,
}

/// Persisted subset of the run state used for crash recovery.
///
/// Unknown fields are ignored on load, so a full state dump also parses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestartSnapshot {
    pub state: Phase,
    pub runtime: f64,
    pub temperature: f64,
    pub target: f64,
    pub totaltime: f64,
    pub profile: Option<String>,
    pub cost: f64,
}

impl From<&RunStateSnapshot> for RestartSnapshot {
    fn from(s: &RunStateSnapshot) -> Self {
        Self {
            state: s.state,
            runtime: s.runtime,
            temperature: s.temperature,
            target: s.target,
            totaltime: s.totaltime,
            profile: s.profile.clone(),
            cost: s.cost,
        }
    }
}

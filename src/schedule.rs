//! Firing schedule (profile) model.
//!
//! A schedule is an ordered list of `(offset_seconds, temperature)` control
//! points.  Between two points the target temperature ramps linearly; two
//! points at the same offset form a step.
//!
//! ```text
//!  temp
//!   ▲            ┌───────┐
//!   │           ╱         ╲
//!   │     ┌────┘           ╲
//!   │    ╱                  ╲
//!   └───┴──────────────────────▶ offset (s)
//!       0                    duration
//! ```
//!
//! Schedules are immutable once built; catch-up shifts the run's start time,
//! never the points themselves.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One control point of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub offset_secs: f64,
    pub temperature: f64,
}

impl Segment {
    pub const fn new(offset_secs: f64, temperature: f64) -> Self {
        Self {
            offset_secs,
            temperature,
        }
    }
}

/// On-disk profile document: `{"name": ..., "data": [[t, temp], ...]}`.
#[derive(Debug, Deserialize)]
struct ProfileDocument {
    name: String,
    data: Vec<(f64, f64)>,
}

/// An immutable firing schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    name: String,
    points: Vec<Segment>,
}

impl Schedule {
    /// Build a schedule from unordered points.
    ///
    /// Points are sorted by offset (stable, so duplicate offsets keep their
    /// given order).  Fewer than two points, negative offsets, or non-finite
    /// values are rejected.
    pub fn new(name: impl Into<String>, points: impl IntoIterator<Item = (f64, f64)>) -> Result<Self> {
        let mut points: Vec<Segment> = points
            .into_iter()
            .map(|(t, temp)| Segment::new(t, temp))
            .collect();

        if points.len() < 2 {
            return Err(Error::InvalidSchedule(format!(
                "need at least 2 points, got {}",
                points.len()
            )));
        }
        if let Some(bad) = points
            .iter()
            .find(|p| !p.offset_secs.is_finite() || !p.temperature.is_finite() || p.offset_secs < 0.0)
        {
            return Err(Error::InvalidSchedule(format!(
                "bad point ({}, {})",
                bad.offset_secs, bad.temperature
            )));
        }

        points.sort_by(|a, b| a.offset_secs.total_cmp(&b.offset_secs));

        Ok(Self {
            name: name.into(),
            points,
        })
    }

    /// Parse a profile JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: ProfileDocument =
            serde_json::from_str(json).map_err(|e| Error::InvalidSchedule(e.to_string()))?;
        Self::new(doc.name, doc.data)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> &[Segment] {
        &self.points
    }

    /// Largest offset in the schedule.
    pub fn duration(&self) -> f64 {
        self.points
            .iter()
            .map(|p| p.offset_secs)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Target temperature at `t` seconds into the run.
    ///
    /// Beyond the schedule's duration this returns `0`, not the final
    /// temperature.  The oven aborts on `elapsed > duration` so it never
    /// relies on that value.
    pub fn target_at(&self, t: f64) -> f64 {
        let duration = self.duration();
        if t > duration {
            return 0.0;
        }
        let first = self.points[0];
        if t < first.offset_secs {
            return first.temperature;
        }

        match self.points.iter().position(|p| t < p.offset_secs) {
            Some(i) => {
                // points[i - 1].offset <= t < points[i].offset, so the
                // denominator is strictly positive.
                let prev = self.points[i - 1];
                let next = self.points[i];
                let slope =
                    (next.temperature - prev.temperature) / (next.offset_secs - prev.offset_secs);
                prev.temperature + (t - prev.offset_secs) * slope
            }
            // t == duration: hold the last point.
            None => self.points[self.points.len() - 1].temperature,
        }
    }

    /// First time at which the schedule crosses `temperature`.
    ///
    /// Only rising segments produce a crossing.  A flat segment sitting
    /// exactly at `temperature` yields the start of that segment.  Returns
    /// `0` when no crossing exists, which callers treat as "start at the
    /// beginning".
    pub fn time_at_temperature(&self, temperature: f64) -> f64 {
        for pair in self.points.windows(2) {
            let (p1, p2) = (pair[0], pair[1]);
            if p2.temperature < temperature || p1.temperature > temperature {
                continue;
            }
            if p1.temperature == p2.temperature {
                return p1.offset_secs;
            }
            if let Some(t) = crossing_time(temperature, p1, p2) {
                return t;
            }
        }
        0.0
    }

    /// Seek-start offset for a kiln already at `temperature`.
    ///
    /// Zero unless the kiln is more than `margin` above the first target.
    pub fn seek_offset(&self, temperature: f64, margin: f64) -> f64 {
        if temperature > self.target_at(0.0) + margin {
            self.time_at_temperature(temperature)
        } else {
            0.0
        }
    }
}

/// Solve the line through `p1`, `p2` for the time at `temperature`.
fn crossing_time(temperature: f64, p1: Segment, p2: Segment) -> Option<f64> {
    if p1.offset_secs > p2.offset_secs || p1.temperature >= p2.temperature {
        return None;
    }
    Some(
        (temperature - p1.temperature) * (p2.offset_secs - p1.offset_secs)
            / (p2.temperature - p1.temperature)
            + p1.offset_secs,
    )
}

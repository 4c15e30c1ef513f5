//! Open-loop step-response recording and Ziegler-Nichols gain estimation.
//!
//! ```text
//!  temp                       ┌── max
//!   ▲                    ___.-'
//!   │                 .-'  ← tangent through the mid band
//!   │              .-'
//!   │ ___________.'          ← min
//!   └──┬────────┬─────────┬──▶ time
//!      0        │←── T ──→│
//!      │←─ L ──→│
//! ```
//!
//! `L` is the dead time up to where the tangent crosses the minimum, `T` the
//! time the tangent needs to climb from minimum to maximum.

use log::{info, warn};

use crate::app::ports::{Actuator, Clock};
use crate::error::{Error, Result};
use crate::sensors::tracker::SensorTracker;

use super::pid::PidGains;

/// Recording gives up when the kiln never reaches the target within this
/// much clock time.
const MAX_RECORD_SECS: f64 = 24.0 * 3600.0;

/// Seconds between recorded samples.
pub const RECORD_INTERVAL_SECS: f64 = 1.0;

/// Derive PID gains from a recorded `(time, temperature)` step response.
///
/// `tangent_divisor` narrows (larger) or widens (smaller) the band around
/// the midpoint used for the tangent; it must be at least 2.  The returned
/// `ki` is the integral time constant used by [`PidController`](super::pid::PidController).
pub fn ziegler_nichols(samples: &[(f64, f64)], tangent_divisor: f64) -> Result<PidGains> {
    if !(tangent_divisor >= 2.0) {
        return Err(Error::Config("tangent divisor must be >= 2".into()));
    }
    if samples.len() < 2 {
        return Err(Error::Config("step response needs at least 2 samples".into()));
    }

    let min_x = samples.iter().map(|s| s.0).fold(f64::INFINITY, f64::min);
    let min_y = samples.iter().map(|s| s.1).fold(f64::INFINITY, f64::min);
    let max_y = samples.iter().map(|s| s.1).fold(f64::NEG_INFINITY, f64::max);
    let mid_y = (max_y + min_y) / 2.0;
    let y_offset = ((max_y - min_y) / tangent_divisor).trunc();

    let mut lower = None;
    let mut upper = None;
    for &(x, y) in samples {
        if lower.is_none() {
            if y >= mid_y - y_offset {
                lower = Some((x, y));
            }
        } else if upper.is_none() && y >= mid_y + y_offset {
            upper = Some((x, y));
        }
    }
    let (Some((x1, y1)), Some((x2, y2))) = (lower, upper) else {
        return Err(Error::Config("step response has no usable rising edge".into()));
    };
    if x2 <= x1 || y2 <= y1 {
        return Err(Error::Config("step response tangent is not rising".into()));
    }

    let slope = (y2 - y1) / (x2 - x1);
    let offset = y1 - slope * x1;
    let lower_crossing = (min_y - offset) / slope;
    let upper_crossing = (max_y - offset) / slope;

    let dead_time = lower_crossing - min_x;
    let time_constant = upper_crossing - lower_crossing;
    if !(dead_time > 0.0 && time_constant > 0.0) {
        return Err(Error::Config(format!(
            "degenerate step response (L={dead_time:.1}, T={time_constant:.1})"
        )));
    }

    let kp = 1.2 * (time_constant / dead_time);
    let ti = 2.0 * dead_time;
    let td = 0.5 * dead_time;
    let gains = PidGains {
        kp,
        ki: 1.0 / (kp / ti),
        kd: kp * td,
    };
    info!(
        "Ziegler-Nichols: L={dead_time:.1}s T={time_constant:.1}s -> kp={:.3} ki={:.3} kd={:.3}",
        gains.kp, gains.ki, gains.kd
    );
    Ok(gains)
}

/// Heat at full power until the kiln reaches `target`, then coast until it
/// falls back below, sampling once per [`RECORD_INTERVAL_SECS`].
///
/// The actuator is always left off when this returns.
pub fn record_step_response(
    kiln: &mut impl Actuator,
    tracker: &SensorTracker,
    clock: &impl Clock,
    target: f64,
) -> Result<Vec<(f64, f64)>> {
    let start = clock.now();
    let mut samples = Vec::new();
    let mut heating = true;

    loop {
        let now = clock.now();
        let temp = tracker.current_temperature();
        samples.push((now - start, temp));

        if now - start > MAX_RECORD_SECS {
            kiln.cool(0.0);
            warn!("step response aborted after {:.0}s at {temp:.1}", now - start);
            return Err(Error::Config(format!("kiln never completed a step to {target}")));
        }

        if heating {
            if temp >= target {
                info!("step response: reached {target:.1} after {:.0}s, coasting", now - start);
                heating = false;
                kiln.cool(RECORD_INTERVAL_SECS);
            } else {
                kiln.heat(RECORD_INTERVAL_SECS);
            }
        } else if temp < target {
            break;
        } else {
            kiln.cool(RECORD_INTERVAL_SECS);
        }
    }

    kiln.cool(0.0);
    Ok(samples)
}

// ── Liveness policy ──
//
// Online/offline and age derived from a last-seen timestamp. Stateless;
// the timeout is always passed in.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Derived presence of one badge at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Liveness {
    /// Seconds since last seen. `f64::INFINITY` when never seen.
    pub age_secs: f64,
    pub online: bool,
}

/// Evaluate liveness at `now`.
///
/// `online` is `age < timeout`; a badge exactly at the boundary is offline.
/// A `last_seen` after `now` (clock skew between producer and reader)
/// counts as age zero.
pub fn evaluate(last_seen: Option<DateTime<Utc>>, now: DateTime<Utc>, timeout: Duration) -> Liveness {
    let Some(last_seen) = last_seen else {
        return Liveness {
            age_secs: f64::INFINITY,
            online: false,
        };
    };

    let elapsed = (now - last_seen).to_std().unwrap_or(Duration::ZERO);
    Liveness {
        age_secs: elapsed.as_secs_f64(),
        online: elapsed < timeout,
    }
}

/// Round to one decimal place for display.
pub fn round_tenths(secs: f64) -> f64 {
    if secs.is_finite() {
        (secs * 10.0).round() / 10.0
    } else {
        secs
    }
}

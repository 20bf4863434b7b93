//! Outcome-dependent clamping of implausible durations.
//!
//! Upstream timer data contains micro- and macro-durations that are not
//! plausible work measurements (a stopwatch left running, a task closed
//! instantly). The policy clamps them to domain-accepted bounds per
//! finalization kind instead of discarding the row. Applying the policy a
//! second time never changes a value again.

use crate::record::{Outcome, TaskRecord};
use chrono::Duration;

/// Registrations faster than this are treated as mistimed...
const REGISTERED_MIN_TRIGGER: i64 = 19 * 60;
/// ...and pinned to exactly this.
const REGISTERED_PINNED: i64 = 20 * 60;

const UPDATED_FLOOR: i64 = 3 * 60;
const UPDATED_CEILING: i64 = 15 * 60;

/// Hard cap for every outcome, applied after the per-outcome rules.
const GLOBAL_CEILING: i64 = 2 * 60 * 60;

/// A duration the policy altered, kept for the per-save correction log.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionEntry {
    pub protocol: String,
    pub outcome: Outcome,
    pub original: Duration,
    pub corrected: Duration,
}

/// The clamped value for one duration under one outcome.
pub fn corrected_duration(duration: Duration, outcome: &Outcome) -> Duration {
    let secs = duration.num_seconds();
    let mut adjusted = secs;

    match outcome {
        Outcome::Registered if secs < REGISTERED_MIN_TRIGGER => {
            adjusted = REGISTERED_PINNED;
        }
        Outcome::Updated => {
            adjusted = secs.clamp(UPDATED_FLOOR, UPDATED_CEILING);
        }
        _ => {}
    }

    if adjusted > GLOBAL_CEILING {
        adjusted = GLOBAL_CEILING;
    }

    Duration::seconds(adjusted)
}

/// Run the policy over every row, rewriting durations in place.
/// Returns one entry per altered row; rows missing either the duration or
/// the outcome are left untouched.
pub fn apply_policy(rows: &mut [TaskRecord]) -> Vec<CorrectionEntry> {
    let mut entries = Vec::new();

    for row in rows.iter_mut() {
        let (Some(duration), Some(outcome)) = (row.duration, row.outcome.as_ref()) else {
            continue;
        };

        let corrected = corrected_duration(duration, outcome);
        if corrected != duration {
            entries.push(CorrectionEntry {
                protocol: row.protocol.clone(),
                outcome: outcome.clone(),
                original: duration,
                corrected,
            });
            row.duration = Some(corrected);
        }
    }

    entries
}

//! Idle-time computation: gaps between consecutive tasks per analyst.
//!
//! For each analyst, tasks are ordered by start instant; the gap between a
//! task's completion and the next task's start counts as idle only when it
//! is positive and at most one hour. Overlaps and multi-day gaps contribute
//! zero. Gaps are summed per (analyst, completion day of the earlier task).

use crate::aggregate::{AggResult, MeanAcc, MissingColumns};
use crate::dataset::Dataset;
use crate::record::Column;
use crate::types::Assignee;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

/// Longest gap still considered idle rather than off-shift.
const IDLE_CAP_SECS: i64 = 3600;

/// Idle duration summed per analyst per day. Rows missing either instant
/// are skipped; the dataset must carry the start column at all.
pub fn idle_per_day(ds: &Dataset) -> AggResult<BTreeMap<(Assignee, NaiveDate), Duration>> {
    if !ds.schema.has_start {
        return Err(MissingColumns(vec![Column::StartedAt]));
    }

    let mut timed: Vec<(&str, NaiveDateTime, NaiveDateTime)> = ds
        .rows
        .iter()
        .filter_map(|row| match (row.started_at, row.completed_at) {
            (Some(start), Some(end)) => Some((row.assignee.as_str(), start, end)),
            _ => None,
        })
        .collect();
    // Stable sort: ties keep dataset order.
    timed.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    let mut idle: BTreeMap<(Assignee, NaiveDate), Duration> = BTreeMap::new();
    for pair in timed.windows(2) {
        let (assignee, _, completed) = pair[0];
        let (next_assignee, next_start, _) = pair[1];
        if assignee != next_assignee {
            continue;
        }

        let gap = next_start - completed;
        if gap <= Duration::zero() || gap > Duration::seconds(IDLE_CAP_SECS) {
            continue;
        }

        let key = (assignee.to_string(), completed.date());
        let sum = idle.entry(key).or_insert_with(Duration::zero);
        *sum = *sum + gap;
    }

    Ok(idle)
}

/// Mean of the daily idle sums per analyst.
pub fn mean_daily_idle(
    per_day: &BTreeMap<(Assignee, NaiveDate), Duration>,
) -> BTreeMap<Assignee, Duration> {
    let mut accs: BTreeMap<Assignee, MeanAcc> = BTreeMap::new();
    for ((assignee, _day), idle) in per_day {
        accs.entry(assignee.clone()).or_default().add(*idle);
    }
    accs.into_iter()
        .map(|(assignee, acc)| (assignee, acc.mean()))
        .collect()
}

/// Total idle per analyst across all days.
pub fn total_idle(
    per_day: &BTreeMap<(Assignee, NaiveDate), Duration>,
) -> BTreeMap<Assignee, Duration> {
    let mut totals: BTreeMap<Assignee, Duration> = BTreeMap::new();
    for ((assignee, _day), idle) in per_day {
        let sum = totals.entry(assignee.clone()).or_insert_with(Duration::zero);
        *sum = *sum + *idle;
    }
    totals
}

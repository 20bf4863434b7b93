//! Report assembly: combines aggregation outputs into externally-facing
//! tables and scalars.
//!
//! No business rules live here beyond joining aggregate series on their
//! shared key (missing matches fill with zero duration / zero count) and
//! applying duration formatting at the very last step; aggregations keep
//! raw durations until this point.

use crate::aggregate::{self, MeanAcc};
use crate::dataset::{DateRange, Dataset};
use crate::error::DeskResult;
use crate::idle;
use crate::record::Outcome;
use crate::timefmt;
use chrono::{Duration, NaiveDate};
use serde::Serialize;

// ── Monthly overview ─────────────────────────────────────────────────────────

/// Wide monthly table: the four outcome-scope means side by side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyOverviewRow {
    pub month: String,
    pub general: String,
    pub registered: String,
    pub updated: String,
    pub audited: String,
}

pub fn monthly_overview(ds: &Dataset) -> Vec<MonthlyOverviewRow> {
    aggregate::monthly_means(ds)
        .into_iter()
        .map(|(month, means)| MonthlyOverviewRow {
            month: timefmt::month_label(month),
            general: timefmt::format_hms(Some(means.general.mean())),
            registered: timefmt::format_hms(Some(means.registered.mean())),
            updated: timefmt::format_hms(Some(means.updated.mean())),
            audited: timefmt::format_hms(Some(means.audited.mean())),
        })
        .collect()
}

// ── Analyst scorecard ────────────────────────────────────────────────────────

/// One analyst's formatted headline card for a date range. Sections whose
/// columns are absent degrade to zeros / empty lists rather than failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalystScorecard {
    pub assignee: String,
    pub from: String,
    pub to: String,
    pub registered_mean: String,
    pub updated_mean: String,
    pub mean_daily_idle: String,
    pub queue_means: Vec<QueueMeanRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueMeanRow {
    pub queue: String,
    pub count: u64,
    pub mean: String,
}

pub fn analyst_scorecard(
    ds: &Dataset,
    assignee: &str,
    range: DateRange,
) -> AnalystScorecard {
    let scoped = ds.filter_assignee(assignee).filter_range(&range);

    let registered_mean = aggregate::team_mean(&scoped, &Outcome::Registered);
    let updated_mean = aggregate::team_mean(&scoped, &Outcome::Updated);

    let mean_daily_idle = match idle::idle_per_day(&scoped) {
        Ok(per_day) => idle::mean_daily_idle(&per_day)
            .get(assignee)
            .copied()
            .unwrap_or_else(Duration::zero),
        Err(missing) => {
            log::warn!("idle time unavailable for {assignee}: {missing}");
            Duration::zero()
        }
    };

    let queue_means = match queue_means_for(&scoped) {
        Ok(rows) => rows,
        Err(missing) => {
            log::warn!("queue means unavailable for {assignee}: {missing}");
            Vec::new()
        }
    };

    AnalystScorecard {
        assignee: assignee.to_string(),
        from: range.start.format("%d/%m/%Y").to_string(),
        to: range.end.format("%d/%m/%Y").to_string(),
        registered_mean: timefmt::format_hms(Some(registered_mean)),
        updated_mean: timefmt::format_hms(Some(updated_mean)),
        mean_daily_idle: timefmt::format_hms(Some(mean_daily_idle)),
        queue_means,
    }
}

fn queue_means_for(ds: &Dataset) -> aggregate::AggResult<Vec<QueueMeanRow>> {
    let means = aggregate::queue_means_finalized(ds)?;
    Ok(means
        .into_iter()
        .map(|(queue, acc)| QueueMeanRow {
            queue,
            count: acc.count(),
            mean: timefmt::format_coarse(Some(acc.mean())),
        })
        .collect())
}

// ── Period summary ───────────────────────────────────────────────────────────

/// Which rows feed the period mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TmoScope {
    /// Registered + Updated + Distributed.
    General,
    /// Registered only.
    Registered,
}

/// Placement of one analyst's mean against the team mean for the period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TmoBand {
    /// More than 10% under the team mean.
    BelowAverage,
    /// Within ±10% of the team mean.
    NearAverage,
    /// More than 10% over the team mean.
    AboveAverage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodSummaryRow {
    pub assignee: String,
    pub mean: String,
    pub count: u64,
    pub band: TmoBand,
}

/// Per-analyst mean and volume over a date range, with each analyst banded
/// against the mean of the per-analyst means.
pub fn period_summary(
    ds: &Dataset,
    range: DateRange,
    analysts: &[String],
    scope: TmoScope,
) -> Vec<PeriodSummaryRow> {
    let scoped = ds.filter_range(&range);

    let mut means: Vec<(String, MeanAcc)> = Vec::with_capacity(analysts.len());
    for analyst in analysts {
        let mut acc = MeanAcc::default();
        for row in scoped.rows.iter().filter(|r| r.assignee == *analyst) {
            let included = match scope {
                TmoScope::General => matches!(
                    row.outcome,
                    Some(Outcome::Registered) | Some(Outcome::Updated) | Some(Outcome::Distributed)
                ),
                TmoScope::Registered => row.outcome == Some(Outcome::Registered),
            };
            if included {
                acc.observe(row.duration);
            }
        }
        means.push((analyst.clone(), acc));
    }

    let team_secs: f64 = if means.is_empty() {
        0.0
    } else {
        means
            .iter()
            .map(|(_, acc)| acc.mean().num_seconds() as f64)
            .sum::<f64>()
            / means.len() as f64
    };

    means
        .into_iter()
        .map(|(assignee, acc)| {
            let mean = acc.mean();
            let secs = mean.num_seconds() as f64;
            let band = if secs < team_secs * 0.9 {
                TmoBand::BelowAverage
            } else if secs <= team_secs * 1.1 {
                TmoBand::NearAverage
            } else {
                TmoBand::AboveAverage
            };
            PeriodSummaryRow {
                assignee,
                mean: timefmt::format_hms(Some(mean)),
                count: acc.count(),
                band,
            }
        })
        .collect()
}

// ── Daily detail ─────────────────────────────────────────────────────────────

/// Registered mean and count per day for one analyst over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyDetailRow {
    pub day: NaiveDate,
    pub mean: String,
    pub count: u64,
}

pub fn daily_registered_detail(
    ds: &Dataset,
    range: DateRange,
    assignee: &str,
) -> Vec<DailyDetailRow> {
    let scoped = ds.filter_assignee(assignee).filter_range(&range);
    aggregate::daily_mean_for_outcome(&scoped, &Outcome::Registered)
        .into_iter()
        .map(|(day, acc)| DailyDetailRow {
            day,
            mean: timefmt::format_hms(Some(acc.mean())),
            count: acc.count(),
        })
        .collect()
}

// ── Before/after comparison ──────────────────────────────────────────────────

/// Per-analyst Registered/Updated means across two periods, for the
/// before-and-after report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonRow {
    pub assignee: String,
    pub registered_before: String,
    pub registered_after: String,
    pub updated_before: String,
    pub updated_after: String,
}

pub fn comparison_report(
    ds: &Dataset,
    before: DateRange,
    after: DateRange,
    analysts: &[String],
) -> Vec<ComparisonRow> {
    let scoped = ds.filter_assignees(analysts);
    let df_before = scoped.filter_range(&before);
    let df_after = scoped.filter_range(&after);

    let mut names: Vec<String> = df_before
        .assignees()
        .into_iter()
        .chain(df_after.assignees())
        .collect();
    names.sort();
    names.dedup();

    let mean_for = |ds: &Dataset, assignee: &str, outcome: &Outcome| -> String {
        let own = ds.filter_assignee(assignee);
        timefmt::format_hms(Some(aggregate::team_mean(&own, outcome)))
    };

    names
        .into_iter()
        .map(|assignee| ComparisonRow {
            registered_before: mean_for(&df_before, &assignee, &Outcome::Registered),
            registered_after: mean_for(&df_after, &assignee, &Outcome::Registered),
            updated_before: mean_for(&df_before, &assignee, &Outcome::Updated),
            updated_after: mean_for(&df_after, &assignee, &Outcome::Updated),
            assignee,
        })
        .collect()
}

// ── Ranking view ─────────────────────────────────────────────────────────────

/// A ranking table flattened for display/export, with the band attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankingRow {
    pub position: usize,
    pub assignee: String,
    pub total: u64,
    pub mean: String,
    pub band: crate::ranking::Band,
}

pub fn ranking_rows(table: &crate::ranking::RankingTable) -> Vec<RankingRow> {
    table
        .entries
        .iter()
        .map(|entry| RankingRow {
            position: entry.position,
            assignee: entry.assignee.clone(),
            total: entry.total,
            mean: timefmt::format_hms(Some(entry.mean.mean())),
            band: entry.band(table.band_size),
        })
        .collect()
}

// ── CSV export ───────────────────────────────────────────────────────────────

/// Serialize report rows to CSV. Columns come from the rows' serialized
/// field names; values are rendered as displayed, so this is a pure
/// serialization of already-formatted tables.
pub fn to_csv<T: Serialize>(rows: &[T]) -> DeskResult<String> {
    let mut out = String::new();
    let mut headers: Vec<String> = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let value = serde_json::to_value(row)?;
        let serde_json::Value::Object(fields) = value else {
            return Err(anyhow::anyhow!("CSV export expects struct rows").into());
        };

        if index == 0 {
            headers = fields.keys().cloned().collect();
            out.push_str(&headers.join(","));
            out.push('\n');
        }

        let cells: Vec<String> = headers
            .iter()
            .map(|h| csv_cell(fields.get(h).unwrap_or(&serde_json::Value::Null)))
            .collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }

    Ok(out)
}

fn csv_cell(value: &serde_json::Value) -> String {
    let text = match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.contains(',') || text.contains('"') || text.contains('\n') {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text
    }
}

// ── Convenience ──────────────────────────────────────────────────────────────

/// Formatted daily mean-duration table (the default dashboard view).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyMeanRow {
    pub day: NaiveDate,
    pub mean: String,
    pub count: u64,
}

pub fn daily_mean_table(ds: &Dataset) -> Vec<DailyMeanRow> {
    aggregate::daily_mean_duration(ds)
        .into_iter()
        .map(|(day, acc)| DailyMeanRow {
            day,
            mean: timefmt::format_hms(Some(acc.mean())),
            count: acc.count(),
        })
        .collect()
}

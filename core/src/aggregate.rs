//! Aggregation engine: pure projections over the accumulated dataset.
//!
//! Conventions shared by every aggregation here:
//!   - the dataset is never mutated;
//!   - durations stay raw `chrono::Duration`s; formatting happens at
//!     report assembly, not here;
//!   - the mean of an empty row-set is the zero duration;
//!   - an aggregation that needs an optional column the dataset lacks
//!     returns [`MissingColumns`] instead of failing, and no other
//!     aggregation is affected;
//!   - rows in the configured outlier queue with a duration above the
//!     threshold are excluded from analyst-level TMO computations.

use crate::config::DeskConfig;
use crate::dataset::Dataset;
use crate::record::{Column, Outcome, TaskRecord};
use crate::types::{Assignee, MonthKey, QueueName};
use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ── Missing-column degradation ───────────────────────────────────────────────

/// Returned by aggregations whose required columns are absent from the
/// dataset. Displayable, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingColumns(pub Vec<Column>);

impl fmt::Display for MissingColumns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|c| c.header()).collect();
        write!(f, "required columns not present: {}", names.join(", "))
    }
}

pub type AggResult<T> = Result<T, MissingColumns>;

fn require_queue(ds: &Dataset) -> AggResult<()> {
    if ds.schema.has_queue {
        Ok(())
    } else {
        Err(MissingColumns(vec![Column::Queue]))
    }
}

// ── Mean accumulator ─────────────────────────────────────────────────────────

/// Running sum/count pair behind every mean-duration metric.
///
/// Two accumulation modes exist in the source data conventions:
/// [`MeanAcc::add`] counts only rows that carry a duration (plain mean),
/// while [`MeanAcc::observe`] counts the row regardless and adds the
/// duration when present (daily totals divide by all closed rows).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeanAcc {
    total_secs: i64,
    count: u64,
}

impl MeanAcc {
    pub fn add(&mut self, duration: Duration) {
        self.total_secs += duration.num_seconds();
        self.count += 1;
    }

    pub fn observe(&mut self, duration: Option<Duration>) {
        if let Some(d) = duration {
            self.total_secs += d.num_seconds();
        }
        self.count += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn total(&self) -> Duration {
        Duration::seconds(self.total_secs)
    }

    /// Zero duration when nothing accumulated, never a division error.
    pub fn mean(&self) -> Duration {
        if self.count == 0 {
            Duration::zero()
        } else {
            Duration::seconds(self.total_secs / self.count as i64)
        }
    }
}

// ── Outlier exclusion ────────────────────────────────────────────────────────

/// Outlier-queue rule: rows in the doubt queue above the threshold are
/// interrupted-timer artifacts. Only meaningful when the dataset carries a
/// queue column.
fn is_outlier(row: &TaskRecord, config: &DeskConfig) -> bool {
    let Some(queue) = row.queue.as_deref() else {
        return false;
    };
    queue == config.outlier_queue
        && row
            .duration
            .is_some_and(|d| d > Duration::minutes(config.outlier_threshold_min))
}

// ── Daily groupings ──────────────────────────────────────────────────────────

/// Mean duration per completion day over Finalized/Cancelled rows.
pub fn daily_mean_duration(ds: &Dataset) -> BTreeMap<NaiveDate, MeanAcc> {
    let mut by_day: BTreeMap<NaiveDate, MeanAcc> = BTreeMap::new();
    for row in &ds.rows {
        if !row.status.is_closed() {
            continue;
        }
        if let Some(day) = row.completed_date() {
            by_day.entry(day).or_default().observe(row.duration);
        }
    }
    by_day
}

/// Completed units of work per day: any row with an outcome counts.
pub fn daily_throughput(ds: &Dataset) -> BTreeMap<NaiveDate, u64> {
    let mut by_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for row in &ds.rows {
        if row.outcome.is_none() {
            continue;
        }
        if let Some(day) = row.completed_date() {
            *by_day.entry(day).or_insert(0) += 1;
        }
    }
    by_day
}

/// Registered/Updated counts per day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeSplit {
    pub registered: u64,
    pub updated: u64,
}

impl OutcomeSplit {
    pub fn total(&self) -> u64 {
        self.registered + self.updated
    }
}

pub fn daily_outcome_split(ds: &Dataset) -> BTreeMap<NaiveDate, OutcomeSplit> {
    let mut by_day: BTreeMap<NaiveDate, OutcomeSplit> = BTreeMap::new();
    for row in &ds.rows {
        let Some(day) = row.completed_date() else {
            continue;
        };
        match row.outcome {
            Some(Outcome::Registered) => by_day.entry(day).or_default().registered += 1,
            Some(Outcome::Updated) => by_day.entry(day).or_default().updated += 1,
            _ => {}
        }
    }
    by_day
}

/// Mean duration per day for one outcome.
pub fn daily_mean_for_outcome(ds: &Dataset, outcome: &Outcome) -> BTreeMap<NaiveDate, MeanAcc> {
    let mut by_day: BTreeMap<NaiveDate, MeanAcc> = BTreeMap::new();
    for row in &ds.rows {
        if row.outcome.as_ref() != Some(outcome) {
            continue;
        }
        if let Some(day) = row.completed_date() {
            by_day.entry(day).or_default().observe(row.duration);
        }
    }
    by_day
}

/// The day with the lowest Registered mean, if any Registered row exists.
pub fn best_registered_day(ds: &Dataset) -> Option<(NaiveDate, Duration)> {
    daily_mean_for_outcome(ds, &Outcome::Registered)
        .into_iter()
        .map(|(day, acc)| (day, acc.mean()))
        .min_by_key(|(_, mean)| *mean)
}

/// The day with the most Registered rows, if any.
pub fn busiest_registered_day(ds: &Dataset) -> Option<(NaiveDate, u64)> {
    daily_mean_for_outcome(ds, &Outcome::Registered)
        .into_iter()
        .map(|(day, acc)| (day, acc.count()))
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
}

// ── Monthly groupings ────────────────────────────────────────────────────────

/// Per-month means, one series per outcome scope, merged on month.
/// A month missing one series keeps that series at the zero mean.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonthlyMeans {
    pub general: MeanAcc,
    pub registered: MeanAcc,
    pub updated: MeanAcc,
    pub audited: MeanAcc,
}

pub fn monthly_means(ds: &Dataset) -> BTreeMap<MonthKey, MonthlyMeans> {
    let mut by_month: BTreeMap<MonthKey, MonthlyMeans> = BTreeMap::new();
    for row in &ds.rows {
        let Some(month) = row.month_key() else {
            continue;
        };
        let Some(outcome) = row.outcome.as_ref() else {
            continue;
        };
        let entry = by_month.entry(month).or_default();
        match outcome {
            Outcome::Registered => {
                entry.general.observe(row.duration);
                entry.registered.observe(row.duration);
            }
            Outcome::Updated => {
                entry.general.observe(row.duration);
                entry.updated.observe(row.duration);
            }
            Outcome::Distributed => entry.general.observe(row.duration),
            Outcome::Audited => {
                entry.general.observe(row.duration);
                entry.audited.observe(row.duration);
            }
            _ => {}
        }
    }
    by_month
}

// ── Analyst groupings ────────────────────────────────────────────────────────

/// Mean Registered duration and count per analyst, over Finalized/Cancelled
/// rows, with the outlier-queue exclusion applied.
pub fn analyst_mean_registered(ds: &Dataset, config: &DeskConfig) -> BTreeMap<Assignee, MeanAcc> {
    let mut by_analyst: BTreeMap<Assignee, MeanAcc> = BTreeMap::new();
    for row in &ds.rows {
        if !row.status.is_closed() || is_outlier(row, config) {
            continue;
        }
        if row.outcome == Some(Outcome::Registered) {
            by_analyst
                .entry(row.assignee.clone())
                .or_default()
                .observe(row.duration);
        }
    }
    by_analyst
}

/// Team-wide baseline: mean duration over all rows with the given outcome.
pub fn team_mean(ds: &Dataset, outcome: &Outcome) -> Duration {
    let mut acc = MeanAcc::default();
    for row in &ds.rows {
        if row.outcome.as_ref() == Some(outcome) {
            if let Some(d) = row.duration {
                acc.add(d);
            }
        }
    }
    acc.mean()
}

/// One analyst's headline numbers. Unknown-queue rows are excluded, as are
/// outlier-queue rows above the threshold.
#[derive(Debug, Clone, Copy)]
pub struct AnalystSnapshot {
    pub registered: u64,
    pub updated: u64,
    pub distributed: u64,
    pub mean_overall: Duration,
    pub mean_registered: Duration,
    pub mean_updated: Duration,
    pub days_worked: u64,
    pub avg_registered_per_day: u64,
}

pub fn analyst_snapshot(ds: &Dataset, config: &DeskConfig) -> AggResult<AnalystSnapshot> {
    require_queue(ds)?;

    let mut overall = MeanAcc::default();
    let mut registered = MeanAcc::default();
    let mut updated = MeanAcc::default();
    let mut distributed = MeanAcc::default();
    let mut worked_days: BTreeSet<NaiveDate> = BTreeSet::new();

    for row in &ds.rows {
        if row.queue.as_deref() == Some(config.unknown_queue_label.as_str())
            || is_outlier(row, config)
        {
            continue;
        }
        let acc = match row.outcome {
            Some(Outcome::Registered) => &mut registered,
            Some(Outcome::Updated) => &mut updated,
            Some(Outcome::Distributed) => &mut distributed,
            _ => continue,
        };
        acc.observe(row.duration);
        overall.observe(row.duration);
        if row.outcome == Some(Outcome::Registered) {
            if let Some(day) = row.completed_date() {
                worked_days.insert(day);
            }
        }
    }

    let days_worked = worked_days.len() as u64;
    Ok(AnalystSnapshot {
        registered: registered.count(),
        updated: updated.count(),
        distributed: distributed.count(),
        mean_overall: overall.mean(),
        mean_registered: registered.mean(),
        mean_updated: updated.mean(),
        days_worked,
        avg_registered_per_day: if days_worked > 0 {
            registered.count() / days_worked
        } else {
            0
        },
    })
}

// ── Queue groupings ──────────────────────────────────────────────────────────

/// Fastest analyst in a queue: lowest mean over Registered/Updated rows.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueBest {
    pub assignee: Assignee,
    pub mean: Duration,
    pub count: u64,
}

pub fn best_analyst_per_queue_by_speed(
    ds: &Dataset,
    config: &DeskConfig,
) -> AggResult<BTreeMap<QueueName, QueueBest>> {
    require_queue(ds)?;

    let mut grouped: BTreeMap<(QueueName, Assignee), MeanAcc> = BTreeMap::new();
    for row in &ds.rows {
        if !matches!(
            row.outcome,
            Some(Outcome::Registered) | Some(Outcome::Updated)
        ) || config.is_bench_excluded(&row.assignee)
        {
            continue;
        }
        let (Some(queue), Some(duration)) = (row.queue.as_ref(), row.duration) else {
            continue;
        };
        grouped
            .entry((queue.clone(), row.assignee.clone()))
            .or_default()
            .add(duration);
    }

    // First-seen wins on ties; group keys iterate assignee-ascending.
    let mut best: BTreeMap<QueueName, QueueBest> = BTreeMap::new();
    for ((queue, assignee), acc) in grouped {
        let candidate = QueueBest {
            assignee,
            mean: acc.mean(),
            count: acc.count(),
        };
        match best.get(&queue) {
            Some(current) if current.mean <= candidate.mean => {}
            _ => {
                best.insert(queue, candidate);
            }
        }
    }
    Ok(best)
}

/// Highest-volume analyst in a queue over Registered/Updated rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueTop {
    pub assignee: Assignee,
    pub count: u64,
}

pub fn best_analyst_per_queue_by_volume(
    ds: &Dataset,
    config: &DeskConfig,
) -> AggResult<BTreeMap<QueueName, QueueTop>> {
    require_queue(ds)?;

    let mut grouped: BTreeMap<(QueueName, Assignee), u64> = BTreeMap::new();
    for row in &ds.rows {
        if !matches!(
            row.outcome,
            Some(Outcome::Registered) | Some(Outcome::Updated)
        ) || config.is_bench_excluded(&row.assignee)
        {
            continue;
        }
        if let Some(queue) = row.queue.as_ref() {
            *grouped
                .entry((queue.clone(), row.assignee.clone()))
                .or_insert(0) += 1;
        }
    }

    let mut best: BTreeMap<QueueName, QueueTop> = BTreeMap::new();
    for ((queue, assignee), count) in grouped {
        match best.get(&queue) {
            Some(current) if current.count >= count => {}
            _ => {
                best.insert(queue, QueueTop { assignee, count });
            }
        }
    }
    Ok(best)
}

/// One line of the per-queue production summary.
///
/// Distribution and audit queues report a single outcome; their mean lands
/// in `mean_registered` to keep the merged column layout.
#[derive(Debug, Clone, Default)]
pub struct QueueSummaryRow {
    pub queue: QueueName,
    pub total: u64,
    pub registered: u64,
    pub updated: u64,
    /// Protocol-deduplicated rows finalized outside Registered/Updated.
    pub out_of_scope: u64,
    pub mean_registered: MeanAcc,
    pub mean_updated: MeanAcc,
    /// Mean over outcomes outside the productive set (Registered, Updated,
    /// Distributed, BulkClosed).
    pub mean_out_of_scope: MeanAcc,
}

pub fn queue_summary(ds: &Dataset, config: &DeskConfig) -> AggResult<Vec<QueueSummaryRow>> {
    require_queue(ds)?;

    fn line<'a>(
        by_queue: &'a mut BTreeMap<QueueName, QueueSummaryRow>,
        queue: &str,
    ) -> &'a mut QueueSummaryRow {
        by_queue
            .entry(queue.to_string())
            .or_insert_with(|| QueueSummaryRow {
                queue: queue.to_string(),
                ..QueueSummaryRow::default()
            })
    }

    let mut by_queue: BTreeMap<QueueName, QueueSummaryRow> = BTreeMap::new();

    for row in &ds.rows {
        let Some(queue) = row.queue.as_deref() else {
            continue;
        };
        match row.outcome {
            Some(Outcome::Registered) => {
                let entry = line(&mut by_queue, queue);
                entry.total += 1;
                entry.registered += 1;
                entry.mean_registered.observe(row.duration);
            }
            Some(Outcome::Updated) => {
                let entry = line(&mut by_queue, queue);
                entry.total += 1;
                entry.updated += 1;
                entry.mean_updated.observe(row.duration);
            }
            Some(Outcome::Distributed) if config.distribution_queues.iter().any(|q| q == queue) => {
                let entry = line(&mut by_queue, queue);
                entry.total += 1;
                entry.mean_registered.observe(row.duration);
            }
            Some(Outcome::Audited) if config.audit_queues.iter().any(|q| q == queue) => {
                let entry = line(&mut by_queue, queue);
                entry.total += 1;
                entry.mean_registered.observe(row.duration);
            }
            _ => {}
        }

        let out_of_productive_set = !matches!(
            row.outcome,
            Some(Outcome::Registered)
                | Some(Outcome::Updated)
                | Some(Outcome::Distributed)
                | Some(Outcome::BulkClosed)
        );
        if out_of_productive_set {
            if let Some(d) = row.duration {
                line(&mut by_queue, queue).mean_out_of_scope.add(d);
            }
        }
    }

    // Out-of-scope counts come from the protocol-deduplicated view: the one
    // place the engine deduplicates explicitly.
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for row in &ds.rows {
        if !seen.insert(row.protocol.as_str()) {
            continue;
        }
        let Some(queue) = row.queue.as_deref() else {
            continue;
        };
        if !matches!(
            row.outcome,
            Some(Outcome::Registered) | Some(Outcome::Updated)
        ) {
            line(&mut by_queue, queue).out_of_scope += 1;
        }
    }

    Ok(by_queue.into_values().collect())
}

/// Registered/Updated split per module.
pub fn module_split(ds: &Dataset) -> AggResult<BTreeMap<String, OutcomeSplit>> {
    if !ds.schema.has_module {
        return Err(MissingColumns(vec![Column::Module]));
    }

    let mut by_module: BTreeMap<String, OutcomeSplit> = BTreeMap::new();
    for row in &ds.rows {
        let Some(module) = row.module.as_ref() else {
            continue;
        };
        match row.outcome {
            Some(Outcome::Registered) => {
                by_module.entry(module.clone()).or_default().registered += 1
            }
            Some(Outcome::Updated) => by_module.entry(module.clone()).or_default().updated += 1,
            _ => {}
        }
    }
    Ok(by_module)
}

/// Production counts per configured queue group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupProduction {
    pub registered: u64,
    pub updated: u64,
    pub out_of_scope: u64,
}

pub fn grouped_production(
    ds: &Dataset,
    config: &DeskConfig,
) -> AggResult<BTreeMap<String, GroupProduction>> {
    require_queue(ds)?;

    let group_of = |queue: &str| -> String {
        config
            .production_groups
            .iter()
            .find(|(_, queues)| queues.iter().any(|q| q == queue))
            .map(|(group, _)| group.clone())
            .unwrap_or_else(|| DeskConfig::FALLBACK_GROUP.to_string())
    };

    let mut by_group: BTreeMap<String, GroupProduction> = BTreeMap::new();
    for row in &ds.rows {
        let Some(queue) = row.queue.as_deref() else {
            continue;
        };
        let entry = by_group.entry(group_of(queue)).or_default();
        match row.outcome {
            Some(Outcome::Registered) => entry.registered += 1,
            Some(Outcome::Updated) => entry.updated += 1,
            _ => entry.out_of_scope += 1,
        }
    }
    Ok(by_group)
}

/// Mean duration and count per queue over Finalized rows: the per-analyst
/// queue table on the individual view.
pub fn queue_means_finalized(ds: &Dataset) -> AggResult<BTreeMap<QueueName, MeanAcc>> {
    require_queue(ds)?;

    let mut by_queue: BTreeMap<QueueName, MeanAcc> = BTreeMap::new();
    for row in &ds.rows {
        if row.status != crate::record::TaskStatus::Finalized {
            continue;
        }
        if let Some(queue) = row.queue.as_ref() {
            by_queue.entry(queue.clone()).or_default().observe(row.duration);
        }
    }
    Ok(by_queue)
}

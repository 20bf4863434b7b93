//! Parameterized analyst rankings with quartile banding.
//!
//! Every ranked view is the same operation configured differently: filter
//! rows by outcome set and queue allow/deny list, group by analyst, count
//! per outcome and average the durations, then sort by total volume. Tied
//! totals keep a deterministic order: assignee name ascending.

use crate::aggregate::{AggResult, MeanAcc, MissingColumns};
use crate::config::DeskConfig;
use crate::dataset::Dataset;
use crate::record::{Column, Outcome};
use crate::types::Assignee;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Specs ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueFilter {
    /// No queue restriction (works on datasets without a queue column).
    Any,
    /// Only rows in one of these queues.
    Allow(Vec<String>),
    /// Rows in any queue except these.
    Deny(Vec<String>),
}

impl QueueFilter {
    fn matches(&self, queue: Option<&str>) -> bool {
        match self {
            QueueFilter::Any => true,
            QueueFilter::Allow(list) => {
                queue.is_some_and(|q| list.iter().any(|allowed| allowed == q))
            }
            QueueFilter::Deny(list) => {
                !queue.is_some_and(|q| list.iter().any(|denied| denied == q))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingSpec {
    pub name: String,
    pub outcomes: Vec<Outcome>,
    pub queues: QueueFilter,
}

/// The named ranked views the dashboard offers, built from configuration.
pub fn catalog(config: &DeskConfig) -> Vec<RankingSpec> {
    vec![
        RankingSpec {
            name: "overall".into(),
            outcomes: vec![Outcome::Registered, Outcome::Distributed, Outcome::Updated],
            queues: QueueFilter::Any,
        },
        RankingSpec {
            name: "updates".into(),
            outcomes: vec![Outcome::Updated],
            queues: QueueFilter::Any,
        },
        RankingSpec {
            name: "judicial-registrations".into(),
            outcomes: vec![Outcome::Registered],
            queues: QueueFilter::Deny(config.registration_deny_queues.clone()),
        },
        RankingSpec {
            name: "pre-registration".into(),
            outcomes: vec![Outcome::Registered],
            queues: QueueFilter::Allow(config.pre_registration_queues.clone()),
        },
        RankingSpec {
            name: "court-orders".into(),
            outcomes: vec![Outcome::Registered],
            queues: QueueFilter::Allow(config.court_order_queues.clone()),
        },
        RankingSpec {
            name: "agency-registrations".into(),
            outcomes: vec![Outcome::Registered],
            queues: QueueFilter::Allow(config.agency_queues.clone()),
        },
        RankingSpec {
            name: "audit".into(),
            outcomes: vec![Outcome::Audited],
            queues: QueueFilter::Allow(config.audit_queues.clone()),
        },
        RankingSpec {
            name: "distribution".into(),
            outcomes: vec![Outcome::Distributed],
            queues: QueueFilter::Allow(config.distribution_queues.clone()),
        },
    ]
}

// ── Quartile bands ───────────────────────────────────────────────────────────

/// Presentation band for a rank position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Band {
    Top,
    UpperMid,
    LowerMid,
    Bottom,
}

/// Band size: fixed at 4 for large groups, else a quarter rounded up.
pub fn band_size(analysts: usize) -> usize {
    if analysts > 12 {
        4
    } else {
        analysts.div_ceil(4)
    }
}

pub fn band_for(position: usize, size: usize) -> Band {
    if size == 0 || position <= size {
        Band::Top
    } else if position <= 2 * size {
        Band::UpperMid
    } else if position <= 3 * size {
        Band::LowerMid
    } else {
        Band::Bottom
    }
}

// ── Ranking ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankEntry {
    /// Dense position starting at 1.
    pub position: usize,
    pub assignee: Assignee,
    pub registered: u64,
    pub updated: u64,
    pub distributed: u64,
    pub audited: u64,
    pub total: u64,
    pub mean: MeanAcc,
}

impl RankEntry {
    pub fn band(&self, table_band_size: usize) -> Band {
        band_for(self.position, table_band_size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingTable {
    pub spec_name: String,
    pub band_size: usize,
    pub entries: Vec<RankEntry>,
}

/// Rank the selected analysts under one spec. An empty selection ranks
/// everyone. Queue-restricted specs need the queue column.
pub fn rank(ds: &Dataset, spec: &RankingSpec, selected: &[String]) -> AggResult<RankingTable> {
    if spec.queues != QueueFilter::Any && !ds.schema.has_queue {
        return Err(MissingColumns(vec![Column::Queue]));
    }

    let mut grouped: BTreeMap<Assignee, RankEntry> = BTreeMap::new();

    for row in &ds.rows {
        let Some(outcome) = row.outcome.as_ref() else {
            continue;
        };
        if !spec.outcomes.contains(outcome)
            || !spec.queues.matches(row.queue.as_deref())
            || (!selected.is_empty() && !selected.iter().any(|s| *s == row.assignee))
        {
            continue;
        }

        let entry = grouped
            .entry(row.assignee.clone())
            .or_insert_with(|| RankEntry {
                position: 0,
                assignee: row.assignee.clone(),
                registered: 0,
                updated: 0,
                distributed: 0,
                audited: 0,
                total: 0,
                mean: MeanAcc::default(),
            });
        match outcome {
            Outcome::Registered => entry.registered += 1,
            Outcome::Updated => entry.updated += 1,
            Outcome::Distributed => entry.distributed += 1,
            Outcome::Audited => entry.audited += 1,
            _ => {}
        }
        entry.total += 1;
        if let Some(d) = row.duration {
            entry.mean.add(d);
        }
    }

    // BTreeMap iteration is assignee-ascending; the stable sort keeps that
    // order inside equal totals.
    let mut entries: Vec<RankEntry> = grouped.into_values().collect();
    entries.sort_by(|a, b| b.total.cmp(&a.total));
    for (index, entry) in entries.iter_mut().enumerate() {
        entry.position = index + 1;
    }

    let size = band_size(entries.len());
    Ok(RankingTable {
        spec_name: spec.name.clone(),
        band_size: size,
        entries,
    })
}

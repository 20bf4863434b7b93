//! The in-memory accumulated dataset and its schema capabilities.
//!
//! Column-existence checking happens once, at the store boundary: the
//! dataset is tagged with which optional columns it carries, and every
//! aggregation consumes the flags instead of re-deriving them.

use crate::config::DeskConfig;
use crate::record::{Column, RawRow, TaskRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ── Schema capabilities ──────────────────────────────────────────────────────

/// Which optional columns the accumulated snapshot carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaFlags {
    pub has_queue: bool,
    pub has_module: bool,
    pub has_start: bool,
}

impl SchemaFlags {
    /// Union of capabilities, used when appending an upload batch.
    pub fn merge(self, other: SchemaFlags) -> SchemaFlags {
        SchemaFlags {
            has_queue: self.has_queue || other.has_queue,
            has_module: self.has_module || other.has_module,
            has_start: self.has_start || other.has_start,
        }
    }
}

// ── Dataset ──────────────────────────────────────────────────────────────────

/// The accumulated per-user dataset. Append-only across uploads; all
/// aggregation reads are non-mutating projections.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub rows: Vec<TaskRecord>,
    pub schema: SchemaFlags,
}

impl Dataset {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row-wise append of an upload batch. No dedup, no validation.
    pub fn append(&mut self, rows: Vec<TaskRecord>, flags: SchemaFlags) {
        self.rows.extend(rows);
        self.schema = self.schema.merge(flags);
    }

    pub fn filter_assignee(&self, assignee: &str) -> Dataset {
        Dataset {
            rows: self
                .rows
                .iter()
                .filter(|r| r.assignee == assignee)
                .cloned()
                .collect(),
            schema: self.schema,
        }
    }

    pub fn filter_assignees(&self, assignees: &[String]) -> Dataset {
        Dataset {
            rows: self
                .rows
                .iter()
                .filter(|r| assignees.iter().any(|a| *a == r.assignee))
                .cloned()
                .collect(),
            schema: self.schema,
        }
    }

    /// Rows whose completion date falls inside the range. Rows without a
    /// completion instant never match.
    pub fn filter_range(&self, range: &DateRange) -> Dataset {
        Dataset {
            rows: self
                .rows
                .iter()
                .filter(|r| r.completed_date().is_some_and(|d| range.contains(d)))
                .cloned()
                .collect(),
            schema: self.schema,
        }
    }

    pub fn assignees(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rows.iter().map(|r| r.assignee.clone()).collect();
        names.sort();
        names.dedup();
        names
    }
}

// ── Date ranges ──────────────────────────────────────────────────────────────

/// Inclusive completion-date filter. An inverted range is a user input
/// mistake: it is logged and then matches nothing, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start > end {
            log::warn!("date range starts after it ends ({start} > {end}); no rows will match");
        }
        Self { start, end }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && day <= self.end
    }
}

// ── Upload parsing ───────────────────────────────────────────────────────────

/// Parse an upload batch into typed records, exactly once.
///
/// Known-irrelevant columns are removed before schema detection, so a stray
/// column cannot flag a capability the data does not really have.
pub fn parse_upload(raw_rows: &[RawRow], config: &DeskConfig) -> (Vec<TaskRecord>, SchemaFlags) {
    let mut rows = Vec::with_capacity(raw_rows.len());
    let mut flags = SchemaFlags::default();

    for raw in raw_rows {
        let mut raw = raw.clone();
        for dropped in &config.dropped_columns {
            raw.remove(dropped);
        }

        flags.has_queue |= raw.has(Column::Queue.header());
        flags.has_module |= raw.has(Column::Module.header());
        flags.has_start |= raw.has(Column::StartedAt.header());

        rows.push(raw.to_record());
    }

    (rows, flags)
}

//! Task record types and the canonical column schema.
//!
//! A `TaskRecord` is one row of the accumulated dataset, fully typed.
//! Raw upload rows (`RawRow`) carry text columns keyed case-insensitively;
//! they are parsed into `TaskRecord`s exactly once, at the store boundary.

use crate::timefmt;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ── Canonical columns ────────────────────────────────────────────────────────

/// The canonical column set of the accumulated dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Column {
    Protocol,
    Assignee,
    Status,
    Duration,
    CompletedAt,
    StartedAt,
    Outcome,
    Queue,
    Module,
    Justification,
}

impl Column {
    /// Header name as expected in upload files (matched case-insensitively).
    pub fn header(self) -> &'static str {
        match self {
            Column::Protocol => "PROTOCOL NUMBER",
            Column::Assignee => "COMPLETED BY",
            Column::Status => "TASK STATUS",
            Column::Duration => "OPERATIONAL DURATION",
            Column::CompletedAt => "COMPLETED AT",
            Column::StartedAt => "STARTED AT",
            Column::Outcome => "OUTCOME",
            Column::Queue => "QUEUE",
            Column::Module => "MODULE",
            Column::Justification => "JUSTIFICATION",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

// ── Task status ──────────────────────────────────────────────────────────────

/// Lifecycle state of a task; free text in source data, so unknown labels
/// are preserved rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Finalized,
    Cancelled,
    InProgress,
    Other(String),
}

impl TaskStatus {
    pub fn parse(text: &str) -> Self {
        match text.trim().to_uppercase().as_str() {
            "FINALIZED" => TaskStatus::Finalized,
            "CANCELLED" | "CANCELED" => TaskStatus::Cancelled,
            "IN PROGRESS" | "IN_PROGRESS" => TaskStatus::InProgress,
            other => TaskStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Finalized => "FINALIZED",
            TaskStatus::Cancelled => "CANCELLED",
            TaskStatus::InProgress => "IN PROGRESS",
            TaskStatus::Other(label) => label,
        }
    }

    /// Finalized and Cancelled rows are the ones that count toward
    /// duration-based metrics.
    pub fn is_closed(&self) -> bool {
        matches!(self, TaskStatus::Finalized | TaskStatus::Cancelled)
    }
}

// ── Outcome ──────────────────────────────────────────────────────────────────

/// Finalization kind. Drives which correction and aggregation rules apply.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Outcome {
    Registered,
    Updated,
    Distributed,
    Audited,
    BulkClosed,
    Other(String),
}

impl Outcome {
    pub fn parse(text: &str) -> Self {
        match text.trim().to_uppercase().as_str() {
            "REGISTERED" => Outcome::Registered,
            "UPDATED" => Outcome::Updated,
            "DISTRIBUTED" => Outcome::Distributed,
            "AUDITED" => Outcome::Audited,
            "BULK CLOSED" | "BULK_CLOSED" => Outcome::BulkClosed,
            other => Outcome::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Outcome::Registered => "REGISTERED",
            Outcome::Updated => "UPDATED",
            Outcome::Distributed => "DISTRIBUTED",
            Outcome::Audited => "AUDITED",
            Outcome::BulkClosed => "BULK CLOSED",
            Outcome::Other(label) => label,
        }
    }
}

// ── Task record ──────────────────────────────────────────────────────────────

/// One row of the accumulated dataset.
///
/// `duration` is always the post-correction value; the pre-correction value
/// only survives in the correction log. An empty `assignee` means the source
/// row had no assignee column value (such rows are dropped before persistence).
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub protocol: String,
    pub assignee: String,
    pub status: TaskStatus,
    pub duration: Option<Duration>,
    pub completed_at: Option<NaiveDateTime>,
    pub started_at: Option<NaiveDateTime>,
    pub outcome: Option<Outcome>,
    pub queue: Option<String>,
    pub module: Option<String>,
    pub justification: String,
}

impl TaskRecord {
    pub fn completed_date(&self) -> Option<NaiveDate> {
        self.completed_at.map(|at| at.date())
    }

    pub fn month_key(&self) -> Option<crate::types::MonthKey> {
        use chrono::Datelike;
        self.completed_at.map(|at| (at.year(), at.month()))
    }
}

// ── Raw upload rows ──────────────────────────────────────────────────────────

/// One row of an upload file before typing: text columns keyed by header.
/// Headers are normalized to trimmed uppercase on insertion, so lookups are
/// case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    columns: BTreeMap<String, String>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, header: &str, value: &str) {
        self.columns
            .insert(header.trim().to_uppercase(), value.trim().to_string());
    }

    pub fn get(&self, header: &str) -> Option<&str> {
        self.columns
            .get(&header.trim().to_uppercase())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn has(&self, header: &str) -> bool {
        self.get(header).is_some()
    }

    pub fn remove(&mut self, header: &str) {
        self.columns.remove(&header.trim().to_uppercase());
    }

    pub fn column(&self, col: Column) -> Option<&str> {
        self.get(col.header())
    }

    /// Parse this row into a typed record. Unparseable duration and date
    /// values become `None`; a missing assignee becomes the empty string.
    pub fn to_record(&self) -> TaskRecord {
        TaskRecord {
            protocol: self
                .column(Column::Protocol)
                .unwrap_or_default()
                .to_string(),
            assignee: self
                .column(Column::Assignee)
                .unwrap_or_default()
                .to_string(),
            status: TaskStatus::parse(self.column(Column::Status).unwrap_or_default()),
            duration: self
                .column(Column::Duration)
                .and_then(timefmt::parse_duration),
            completed_at: self
                .column(Column::CompletedAt)
                .and_then(timefmt::parse_instant),
            started_at: self
                .column(Column::StartedAt)
                .and_then(timefmt::parse_instant),
            outcome: self.column(Column::Outcome).map(Outcome::parse),
            queue: self.column(Column::Queue).map(str::to_string),
            module: self.column(Column::Module).map(str::to_string),
            justification: self
                .column(Column::Justification)
                .unwrap_or_default()
                .to_string(),
        }
    }
}

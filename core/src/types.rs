//! Shared primitive types used across the entire engine.

/// Identifier of the user owning an accumulated dataset.
pub type UserId = String;

/// Analyst account name exactly as it appears in the source exports.
pub type Assignee = String;

/// Work queue label (free text, large fixed vocabulary).
pub type QueueName = String;

/// Calendar month key: `(year, month 1..=12)`.
pub type MonthKey = (i32, u32);

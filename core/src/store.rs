//! SQLite persistence layer.
//!
//! RULE: only store.rs talks to the database. Everything else works on the
//! in-memory [`Dataset`] the store hands out.
//!
//! One logical snapshot exists per user; saving replaces it wholesale, and
//! the correction log is likewise replaced on every save. Read failures of
//! any kind degrade to a fresh empty dataset; the engine never refuses to
//! start over an unreadable file.

use crate::config::DeskConfig;
use crate::correction::{self, CorrectionEntry};
use crate::dataset::{self, Dataset, SchemaFlags};
use crate::error::DeskResult;
use crate::record::{Outcome, RawRow, TaskRecord, TaskStatus};
use crate::timefmt;
use chrono::Duration;
use rusqlite::{params, Connection};

/// Note text persisted when a save altered nothing.
const NO_CORRECTIONS_NOTE: &str = "No duration corrections were necessary.";

pub struct DeskStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

/// What the last save recorded about duration corrections.
#[derive(Debug, Clone, PartialEq)]
pub enum CorrectionLog {
    Entries(Vec<CorrectionEntry>),
    Clean(String),
}

impl DeskStore {
    pub fn open(path: &str) -> DeskResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> DeskResult<Self> {
        let conn = Connection::open(":memory:")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database. In-memory stores get a
    /// fresh, isolated database.
    pub fn reopen(&self) -> DeskResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> DeskResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Load ───────────────────────────────────────────────────

    /// The user's accumulated dataset. Never fails: a missing or unreadable
    /// snapshot becomes an empty schema-correct dataset, and the empty shell
    /// is persisted so subsequent loads are stable.
    pub fn load(&self, user: &str) -> Dataset {
        match self.try_load(user) {
            Ok(Some(ds)) => ds,
            Ok(None) => {
                if let Err(e) = self.init_empty(user) {
                    log::warn!("could not persist empty dataset shell for {user}: {e}");
                }
                Dataset::empty()
            }
            Err(e) => {
                log::warn!("dataset for {user} unreadable ({e}); starting from empty");
                if let Err(e) = self.init_empty(user) {
                    log::warn!("could not persist empty dataset shell for {user}: {e}");
                }
                Dataset::empty()
            }
        }
    }

    fn try_load(&self, user: &str) -> DeskResult<Option<Dataset>> {
        let schema = {
            let mut stmt = self.conn.prepare(
                "SELECT has_queue, has_module, has_start FROM dataset_schema WHERE user_id = ?1",
            )?;
            let mut rows = stmt.query(params![user])?;
            match rows.next()? {
                None => return Ok(None),
                Some(row) => SchemaFlags {
                    has_queue: row.get::<_, i32>(0)? != 0,
                    has_module: row.get::<_, i32>(1)? != 0,
                    has_start: row.get::<_, i32>(2)? != 0,
                },
            }
        };

        let mut stmt = self.conn.prepare(
            "SELECT protocol, assignee, status, duration_secs, completed_at,
                    started_at, outcome, queue, module, justification
             FROM task WHERE user_id = ?1
             ORDER BY seq ASC",
        )?;
        let rows = stmt
            .query_map(params![user], task_row_mapper)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Dataset { rows, schema }))
    }

    fn init_empty(&self, user: &str) -> DeskResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO dataset_schema (user_id, has_queue, has_module, has_start)
             VALUES (?1, 0, 0, 0)",
            params![user],
        )?;
        Ok(())
    }

    // ── Save ───────────────────────────────────────────────────

    /// Persist a (possibly freshly merged) dataset: drop rows without a
    /// usable assignee, run the correction policy, replace the stored
    /// snapshot and the correction log. Returns the corrected dataset.
    pub fn save(
        &mut self,
        mut ds: Dataset,
        user: &str,
        config: &DeskConfig,
    ) -> DeskResult<Dataset> {
        // Known-irrelevant columns are already gone and justification is
        // already materialized; both happen at the raw-row boundary.
        ds.rows
            .retain(|row| !row.assignee.is_empty() && !config.is_automation_account(&row.assignee));

        let entries = correction::apply_policy(&mut ds.rows);
        log::info!(
            "saving dataset for {user}: {} rows, {} duration corrections",
            ds.rows.len(),
            entries.len(),
        );

        let tx = self.conn.transaction()?;

        tx.execute("DELETE FROM task WHERE user_id = ?1", params![user])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO task (user_id, protocol, assignee, status, duration_secs,
                                   completed_at, started_at, outcome, queue, module, justification)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for row in &ds.rows {
                insert.execute(params![
                    user,
                    &row.protocol,
                    &row.assignee,
                    row.status.as_str(),
                    row.duration.map(|d| d.num_seconds()),
                    row.completed_at.map(timefmt::format_instant),
                    row.started_at.map(timefmt::format_instant),
                    row.outcome.as_ref().map(|o| o.as_str().to_string()),
                    row.queue.as_deref(),
                    row.module.as_deref(),
                    &row.justification,
                ])?;
            }
        }

        tx.execute(
            "INSERT INTO dataset_schema (user_id, has_queue, has_module, has_start)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                has_queue = excluded.has_queue,
                has_module = excluded.has_module,
                has_start = excluded.has_start",
            params![
                user,
                ds.schema.has_queue as i32,
                ds.schema.has_module as i32,
                ds.schema.has_start as i32,
            ],
        )?;

        // Correction log is replaced per save, never appended across saves.
        tx.execute(
            "DELETE FROM correction_log WHERE user_id = ?1",
            params![user],
        )?;
        tx.execute(
            "DELETE FROM correction_note WHERE user_id = ?1",
            params![user],
        )?;
        if entries.is_empty() {
            tx.execute(
                "INSERT INTO correction_note (user_id, note) VALUES (?1, ?2)",
                params![user, NO_CORRECTIONS_NOTE],
            )?;
        } else {
            let mut insert = tx.prepare(
                "INSERT INTO correction_log (user_id, protocol, outcome, original_secs, corrected_secs)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for entry in &entries {
                insert.execute(params![
                    user,
                    &entry.protocol,
                    entry.outcome.as_str(),
                    entry.original.num_seconds(),
                    entry.corrected.num_seconds(),
                ])?;
            }
        }

        tx.commit()?;
        Ok(ds)
    }

    /// The full upload flow: load, parse the raw rows once, append, save.
    /// Taking `&mut self` keeps the load-merge-save sequence exclusive.
    pub fn ingest_upload(
        &mut self,
        user: &str,
        raw_rows: &[RawRow],
        config: &DeskConfig,
    ) -> DeskResult<Dataset> {
        let mut ds = self.load(user);
        let (rows, flags) = dataset::parse_upload(raw_rows, config);
        ds.append(rows, flags);
        self.save(ds, user, config)
    }

    // ── Correction log ─────────────────────────────────────────

    pub fn correction_log(&self, user: &str) -> DeskResult<CorrectionLog> {
        let mut stmt = self.conn.prepare(
            "SELECT protocol, outcome, original_secs, corrected_secs
             FROM correction_log WHERE user_id = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![user], |row| {
                Ok(CorrectionEntry {
                    protocol: row.get(0)?,
                    outcome: Outcome::parse(&row.get::<_, String>(1)?),
                    original: Duration::seconds(row.get(2)?),
                    corrected: Duration::seconds(row.get(3)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if !entries.is_empty() {
            return Ok(CorrectionLog::Entries(entries));
        }

        let note: Option<String> = {
            let mut stmt = self
                .conn
                .prepare("SELECT note FROM correction_note WHERE user_id = ?1")?;
            let mut rows = stmt.query(params![user])?;
            match rows.next()? {
                Some(row) => Some(row.get(0)?),
                None => None,
            }
        };
        Ok(CorrectionLog::Clean(
            note.unwrap_or_else(|| NO_CORRECTIONS_NOTE.to_string()),
        ))
    }

    // ── Test / summary helpers ─────────────────────────────────

    pub fn task_count(&self, user: &str) -> DeskResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM task WHERE user_id = ?1",
                params![user],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    pub fn correction_count(&self, user: &str) -> DeskResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM correction_log WHERE user_id = ?1",
                params![user],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }
}

fn task_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<TaskRecord> {
    Ok(TaskRecord {
        protocol: row.get(0)?,
        assignee: row.get(1)?,
        status: TaskStatus::parse(&row.get::<_, String>(2)?),
        duration: row
            .get::<_, Option<i64>>(3)?
            .map(Duration::seconds),
        completed_at: row
            .get::<_, Option<String>>(4)?
            .as_deref()
            .and_then(timefmt::parse_stored_instant),
        started_at: row
            .get::<_, Option<String>>(5)?
            .as_deref()
            .and_then(timefmt::parse_stored_instant),
        outcome: row
            .get::<_, Option<String>>(6)?
            .as_deref()
            .map(Outcome::parse),
        queue: row.get(7)?,
        module: row.get(8)?,
        justification: row.get(9)?,
    })
}

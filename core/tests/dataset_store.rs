use chrono::Duration;
use taskdesk_core::config::DeskConfig;
use taskdesk_core::record::{Outcome, RawRow};
use taskdesk_core::store::{CorrectionLog, DeskStore};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn make_store() -> DeskStore {
    let store = DeskStore::in_memory().unwrap();
    store.migrate().unwrap();
    store
}

fn raw_row(protocol: &str, assignee: &str, outcome: &str, duration: &str) -> RawRow {
    let mut row = RawRow::new();
    row.set("PROTOCOL NUMBER", protocol);
    row.set("COMPLETED BY", assignee);
    row.set("TASK STATUS", "Finalized");
    row.set("OPERATIONAL DURATION", duration);
    row.set("COMPLETED AT", "05/03/2025 10:00:00");
    row.set("OUTCOME", outcome);
    row
}

// ── Round trips ──────────────────────────────────────────────────────────────

/// Loading a freshly-initialized user yields an empty, schema-correct
/// dataset, and loading again still does.
#[test]
fn empty_dataset_round_trip() {
    let store = make_store();

    let first = store.load("ana");
    assert!(first.is_empty());
    assert!(!first.schema.has_queue);

    let second = store.load("ana");
    assert!(second.is_empty());
}

#[test]
fn saved_rows_come_back_typed() {
    let mut store = make_store();
    let config = DeskConfig::default();

    let mut row = raw_row("p1", "ana", "REGISTERED", "00:30:00");
    row.set("QUEUE", "COURT ORDERS");
    store.ingest_upload("ana", &[row], &config).unwrap();

    let ds = store.load("ana");
    assert_eq!(ds.len(), 1);
    assert!(ds.schema.has_queue);
    assert!(!ds.schema.has_start);

    let task = &ds.rows[0];
    assert_eq!(task.protocol, "p1");
    assert_eq!(task.outcome, Some(Outcome::Registered));
    assert_eq!(task.duration, Some(Duration::minutes(30)));
    assert_eq!(task.queue.as_deref(), Some("COURT ORDERS"));
    assert_eq!(task.justification, "");
}

#[test]
fn load_survives_a_missing_schema() {
    // No migrate: every table is missing. Reads must degrade to empty, not
    // error out.
    let store = DeskStore::in_memory().unwrap();
    let ds = store.load("ana");
    assert!(ds.is_empty());
}

// ── Save pipeline ────────────────────────────────────────────────────────────

#[test]
fn automation_and_unassigned_rows_are_dropped() {
    let mut store = make_store();
    let config = DeskConfig::default();

    let rows = vec![
        raw_row("p1", "ana", "REGISTERED", "00:30:00"),
        raw_row("p2", "RoboHub", "REGISTERED", "00:30:00"),
        {
            let mut r = RawRow::new();
            r.set("PROTOCOL NUMBER", "p3");
            r.set("OUTCOME", "REGISTERED");
            r
        },
    ];
    let ds = store.ingest_upload("ana", &rows, &config).unwrap();

    assert_eq!(ds.len(), 1);
    assert_eq!(ds.rows[0].protocol, "p1");
    assert_eq!(store.task_count("ana").unwrap(), 1);
}

#[test]
fn uploads_accumulate_without_dedup() {
    let mut store = make_store();
    let config = DeskConfig::default();

    let batch = vec![raw_row("p1", "ana", "REGISTERED", "00:30:00")];
    store.ingest_upload("ana", &batch, &config).unwrap();
    let ds = store.ingest_upload("ana", &batch, &config).unwrap();

    // Same protocol twice: the dataset only grows.
    assert_eq!(ds.len(), 2);
}

#[test]
fn dropped_columns_are_removed_before_schema_detection() {
    let mut store = make_store();
    let mut config = DeskConfig::default();
    config.dropped_columns.push("MODULE".into());

    let mut row = raw_row("p1", "ana", "REGISTERED", "00:30:00");
    row.set("NIP ID", "123");
    row.set("MODULE", "LEGACY");
    let ds = store.ingest_upload("ana", &[row], &config).unwrap();

    // A column on the drop list never reaches the typed record, so it
    // cannot flag a schema capability either.
    assert!(!ds.schema.has_module);
    assert_eq!(ds.rows[0].module, None);
}

// ── Correction log ───────────────────────────────────────────────────────────

/// End-to-end: 100 uploaded rows, 10 of them Registered under 19 minutes.
/// All ten get pinned to 20 minutes, the log holds exactly those ten, and
/// the persisted dataset reflects the corrected values.
#[test]
fn upload_corrections_end_to_end() {
    let mut store = make_store();
    let config = DeskConfig::default();

    let mut rows = Vec::new();
    for i in 0..90 {
        rows.push(raw_row(&format!("ok-{i}"), "ana", "REGISTERED", "00:30:00"));
    }
    for i in 0..10 {
        rows.push(raw_row(&format!("fast-{i}"), "ana", "REGISTERED", "00:10:00"));
    }

    let ds = store.ingest_upload("ana", &rows, &config).unwrap();

    let corrected: Vec<_> = ds
        .rows
        .iter()
        .filter(|r| r.duration == Some(Duration::minutes(20)))
        .collect();
    assert_eq!(corrected.len(), 10);
    assert_eq!(store.correction_count("ana").unwrap(), 10);

    match store.correction_log("ana").unwrap() {
        CorrectionLog::Entries(entries) => {
            assert_eq!(entries.len(), 10);
            assert!(entries.iter().all(|e| e.original == Duration::minutes(10)));
            assert!(entries.iter().all(|e| e.corrected == Duration::minutes(20)));
        }
        CorrectionLog::Clean(note) => panic!("expected correction entries, got: {note}"),
    }

    // The persisted means must reflect 20-minute durations, not 10.
    let reloaded = store.load("ana");
    let daily = taskdesk_core::aggregate::daily_mean_duration(&reloaded);
    let (_, acc) = daily.into_iter().next().unwrap();
    assert_eq!(acc.count(), 100);
    assert_eq!(acc.mean(), Duration::minutes(29));
}

#[test]
fn correction_log_is_replaced_not_appended() {
    let mut store = make_store();
    let config = DeskConfig::default();

    store
        .ingest_upload(
            "ana",
            &[raw_row("p1", "ana", "REGISTERED", "00:10:00")],
            &config,
        )
        .unwrap();
    assert_eq!(store.correction_count("ana").unwrap(), 1);

    // Second save corrects nothing new (the stored value is already
    // clamped), so the log collapses to the clean marker.
    let clean = vec![raw_row("p2", "ana", "UPDATED", "00:10:00")];
    store.ingest_upload("ana", &clean, &config).unwrap();

    match store.correction_log("ana").unwrap() {
        CorrectionLog::Clean(note) => assert!(!note.is_empty()),
        CorrectionLog::Entries(entries) => {
            panic!("expected clean marker, got {} entries", entries.len())
        }
    }
}

#[test]
fn unparseable_values_become_null_not_errors() {
    let mut store = make_store();
    let config = DeskConfig::default();

    let mut row = raw_row("p1", "ana", "REGISTERED", "twelve minutes-ish");
    row.set("COMPLETED AT", "not a date");
    let ds = store.ingest_upload("ana", &[row], &config).unwrap();

    assert_eq!(ds.rows[0].duration, None);
    assert_eq!(ds.rows[0].completed_at, None);
}

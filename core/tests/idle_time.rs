use chrono::{Duration, NaiveDate, NaiveDateTime};
use taskdesk_core::dataset::{Dataset, SchemaFlags};
use taskdesk_core::idle::{idle_per_day, mean_daily_idle, total_idle};
use taskdesk_core::record::{Outcome, TaskRecord, TaskStatus};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn instant(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, day)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .unwrap()
}

fn timed_task(assignee: &str, start: NaiveDateTime, end: NaiveDateTime) -> TaskRecord {
    TaskRecord {
        protocol: format!("{assignee}-{start}"),
        assignee: assignee.into(),
        status: TaskStatus::Finalized,
        duration: Some(end - start),
        completed_at: Some(end),
        started_at: Some(start),
        outcome: Some(Outcome::Registered),
        queue: None,
        module: None,
        justification: String::new(),
    }
}

fn dataset(rows: Vec<TaskRecord>) -> Dataset {
    Dataset {
        schema: SchemaFlags {
            has_queue: false,
            has_module: false,
            has_start: rows.iter().any(|r| r.started_at.is_some()),
        },
        rows,
    }
}

// ── Gap rules ────────────────────────────────────────────────────────────────

/// First task completes at 10:00, next starts at 10:45: 45 idle minutes.
#[test]
fn counts_gaps_under_an_hour() {
    let ds = dataset(vec![
        timed_task("ana", instant(5, 9, 30), instant(5, 10, 0)),
        timed_task("ana", instant(5, 10, 45), instant(5, 11, 0)),
    ]);

    let idle = idle_per_day(&ds).unwrap();
    let day = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
    assert_eq!(idle[&("ana".to_string(), day)], Duration::minutes(45));
}

#[test]
fn gaps_over_an_hour_count_as_zero() {
    let ds = dataset(vec![
        timed_task("ana", instant(5, 8, 0), instant(5, 9, 0)),
        timed_task("ana", instant(5, 11, 0), instant(5, 11, 30)),
    ]);

    let idle = idle_per_day(&ds).unwrap();
    assert!(idle.is_empty());
}

#[test]
fn overlapping_tasks_count_as_zero() {
    let ds = dataset(vec![
        timed_task("ana", instant(5, 9, 0), instant(5, 10, 0)),
        timed_task("ana", instant(5, 9, 55), instant(5, 10, 30)),
    ]);

    let idle = idle_per_day(&ds).unwrap();
    assert!(idle.is_empty());
}

#[test]
fn exactly_one_hour_still_counts() {
    let ds = dataset(vec![
        timed_task("ana", instant(5, 9, 0), instant(5, 10, 0)),
        timed_task("ana", instant(5, 11, 0), instant(5, 11, 30)),
    ]);

    let idle = idle_per_day(&ds).unwrap();
    let day = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
    assert_eq!(idle[&("ana".to_string(), day)], Duration::hours(1));
}

#[test]
fn gaps_never_cross_analysts() {
    let ds = dataset(vec![
        timed_task("ana", instant(5, 9, 0), instant(5, 10, 0)),
        timed_task("bia", instant(5, 10, 30), instant(5, 11, 0)),
    ]);

    let idle = idle_per_day(&ds).unwrap();
    assert!(idle.is_empty());
}

#[test]
fn gaps_sum_per_day() {
    let ds = dataset(vec![
        timed_task("ana", instant(5, 9, 0), instant(5, 9, 30)),
        timed_task("ana", instant(5, 9, 40), instant(5, 10, 0)),
        timed_task("ana", instant(5, 10, 20), instant(5, 11, 0)),
        timed_task("ana", instant(6, 9, 0), instant(6, 9, 30)),
        timed_task("ana", instant(6, 9, 45), instant(6, 10, 0)),
    ]);

    let idle = idle_per_day(&ds).unwrap();
    let day5 = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
    let day6 = NaiveDate::from_ymd_opt(2025, 3, 6).unwrap();
    assert_eq!(idle[&("ana".to_string(), day5)], Duration::minutes(30));
    assert_eq!(idle[&("ana".to_string(), day6)], Duration::minutes(15));

    let means = mean_daily_idle(&idle);
    assert_eq!(means["ana"], Duration::seconds(1350)); // (30m + 15m) / 2

    let totals = total_idle(&idle);
    assert_eq!(totals["ana"], Duration::minutes(45));
}

// ── Degradation ──────────────────────────────────────────────────────────────

#[test]
fn requires_the_start_column() {
    let mut row = timed_task("ana", instant(5, 9, 0), instant(5, 10, 0));
    row.started_at = None;
    let ds = dataset(vec![row]);

    let err = idle_per_day(&ds).unwrap_err();
    assert!(err.to_string().contains("STARTED AT"));
}

#[test]
fn rows_missing_instants_are_skipped() {
    let mut untimed = timed_task("ana", instant(5, 10, 10), instant(5, 10, 20));
    untimed.completed_at = None;

    let ds = dataset(vec![
        timed_task("ana", instant(5, 9, 0), instant(5, 10, 0)),
        untimed,
        timed_task("ana", instant(5, 10, 30), instant(5, 11, 0)),
    ]);

    let idle = idle_per_day(&ds).unwrap();
    let day = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
    assert_eq!(idle[&("ana".to_string(), day)], Duration::minutes(30));
}

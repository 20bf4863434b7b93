use chrono::{Duration, NaiveDate};
use taskdesk_core::correction::{apply_policy, corrected_duration};
use taskdesk_core::record::{Outcome, TaskRecord, TaskStatus};

fn rec(protocol: &str, outcome: Option<Outcome>, duration: Option<Duration>) -> TaskRecord {
    TaskRecord {
        protocol: protocol.into(),
        assignee: "ana".into(),
        status: TaskStatus::Finalized,
        duration,
        completed_at: NaiveDate::from_ymd_opt(2025, 3, 5)
            .and_then(|d| d.and_hms_opt(10, 0, 0)),
        started_at: None,
        outcome,
        queue: None,
        module: None,
        justification: String::new(),
    }
}

// ── Registered ───────────────────────────────────────────────────────────────

#[test]
fn fast_registrations_pin_to_twenty_minutes() {
    let got = corrected_duration(Duration::minutes(10), &Outcome::Registered);
    assert_eq!(got, Duration::minutes(20));

    let got = corrected_duration(Duration::minutes(18), &Outcome::Registered);
    assert_eq!(got, Duration::minutes(20));
}

#[test]
fn plausible_registrations_pass_through() {
    for minutes in [19, 20, 45, 120] {
        let d = Duration::minutes(minutes);
        assert_eq!(corrected_duration(d, &Outcome::Registered), d);
    }
}

#[test]
fn long_registrations_cap_at_two_hours() {
    let got = corrected_duration(Duration::hours(5), &Outcome::Registered);
    assert_eq!(got, Duration::hours(2));
}

// ── Updated ──────────────────────────────────────────────────────────────────

#[test]
fn updates_clamp_between_three_and_fifteen_minutes() {
    assert_eq!(
        corrected_duration(Duration::seconds(30), &Outcome::Updated),
        Duration::minutes(3)
    );
    assert_eq!(
        corrected_duration(Duration::minutes(10), &Outcome::Updated),
        Duration::minutes(10)
    );
    assert_eq!(
        corrected_duration(Duration::minutes(40), &Outcome::Updated),
        Duration::minutes(15)
    );
    // Even absurd values land inside the clamp, well under the global cap.
    assert_eq!(
        corrected_duration(Duration::hours(6), &Outcome::Updated),
        Duration::minutes(15)
    );
}

// ── Everything else ──────────────────────────────────────────────────────────

#[test]
fn other_outcomes_only_get_the_global_cap() {
    assert_eq!(
        corrected_duration(Duration::minutes(1), &Outcome::Distributed),
        Duration::minutes(1)
    );
    assert_eq!(
        corrected_duration(Duration::hours(3), &Outcome::Audited),
        Duration::hours(2)
    );
    assert_eq!(
        corrected_duration(Duration::hours(2), &Outcome::BulkClosed),
        Duration::hours(2)
    );
}

#[test]
fn policy_is_idempotent() {
    let samples = [
        (Duration::minutes(1), Outcome::Registered),
        (Duration::minutes(50), Outcome::Registered),
        (Duration::hours(4), Outcome::Registered),
        (Duration::seconds(10), Outcome::Updated),
        (Duration::hours(4), Outcome::Updated),
        (Duration::hours(4), Outcome::Distributed),
        (Duration::minutes(7), Outcome::Other("RECLASSIFIED".into())),
    ];
    for (d, outcome) in samples {
        let once = corrected_duration(d, &outcome);
        let twice = corrected_duration(once, &outcome);
        assert_eq!(once, twice, "not idempotent for {outcome:?} {d}");
    }
}

// ── apply_policy ─────────────────────────────────────────────────────────────

#[test]
fn apply_policy_rewrites_rows_and_logs_each_change() {
    let mut rows = vec![
        rec("p1", Some(Outcome::Registered), Some(Duration::minutes(10))),
        rec("p2", Some(Outcome::Registered), Some(Duration::minutes(30))),
        rec("p3", Some(Outcome::Updated), Some(Duration::minutes(40))),
        rec("p4", None, Some(Duration::hours(9))),
        rec("p5", Some(Outcome::Registered), None),
    ];

    let entries = apply_policy(&mut rows);

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].protocol, "p1");
    assert_eq!(entries[0].original, Duration::minutes(10));
    assert_eq!(entries[0].corrected, Duration::minutes(20));
    assert_eq!(entries[1].protocol, "p3");
    assert_eq!(entries[1].corrected, Duration::minutes(15));

    // Rows rewritten in place; untouched rows stay untouched.
    assert_eq!(rows[0].duration, Some(Duration::minutes(20)));
    assert_eq!(rows[1].duration, Some(Duration::minutes(30)));
    assert_eq!(rows[2].duration, Some(Duration::minutes(15)));
    assert_eq!(rows[3].duration, Some(Duration::hours(9)));
    assert_eq!(rows[4].duration, None);
}

use chrono::Duration;
use taskdesk_core::timefmt::{
    format_coarse, format_hms, format_long, parse_duration, parse_instant,
};

// ── Duration parsing ─────────────────────────────────────────────────────────

#[test]
fn parses_plain_hms() {
    assert_eq!(parse_duration("00:10:30"), Some(Duration::seconds(630)));
    assert_eq!(parse_duration(" 01:00:00 "), Some(Duration::hours(1)));
}

#[test]
fn parses_hms_with_unbounded_hours() {
    assert_eq!(
        parse_duration("25:03:10"),
        Some(Duration::seconds(25 * 3600 + 3 * 60 + 10))
    );
}

#[test]
fn parses_days_prefix() {
    assert_eq!(
        parse_duration("0 days 00:45:00"),
        Some(Duration::minutes(45))
    );
    assert_eq!(
        parse_duration("1 day 02:00:00"),
        Some(Duration::hours(26))
    );
}

#[test]
fn parses_fractional_seconds_by_truncating() {
    assert_eq!(
        parse_duration("00:00:10.500"),
        Some(Duration::seconds(10))
    );
}

#[test]
fn parses_unit_strings() {
    assert_eq!(parse_duration("15 min"), Some(Duration::minutes(15)));
    assert_eq!(parse_duration("1h 30m"), Some(Duration::minutes(90)));
    assert_eq!(parse_duration("90s"), Some(Duration::seconds(90)));
    assert_eq!(parse_duration("2 hours"), Some(Duration::hours(2)));
}

#[test]
fn rejects_garbage_and_negatives() {
    assert_eq!(parse_duration(""), None);
    assert_eq!(parse_duration("not a duration"), None);
    assert_eq!(parse_duration("-00:10:00"), None);
    assert_eq!(parse_duration("123"), None);
    assert_eq!(parse_duration("00:99:00"), None);
}

// ── Instant parsing ──────────────────────────────────────────────────────────

#[test]
fn parses_export_timestamps() {
    let at = parse_instant("05/03/2025 14:30:00").expect("should parse");
    assert_eq!(at.format("%Y-%m-%d %H:%M:%S").to_string(), "2025-03-05 14:30:00");
}

#[test]
fn bad_timestamps_become_none() {
    assert_eq!(parse_instant("2025-03-05 14:30:00"), None);
    assert_eq!(parse_instant("31/02/2025 00:00:00"), None);
    assert_eq!(parse_instant(""), None);
}

// ── Formatting ───────────────────────────────────────────────────────────────

#[test]
fn missing_durations_format_as_zero() {
    assert_eq!(format_hms(None), "00:00:00");
    assert_eq!(format_coarse(None), "0 min");
}

#[test]
fn coarse_format() {
    assert_eq!(format_coarse(Some(Duration::seconds(754))), "12 min 34s");
    assert_eq!(format_coarse(Some(Duration::zero())), "0 min 0s");
}

#[test]
fn hms_format_continues_past_24_hours() {
    let d = Duration::seconds(25 * 3600 + 3 * 60 + 10);
    assert_eq!(format_hms(Some(d)), "25:03:10");
}

#[test]
fn long_format_switches_at_one_hour() {
    assert_eq!(format_long(Some(Duration::seconds(303))), "5 min 3s");
    assert_eq!(format_long(Some(Duration::seconds(3903))), "1h 5m 3s");
}

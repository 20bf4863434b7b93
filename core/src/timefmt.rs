//! Duration and date normalization.
//!
//! Parsers never fail: unparseable input yields `None`. Formatters never
//! surface an error state: a missing duration renders as `"0 min"` or
//! `"00:00:00"` depending on the display context.

use chrono::{Duration, NaiveDateTime};

/// Source export timestamp layout.
const INSTANT_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

// ── Parsing ──────────────────────────────────────────────────────────────────

/// Parse a duration from any of the human text encodings seen in exports:
/// `"[N days ]HH:MM:SS"` (fractional seconds tolerated and truncated),
/// bare `"HH:MM:SS"` with unbounded hours, or unit strings such as
/// `"1h 30m 10s"`, `"45m"`, `"15 min"`, `"90 sec"`.
///
/// Negative or unparseable input yields `None`.
pub fn parse_duration(text: &str) -> Option<Duration> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.starts_with('-') {
        return None;
    }

    let lower = trimmed.to_lowercase();

    // "N days HH:MM:SS" / "N day HH:MM:SS" / "N days"
    if let Some(idx) = lower.find("day") {
        let day_count: i64 = lower[..idx].trim().parse().ok()?;
        if day_count < 0 {
            return None;
        }
        let rest = lower[idx..].trim_start_matches("days").trim_start_matches("day");
        let rest = rest.trim_start_matches(',').trim();
        let tail = if rest.is_empty() {
            0
        } else {
            parse_hms_seconds(rest)?
        };
        return Some(Duration::seconds(day_count * 86_400 + tail));
    }

    if trimmed.contains(':') {
        return parse_hms_seconds(trimmed).map(Duration::seconds);
    }

    parse_unit_seconds(&lower).map(Duration::seconds)
}

/// `HH:MM:SS[.frac]` with unbounded hours. Fractions are truncated.
fn parse_hms_seconds(text: &str) -> Option<i64> {
    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() != 3 {
        return None;
    }
    let hours: i64 = parts[0].trim().parse().ok()?;
    let minutes: i64 = parts[1].trim().parse().ok()?;
    let seconds_part = parts[2].trim();
    let seconds: i64 = match seconds_part.split_once('.') {
        Some((whole, _frac)) => whole.parse().ok()?,
        None => seconds_part.parse().ok()?,
    };
    if hours < 0 || !(0..60).contains(&minutes) || !(0..60).contains(&seconds) {
        return None;
    }
    Some(hours * 3600 + minutes * 60 + seconds)
}

/// Unit strings: `"1h 30m 10s"`, `"45m"`, `"15 min"`, `"90 sec"`, `"2 hours"`.
fn parse_unit_seconds(lower: &str) -> Option<i64> {
    let mut total: i64 = 0;
    let mut any = false;
    let mut value: Option<i64> = None;

    for token in lower
        .split(|c: char| c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        // Either a bare number, a bare unit, or a fused pair like "30m".
        let split_at = token
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(token.len());
        let (digits, unit) = token.split_at(split_at);

        if !digits.is_empty() {
            value = Some(digits.parse().ok()?);
        }
        if unit.is_empty() {
            continue;
        }

        let factor = match unit {
            "h" | "hr" | "hrs" | "hour" | "hours" => 3600,
            "m" | "min" | "mins" | "minute" | "minutes" => 60,
            "s" | "sec" | "secs" | "second" | "seconds" => 1,
            _ => return None,
        };
        total += value.take()? * factor;
        any = true;
    }

    // A trailing bare number without a unit is not a duration.
    if !any || value.is_some() {
        return None;
    }
    Some(total)
}

/// Parse a `DD/MM/YYYY HH:MM:SS` timestamp; `None` on failure.
pub fn parse_instant(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text.trim(), INSTANT_FORMAT).ok()
}

// ── Formatting ───────────────────────────────────────────────────────────────

/// Coarse UI display: `"12 min 34s"`. Missing values render as `"0 min"`.
pub fn format_coarse(duration: Option<Duration>) -> String {
    match duration {
        None => "0 min".to_string(),
        Some(d) => {
            let total = d.num_seconds().max(0);
            format!("{} min {}s", total / 60, total % 60)
        }
    }
}

/// Tabular display: zero-padded `"HH:MM:SS"`, hours continuing past 24
/// (`"25:03:10"`). Missing values render as `"00:00:00"`.
pub fn format_hms(duration: Option<Duration>) -> String {
    let total = duration.map(|d| d.num_seconds().max(0)).unwrap_or(0);
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Monthly table display: `"1h 5m 3s"` at or above one hour, else `"5 min 3s"`.
pub fn format_long(duration: Option<Duration>) -> String {
    let total = duration.map(|d| d.num_seconds().max(0)).unwrap_or(0);
    if total >= 3600 {
        format!("{}h {}m {}s", total / 3600, (total % 3600) / 60, total % 60)
    } else {
        format!("{} min {}s", total / 60, total % 60)
    }
}

/// Month label for report tables, e.g. `"April 2024"`.
pub fn month_label((year, month): crate::types::MonthKey) -> String {
    match chrono::NaiveDate::from_ymd_opt(year, month, 1) {
        Some(first) => first.format("%B %Y").to_string(),
        None => format!("{year}-{month:02}"),
    }
}

/// Timestamp rendering for persisted snapshots.
pub fn format_instant(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Inverse of [`format_instant`].
pub fn parse_stored_instant(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").ok()
}

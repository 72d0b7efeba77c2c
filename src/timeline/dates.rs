//! Timestamp parsing and the effective-date fallback chain
//!
//! start: `startDate` → `createdAt` → now
//! end:   `endDate` if strictly after start, otherwise start + 1 day

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use super::models::{DateSpan, Plan};

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parse a backend timestamp. Naive values are taken as UTC.
/// Returns `None` for empty or unparsable input.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_opt(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(parse_timestamp)
}

/// Start date the record itself provides (`startDate`, then `createdAt`)
pub fn declared_start(plan: &Plan) -> Option<DateTime<Utc>> {
    parse_opt(plan.start_date.as_deref()).or_else(|| parse_opt(plan.created_at.as_deref()))
}

pub fn effective_start(plan: &Plan, now: DateTime<Utc>) -> DateTime<Utc> {
    declared_start(plan).unwrap_or(now)
}

/// Effective `[start, end]` of a plan; `end` is always strictly after `start`
pub fn effective_span(plan: &Plan, now: DateTime<Utc>) -> DateSpan {
    let start = effective_start(plan, now);
    let end = parse_opt(plan.end_date.as_deref())
        .filter(|end| *end > start)
        .unwrap_or_else(|| start + Duration::days(1));
    DateSpan { start, end }
}

//! Timestamp normalizer.
//!
//! Terraform writes `@timestamp` as ISO 8601 with an explicit offset
//! (`2024-05-02T10:00:00.123456+03:00`), with a `Z` designator, or, from
//! older providers, with no offset at all. Offset-less values are taken as
//! UTC. Anything else is rejected and the caller substitutes its default,
//! including instants whose UTC year falls outside `1..=9999`.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Utc};

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Outcome of a fallible field lookup: either read from the record or
/// substituted by the caller's default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved<T> {
    Parsed(T),
    Defaulted(T),
}

impl<T> Resolved<T> {
    pub fn into_inner(self) -> T {
        match self {
            Resolved::Parsed(v) | Resolved::Defaulted(v) => v,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, Resolved::Defaulted(_))
    }
}

/// Years representable as four-digit RFC 3339 text once converted to UTC.
const UTC_YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

/// Parse one timestamp string. Returns `None` on any failure.
pub fn parse(input: &str) -> Option<DateTime<FixedOffset>> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    let parsed = match s.strip_suffix('Z').or_else(|| s.strip_suffix('z')) {
        Some(stripped) => parse_with_offset(&format!("{stripped}+00:00")),
        None => parse_with_offset(s).or_else(|| parse_naive(s).map(|naive| naive.and_utc().fixed_offset())),
    };
    parsed.filter(|ts| UTC_YEARS.contains(&ts.with_timezone(&Utc).year()))
}

/// Parse `value` or fall back to `default`, recording which one was used.
pub fn resolve(value: Option<&str>, default: DateTime<Utc>) -> Resolved<DateTime<Utc>> {
    match value.and_then(parse) {
        Some(ts) => Resolved::Parsed(ts.with_timezone(&Utc)),
        None => Resolved::Defaulted(default),
    }
}

fn parse_with_offset(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s).ok().or_else(|| {
        OFFSET_FORMATS
            .iter()
            .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
    })
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

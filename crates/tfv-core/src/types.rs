//! Core types for tfv-core.
//!
//! This module defines the data structures shared across the pipeline
//! layers: the normalised [`NormalizedLogRecord`], its [`Level`] and
//! [`Phase`], the per-ingestion [`IngestionStats`], and the persisted
//! [`StoredLog`] / [`Page`] shapes returned by the store and search layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One decoded input line: an arbitrary JSON object. Only exists while the
/// normalizer runs; it is persisted solely as the serialized `raw_payload`.
pub type RawLogEntry = serde_json::Map<String, serde_json::Value>;

/// A normalised log record produced by the normalizer and written to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedLogRecord {
    /// Severity, explicit (`@level`) or inferred from the message.
    pub level: Level,
    /// `@message`, or the empty string when absent.
    pub message: String,
    /// `@timestamp`, or the ingestion instant when absent or unparseable.
    pub timestamp: DateTime<Utc>,
    /// `@module`.
    pub module: Option<String>,
    /// `tf_req_id`: groups every record of one provider request.
    pub request_id: Option<String>,
    /// `tf_resource_type`.
    pub resource_type: Option<String>,
    /// `tf_rpc`.
    pub rpc_name: Option<String>,
    /// Set only on records that announce the start of an operation.
    pub phase: Option<Phase>,
    /// One key per HTTP body field present in the input; `None` when the
    /// field held no parseable JSON fragment.
    pub embedded_payloads: BTreeMap<String, Option<serde_json::Value>>,
    /// The input object re-serialized verbatim.
    pub raw_payload: String,
    pub read: bool,
}

// ---------------------------------------------------------------------------
// Level
// ---------------------------------------------------------------------------

/// Log severity.
///
/// The heuristic classifier only ever yields one of the four closed
/// variants. An explicit `@level` string is kept verbatim: exact lowercase
/// matches map onto the closed variants, anything else (`trace`, `ERROR`,
/// `notice`, ...) is preserved in [`Level::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Level {
    Error,
    Warn,
    Debug,
    Info,
    Other(String),
}

impl Level {
    pub fn as_str(&self) -> &str {
        match self {
            Level::Error => "error",
            Level::Warn => "warn",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Other(s) => s,
        }
    }

    /// Whether this level belongs to the closed `{error, warn, debug, info}` set.
    pub fn is_canonical(&self) -> bool {
        !matches!(self, Level::Other(_))
    }
}

impl From<String> for Level {
    fn from(s: String) -> Self {
        match s.as_str() {
            "error" => Level::Error,
            "warn" => Level::Warn,
            "debug" => Level::Debug,
            "info" => Level::Info,
            _ => Level::Other(s),
        }
    }
}

impl From<&str> for Level {
    fn from(s: &str) -> Self {
        Level::from(s.to_string())
    }
}

impl From<Level> for String {
    fn from(level: Level) -> Self {
        match level {
            Level::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// High-level Terraform operation stage announced by a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Plan,
    Apply,
    Validation,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Plan => "plan",
            Phase::Apply => "apply",
            Phase::Validation => "validation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "plan" => Some(Phase::Plan),
            "apply" => Some(Phase::Apply),
            "validation" => Some(Phase::Validation),
            _ => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Ingestion stats
// ---------------------------------------------------------------------------

/// Per-phase tallies for one ingestion call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseCounts {
    pub plan: usize,
    pub apply: usize,
    pub validation: usize,
}

impl PhaseCounts {
    pub fn record(&mut self, phase: Phase) {
        match phase {
            Phase::Plan => self.plan += 1,
            Phase::Apply => self.apply += 1,
            Phase::Validation => self.validation += 1,
        }
    }

    pub fn get(&self, phase: Phase) -> usize {
        match phase {
            Phase::Plan => self.plan,
            Phase::Apply => self.apply,
            Phase::Validation => self.validation,
        }
    }
}

/// Summary of one batch or file ingestion. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionStats {
    /// Non-empty lines (or batch items) seen.
    pub total: usize,
    /// Units that decoded and normalised successfully.
    pub parsed: usize,
    /// Units that failed to decode.
    pub errors: usize,
    /// Rows actually committed; `0` when the batch transaction rolled back.
    pub persisted: usize,
    pub phases: PhaseCounts,
}

// ---------------------------------------------------------------------------
// Persisted shapes
// ---------------------------------------------------------------------------

/// A record as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredLog {
    pub id: i64,
    #[serde(flatten)]
    pub record: NormalizedLogRecord,
    pub created_at: DateTime<Utc>,
}

/// One page of an ordered result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Matching rows across all pages.
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

impl<T> Page<T> {
    /// 1-based page number.
    pub fn page(&self) -> usize {
        if self.limit == 0 {
            1
        } else {
            self.offset / self.limit + 1
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_levels_round_trip_through_strings() {
        for s in ["error", "warn", "debug", "info"] {
            let level = Level::from(s);
            assert!(level.is_canonical());
            assert_eq!(String::from(level), s);
        }
    }

    #[test]
    fn unknown_levels_are_kept_verbatim() {
        let level = Level::from("TRACE");
        assert_eq!(level, Level::Other("TRACE".to_string()));
        assert_eq!(level.as_str(), "TRACE");
        assert!(!level.is_canonical());
    }

    #[test]
    fn level_serializes_as_plain_string() {
        let json = serde_json::to_string(&Level::Warn).unwrap();
        assert_eq!(json, "\"warn\"");
        let back: Level = serde_json::from_str("\"notice\"").unwrap();
        assert_eq!(back, Level::Other("notice".to_string()));
    }

    #[test]
    fn page_number_is_one_based() {
        let page: Page<()> = Page { items: vec![], total: 250, offset: 200, limit: 100 };
        assert_eq!(page.page(), 3);
    }
}

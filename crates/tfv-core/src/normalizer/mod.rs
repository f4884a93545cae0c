//! Normalizer — turns one decoded Terraform JSON log object into a
//! [`NormalizedLogRecord`](crate::NormalizedLogRecord).
//!
//! Normalization cannot fail. Each field degrades independently:
//!
//! | Field | Source | Fallback |
//! |-------|--------|----------|
//! | `timestamp` | `@timestamp` | ingestion time |
//! | `level` | `@level` | keyword heuristic, then `info` |
//! | `phase` | `@message` start phrases | none |
//! | `embedded_payloads` | HTTP body fields | `None` per field |
//!
//! Decoding the raw line happens before this stage, in the
//! [`ingestor`](crate::ingestor).

pub mod payload;
pub mod phase;
pub mod severity;
pub mod timestamp;

use crate::types::{NormalizedLogRecord, RawLogEntry};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

pub use payload::{Extraction, PayloadExtractor, PAYLOAD_FIELDS};
pub use phase::{PhaseDetector, PHASE_RULES};
pub use severity::{Classification, LevelSource, SeverityClassifier, SEVERITY_RULES};
pub use timestamp::Resolved;

/// Input keys read by the normalizer. Every other key survives only in
/// `raw_payload`.
pub mod fields {
    pub const LEVEL: &str = "@level";
    pub const MESSAGE: &str = "@message";
    pub const TIMESTAMP: &str = "@timestamp";
    pub const MODULE: &str = "@module";
    pub const REQUEST_ID: &str = "tf_req_id";
    pub const RESOURCE_TYPE: &str = "tf_resource_type";
    pub const RPC: &str = "tf_rpc";
}

/// Per-field outcome of one normalization, kept for inspection and tests.
/// [`Resolution::into_record`] discards the provenance.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub timestamp: Resolved<DateTime<Utc>>,
    pub level: Classification,
    pub payloads: BTreeMap<String, Extraction>,
    record: NormalizedLogRecord,
}

impl Resolution {
    pub fn record(&self) -> &NormalizedLogRecord {
        &self.record
    }

    pub fn into_record(self) -> NormalizedLogRecord {
        self.record
    }
}

/// Composes the four classifiers. Cheap to clone; construct once and share.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    severity: SeverityClassifier,
    phases: PhaseDetector,
    payloads: PayloadExtractor,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize using the current instant as the ingestion time.
    pub fn normalize(&self, raw: &RawLogEntry) -> NormalizedLogRecord {
        self.normalize_at(raw, Utc::now())
    }

    pub fn normalize_at(&self, raw: &RawLogEntry, ingested_at: DateTime<Utc>) -> NormalizedLogRecord {
        self.resolve(raw, ingested_at).into_record()
    }

    pub fn resolve(&self, raw: &RawLogEntry, ingested_at: DateTime<Utc>) -> Resolution {
        let message = text_field(raw, fields::MESSAGE).unwrap_or_default();
        let explicit_level = text_field(raw, fields::LEVEL);
        let level = self.severity.classify(explicit_level.as_deref(), &message);

        let raw_ts = raw.get(fields::TIMESTAMP).and_then(Value::as_str);
        let timestamp = timestamp::resolve(raw_ts, ingested_at);

        let payloads: BTreeMap<String, Extraction> = PAYLOAD_FIELDS
            .iter()
            .filter_map(|name| raw.get(*name).map(|v| (name.to_string(), self.payloads.extract(v))))
            .collect();

        let record = NormalizedLogRecord {
            level: level.level.clone(),
            phase: self.phases.detect(&message),
            timestamp: timestamp.into_inner(),
            module: text_field(raw, fields::MODULE),
            request_id: text_field(raw, fields::REQUEST_ID),
            resource_type: text_field(raw, fields::RESOURCE_TYPE),
            rpc_name: text_field(raw, fields::RPC),
            embedded_payloads: payloads
                .iter()
                .map(|(k, e)| (k.clone(), e.clone().into_value()))
                .collect(),
            raw_payload: Value::Object(raw.clone()).to_string(),
            read: false,
            message,
        };

        Resolution {
            timestamp,
            level,
            payloads,
            record,
        }
    }
}

/// Strings are taken as-is; other scalars are rendered as JSON text; null
/// and missing keys are absent.
fn text_field(raw: &RawLogEntry, key: &str) -> Option<String> {
    match raw.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

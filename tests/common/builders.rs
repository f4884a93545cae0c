//! Test builders — ergonomic constructors for raw Terraform log lines and
//! pre-seeded stores.
//!
//! These builders are designed for readability in test assertions, not for
//! production use. They panic on invalid input rather than returning `Result`.

use serde_json::{Map, Value};
use tfv::config::{SearchConfig, StoreConfig};
use tfv::{Ingestor, Normalizer, RawLogEntry, SearchIndex, Store};

// ---------------------------------------------------------------------------
// LineBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for one Terraform JSON log line.
///
/// # Example
///
/// ```rust
/// let raw = LineBuilder::new("provider timeout")
///     .level("error")
///     .request_id("abc-1")
///     .resource_type("aws_instance")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct LineBuilder {
    fields: Map<String, Value>,
}

impl LineBuilder {
    pub fn new(message: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("@message".into(), Value::String(message.into()));
        Self { fields }
    }

    pub fn level(self, level: &str) -> Self {
        self.field("@level", level)
    }

    pub fn timestamp(self, ts: &str) -> Self {
        self.field("@timestamp", ts)
    }

    pub fn module(self, module: &str) -> Self {
        self.field("@module", module)
    }

    pub fn request_id(self, id: &str) -> Self {
        self.field("tf_req_id", id)
    }

    pub fn resource_type(self, rt: &str) -> Self {
        self.field("tf_resource_type", rt)
    }

    pub fn rpc(self, rpc: &str) -> Self {
        self.field("tf_rpc", rpc)
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> RawLogEntry {
        self.fields
    }

    /// The entry serialized as one JSON line, without a trailing newline.
    pub fn line(self) -> String {
        Value::Object(self.fields).to_string()
    }
}

// ---------------------------------------------------------------------------
// Store helpers
// ---------------------------------------------------------------------------

/// An empty in-memory store.
pub fn memory_store() -> Store {
    Store::open(StoreConfig::in_memory()).expect("in-memory store")
}

/// An ingestor over a fresh in-memory store.
pub fn memory_ingestor() -> Ingestor {
    Ingestor::new(memory_store(), Normalizer::new())
}

/// Normalize and persist `lines`, returning the store.
pub fn seeded_store(lines: &[&str]) -> Store {
    let ingestor = memory_ingestor();
    let stats = ingestor
        .ingest_reader(lines.join("\n").as_bytes())
        .expect("ingest fixture corpus");
    assert_eq!(stats.errors, 0, "fixture corpus must be valid JSON lines");
    ingestor.store().clone()
}

/// A search index over `store`, FTS enabled or not.
pub fn index_over(store: &Store, full_text: bool) -> SearchIndex {
    let config = SearchConfig {
        full_text,
        ..SearchConfig::default()
    };
    SearchIndex::open(store.clone(), config)
}

/// Write `contents` to a fresh file inside `dir` and return its path.
pub fn write_log_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("write fixture file");
    path
}

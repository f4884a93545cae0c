//! Ingestor — drives the normalizer over line-delimited JSON and persists
//! the results.
//!
//! Every line (or batch item) is handled on its own: one that fails to decode
//! is counted in [`IngestionStats::errors`] and skipped. Successful records
//! are written in a single transaction once the whole source has been read.
//! An I/O error while reading aborts the call instead: nothing from that
//! source is committed and no stats are returned.
//!
//! File ingestion removes the source file on every exit path, including
//! errors, unless `ingest.delete_source` is off. A failed commit rolls the
//! batch back but the file is gone regardless: uploads are at-most-once.

use crate::config::IngestConfig;
use crate::normalizer::Normalizer;
use crate::store::Store;
use crate::types::{IngestionStats, NormalizedLogRecord, RawLogEntry};
use crate::Result;
use serde_json::Value;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct Ingestor {
    store: Store,
    normalizer: Normalizer,
    delete_source: bool,
}

impl Ingestor {
    pub fn new(store: Store, normalizer: Normalizer) -> Self {
        Self::with_config(store, normalizer, &IngestConfig::default())
    }

    pub fn with_config(store: Store, normalizer: Normalizer, config: &IngestConfig) -> Self {
        Self {
            store,
            normalizer,
            delete_source: config.delete_source,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Ingest one JSON object per line. Blank lines are skipped and not
    /// counted. Only a failure to read from `reader` is returned as an error,
    /// and it discards every record normalized so far.
    pub fn ingest_reader<R: BufRead>(&self, reader: R) -> Result<IngestionStats> {
        let mut batch = Batch::default();

        for (idx, line) in reader.split(b'\n').enumerate() {
            let line = line?;
            let line = line.trim_ascii();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_slice::<Value>(line) {
                Ok(Value::Object(raw)) => batch.accept(&self.normalizer, &raw),
                Ok(other) => {
                    tracing::warn!(line = idx + 1, kind = json_kind(&other), "skipping non-object line");
                    batch.reject();
                }
                Err(e) => {
                    tracing::warn!(line = idx + 1, error = %e, "skipping malformed line");
                    batch.reject();
                }
            }
        }

        Ok(self.persist(batch))
    }

    /// Ingest already-decoded values. Items that are not JSON objects count
    /// as errors.
    pub fn ingest_values<I>(&self, values: I) -> IngestionStats
    where
        I: IntoIterator<Item = Value>,
    {
        let mut batch = Batch::default();
        for value in values {
            match value {
                Value::Object(raw) => batch.accept(&self.normalizer, &raw),
                other => {
                    tracing::warn!(kind = json_kind(&other), "skipping non-object batch item");
                    batch.reject();
                }
            }
        }
        self.persist(batch)
    }

    /// Ingest an uploaded file, then remove it.
    pub fn ingest_file(&self, path: &Path) -> Result<IngestionStats> {
        let _cleanup = RemoveOnDrop {
            path,
            enabled: self.delete_source,
        };

        let file = std::fs::File::open(path)?;
        let stats = self.ingest_reader(std::io::BufReader::new(file))?;

        tracing::info!(
            path = %path.display(),
            total = stats.total,
            parsed = stats.parsed,
            errors = stats.errors,
            persisted = stats.persisted,
            "file ingested"
        );
        Ok(stats)
    }

    /// Run [`ingest_file`](Self::ingest_file) on the blocking pool. The
    /// handle may be dropped; completion is then only observable through
    /// the store's row count.
    pub fn spawn_file(&self, path: impl Into<PathBuf>) -> JoinHandle<Result<IngestionStats>> {
        let ingestor = self.clone();
        let path = path.into();
        tokio::task::spawn_blocking(move || {
            let result = ingestor.ingest_file(&path);
            if let Err(e) = &result {
                tracing::error!(path = %path.display(), error = %e, "background ingestion failed");
            }
            result
        })
    }

    /// [`spawn_file`](Self::spawn_file) and wait for it.
    pub async fn ingest_file_in_background(&self, path: impl Into<PathBuf>) -> Result<IngestionStats> {
        self.spawn_file(path).await?
    }

    fn persist(&self, batch: Batch) -> IngestionStats {
        let Batch { mut stats, records } = batch;
        match self.store.insert_many(&records) {
            Ok(ids) => stats.persisted = ids.len(),
            Err(e) => {
                tracing::error!(error = %e, parsed = stats.parsed, "batch commit failed; rolled back");
            }
        }
        stats
    }
}

#[derive(Default)]
struct Batch {
    stats: IngestionStats,
    records: Vec<NormalizedLogRecord>,
}

impl Batch {
    fn accept(&mut self, normalizer: &Normalizer, raw: &RawLogEntry) {
        let record = normalizer.normalize(raw);
        self.stats.total += 1;
        self.stats.parsed += 1;
        if let Some(phase) = record.phase {
            self.stats.phases.record(phase);
        }
        self.records.push(record);
    }

    fn reject(&mut self) {
        self.stats.total += 1;
        self.stats.errors += 1;
    }
}

struct RemoveOnDrop<'a> {
    path: &'a Path,
    enabled: bool,
}

impl Drop for RemoveOnDrop<'_> {
    fn drop(&mut self) {
        if !self.enabled {
            return;
        }
        match std::fs::remove_file(self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "source file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "could not remove source file"),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Search index manager — an FTS5 projection of the `logs` table.
//!
//! The index holds `(rowid = logs.id, level, message, resource_type,
//! timestamp)` and is never a source of truth. Initialization creates the
//! table, installs insert/delete triggers that mirror later writes, and
//! backfills any store rows not yet indexed. Backfill is insert-if-missing,
//! so it can run repeatedly and alongside ingestion.
//!
//! When FTS5 is unavailable, or a query against it fails and the index then
//! fails a health probe, the manager drops to [`IndexState::Unavailable`] and
//! serves text search by substring match against the store. Callers cannot
//! tell the two paths apart.

use crate::config::SearchConfig;
use crate::search::query::LogQuery;
use crate::store::{row_to_log, select_columns, Store};
use crate::types::{Page, StoredLog};
use crate::Result;
use parking_lot::RwLock;
use rusqlite::params;
use std::sync::Arc;

const CREATE_INDEX: &str = "
CREATE VIRTUAL TABLE IF NOT EXISTS logs_fts
    USING fts5(level, message, resource_type, timestamp);
CREATE TRIGGER IF NOT EXISTS logs_fts_ai AFTER INSERT ON logs BEGIN
    INSERT INTO logs_fts(rowid, level, message, resource_type, timestamp)
    VALUES (new.id, new.level, new.message, new.resource_type, new.timestamp);
END;
CREATE TRIGGER IF NOT EXISTS logs_fts_ad AFTER DELETE ON logs BEGIN
    DELETE FROM logs_fts WHERE rowid = old.id;
END;
";

const DROP_TRIGGERS: &str = "
DROP TRIGGER IF EXISTS logs_fts_ai;
DROP TRIGGER IF EXISTS logs_fts_ad;
";

const BACKFILL: &str = "
INSERT INTO logs_fts(rowid, level, message, resource_type, timestamp)
SELECT id, level, message, resource_type, timestamp FROM logs
WHERE id NOT IN (SELECT rowid FROM logs_fts)";

/// Whether text search goes through the FTS index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Available,
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct SearchIndex {
    store: Store,
    config: SearchConfig,
    state: Arc<RwLock<IndexState>>,
}

impl SearchIndex {
    /// Build the index over `store`. Never fails: any error leaves the
    /// manager in [`IndexState::Unavailable`].
    pub fn open(store: Store, config: SearchConfig) -> Self {
        let index = Self {
            store,
            config,
            state: Arc::new(RwLock::new(IndexState::Unavailable)),
        };
        index.refresh();
        index
    }

    pub fn state(&self) -> IndexState {
        *self.state.read()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Re-run initialization and backfill, returning the resulting state.
    pub fn refresh(&self) -> IndexState {
        if !self.config.full_text {
            tracing::info!("full-text index disabled; using substring search");
            return self.degrade();
        }

        match self.initialize() {
            Ok(backfilled) => {
                tracing::info!(backfilled, "full-text index ready");
                *self.state.write() = IndexState::Available;
                IndexState::Available
            }
            Err(e) => {
                tracing::warn!(error = %e, "full-text index unavailable; using substring search");
                self.degrade()
            }
        }
    }

    /// Index every store row that is not indexed yet. Returns rows added.
    pub fn backfill(&self) -> Result<usize> {
        self.store.with_connection(|c| c.execute(BACKFILL, []))
    }

    fn initialize(&self) -> Result<usize> {
        self.store.with_connection(|c| c.execute_batch(CREATE_INDEX))?;
        self.backfill()
    }

    fn degrade(&self) -> IndexState {
        *self.state.write() = IndexState::Unavailable;
        // Triggers must not outlive the index or store writes would start failing.
        if let Err(e) = self.store.with_connection(|c| c.execute_batch(DROP_TRIGGERS)) {
            tracing::warn!(error = %e, "could not drop index triggers");
        }
        IndexState::Unavailable
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Ranked text search, first `limit` hits.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<StoredLog>> {
        Ok(self.search_page(query, 0, limit)?.items)
    }

    /// Text search with pagination. Uses the FTS index when available and
    /// falls back to substring matching on any index failure. An empty query
    /// lists everything, newest first.
    pub fn search_page(&self, query: &str, offset: usize, limit: usize) -> Result<Page<StoredLog>> {
        let limit = self.config.clamp_limit(limit);
        let query = query.trim();

        if !query.is_empty() && self.state() == IndexState::Available {
            match self.fts_page(query, offset, limit) {
                Ok(page) => return Ok(page),
                Err(e) => {
                    tracing::debug!(query, error = %e, "full-text query failed; falling back");
                    self.probe();
                }
            }
        }

        self.store
            .find_page(&LogQuery::new().text(query).offset(offset).limit(limit))
    }

    /// Structured filter query against the store; independent of the index.
    pub fn filter(&self, query: &LogQuery) -> Result<Page<StoredLog>> {
        let mut query = query.clone();
        query.limit = self.config.clamp_limit(query.limit);
        self.store.find_page(&query)
    }

    fn fts_page(&self, query: &str, offset: usize, limit: usize) -> Result<Page<StoredLog>> {
        let sql = format!(
            "SELECT {} FROM logs l
             JOIN (SELECT rowid AS hit_id, rank AS hit_rank FROM logs_fts WHERE logs_fts MATCH ?1) h
               ON l.id = h.hit_id
             ORDER BY h.hit_rank, l.id
             LIMIT ?2 OFFSET ?3",
            select_columns(Some("l"))
        );

        self.store.with_connection(|c| {
            let total: i64 = c.query_row(
                "SELECT COUNT(*) FROM logs_fts WHERE logs_fts MATCH ?1",
                params![query],
                |r| r.get(0),
            )?;
            let mut stmt = c.prepare_cached(&sql)?;
            let items = stmt
                .query_map(params![query, limit as i64, offset as i64], row_to_log)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(Page {
                items,
                total: total.max(0) as usize,
                offset,
                limit,
            })
        })
    }

    /// A failed query may just be bad FTS syntax. Only a failed probe of
    /// the table itself marks the index unavailable.
    fn probe(&self) {
        let healthy = self
            .store
            .with_connection(|c| c.query_row("SELECT COUNT(*) FROM logs_fts", [], |r| r.get::<_, i64>(0)))
            .is_ok();
        if !healthy {
            tracing::warn!("full-text index failed health probe; degrading");
            self.degrade();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::Normalizer;
    use crate::types::RawLogEntry;
    use serde_json::json;

    fn raw(v: serde_json::Value) -> RawLogEntry {
        v.as_object().cloned().expect("object fixture")
    }

    fn seeded_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        let n = Normalizer::new();
        let records = [
            json!({"@message": "provider timeout while reading aws_instance.web", "tf_resource_type": "aws_instance"}),
            json!({"@message": "plan complete", "tf_http_res_body": "{\"vpc_id\":\"vpc-0badc0de\"}"}),
            json!({"@message": "apply complete"}),
        ]
        .into_iter()
        .map(|v| n.normalize(&raw(v)))
        .collect::<Vec<_>>();
        store.insert_many(&records).unwrap();
        store
    }

    fn fts_rows(store: &Store) -> i64 {
        store
            .with_connection(|c| c.query_row("SELECT COUNT(*) FROM logs_fts", [], |r| r.get(0)))
            .unwrap()
    }

    #[test]
    fn open_backfills_existing_rows() {
        let store = seeded_store();
        let index = SearchIndex::open(store.clone(), SearchConfig::default());
        assert_eq!(index.state(), IndexState::Available);
        assert_eq!(fts_rows(&store), 3);
    }

    #[test]
    fn backfill_is_idempotent() {
        let store = seeded_store();
        let index = SearchIndex::open(store.clone(), SearchConfig::default());
        assert_eq!(index.backfill().unwrap(), 0);
        assert_eq!(index.refresh(), IndexState::Available);
        assert_eq!(fts_rows(&store), 3);
    }

    #[test]
    fn later_inserts_are_mirrored_by_triggers() {
        let store = seeded_store();
        let index = SearchIndex::open(store.clone(), SearchConfig::default());
        store
            .insert_one(&Normalizer::new().normalize(&raw(json!({"@message": "drift detected"}))))
            .unwrap();
        assert_eq!(fts_rows(&store), 4);
        let hits = index.search("drift", 10).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn disabled_index_degrades_and_falls_back() {
        let store = seeded_store();
        let config = SearchConfig { full_text: false, ..SearchConfig::default() };
        let index = SearchIndex::open(store, config);
        assert_eq!(index.state(), IndexState::Unavailable);

        let hits = index.search("vpc-0badc0de", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.message, "plan complete");
    }

    #[test]
    fn syntax_error_falls_back_without_degrading() {
        let index = SearchIndex::open(seeded_store(), SearchConfig::default());
        // Unbalanced quote is an FTS5 syntax error.
        let hits = index.search("\"timeout", 10).unwrap();
        assert_eq!(hits.len(), 0);
        assert_eq!(index.state(), IndexState::Available);
    }

    #[test]
    fn dropped_index_degrades_and_keeps_writes_working() {
        let store = seeded_store();
        let index = SearchIndex::open(store.clone(), SearchConfig::default());
        store.with_connection(|c| c.execute_batch("DROP TABLE logs_fts")).unwrap();

        let hits = index.search("timeout", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(index.state(), IndexState::Unavailable);

        store
            .insert_one(&Normalizer::new().normalize(&raw(json!({"@message": "after"}))))
            .unwrap();
        assert_eq!(store.count().unwrap(), 4);
    }
}

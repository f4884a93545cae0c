//! Store — the SQLite `logs` table every other layer reads from.
//!
//! The store is the single source of truth; the search index is derived from
//! it. One connection is shared behind a mutex, so a [`Store`] handle is
//! cheap to clone and safe to move into background ingestion tasks.
//! Timestamps are written as fixed-width RFC 3339 UTC text, which keeps
//! `ORDER BY timestamp` and range comparisons chronological.

use crate::config::StoreConfig;
use crate::search::query::LogQuery;
use crate::types::{Level, NormalizedLogRecord, Page, Phase, StoredLog};
use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS logs (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    level             TEXT    NOT NULL,
    message           TEXT    NOT NULL,
    timestamp         TEXT    NOT NULL,
    module            TEXT,
    request_id        TEXT,
    resource_type     TEXT,
    rpc_name          TEXT,
    phase             TEXT,
    embedded_payloads TEXT    NOT NULL DEFAULT '{}',
    raw_payload       TEXT    NOT NULL,
    read              INTEGER NOT NULL DEFAULT 0,
    created_at        TEXT    NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_logs_level         ON logs(level);
CREATE INDEX IF NOT EXISTS idx_logs_timestamp     ON logs(timestamp);
CREATE INDEX IF NOT EXISTS idx_logs_request_id    ON logs(request_id);
CREATE INDEX IF NOT EXISTS idx_logs_resource_type ON logs(resource_type);
";

const INSERT_SQL: &str = "
INSERT INTO logs (level, message, timestamp, module, request_id, resource_type,
                  rpc_name, phase, embedded_payloads, raw_payload, read, created_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)";

/// Columns in the order [`row_to_log`] reads them.
const COLUMNS: [&str; 13] = [
    "id",
    "level",
    "message",
    "timestamp",
    "module",
    "request_id",
    "resource_type",
    "rpc_name",
    "phase",
    "embedded_payloads",
    "raw_payload",
    "read",
    "created_at",
];

/// Aggregate counts over the whole store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total: usize,
    pub unread: usize,
    pub levels: BTreeMap<String, usize>,
    /// Ten most frequent resource types, most frequent first.
    pub top_resources: Vec<(String, usize)>,
}

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
    config: StoreConfig,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.config.path)
            .finish_non_exhaustive()
    }
}

impl Store {
    pub fn open(config: StoreConfig) -> Result<Self> {
        tracing::debug!(path = %config.path.display(), "opening log store");

        let conn = if config.is_in_memory() {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let conn = Connection::open(&config.path)?;
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
            conn
        };
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            config,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(StoreConfig::in_memory())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Run `f` with exclusive access to the underlying connection.
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let conn = self.conn.lock();
        f(&conn).map_err(Error::from)
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    pub fn insert_one(&self, record: &NormalizedLogRecord) -> Result<i64> {
        let payloads = serde_json::to_string(&record.embedded_payloads)?;
        let now = encode_ts(Utc::now());
        let conn = self.conn.lock();
        {
            let mut stmt = conn.prepare_cached(INSERT_SQL)?;
            execute_insert(&mut stmt, record, &payloads, &now)?;
        }
        Ok(conn.last_insert_rowid())
    }

    /// Insert every record in one transaction. Nothing is written if any
    /// insert fails.
    pub fn insert_many(&self, records: &[NormalizedLogRecord]) -> Result<Vec<i64>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let payloads = records
            .iter()
            .map(|r| serde_json::to_string(&r.embedded_payloads))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let now = encode_ts(Utc::now());

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(records.len());
        {
            let mut stmt = tx.prepare_cached(INSERT_SQL)?;
            for (record, payloads) in records.iter().zip(&payloads) {
                execute_insert(&mut stmt, record, payloads, &now)?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;

        tracing::debug!(rows = ids.len(), "batch committed");
        Ok(ids)
    }

    /// Returns `false` when no record has this id.
    pub fn mark_read(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute("UPDATE logs SET read = 1 WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn get(&self, id: i64) -> Result<Option<StoredLog>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM logs WHERE id = ?1", select_columns(None));
        conn.query_row(&sql, params![id], row_to_log)
            .optional()
            .map_err(Into::into)
    }

    /// Like [`get`](Self::get) but a missing id is an error.
    pub fn require(&self, id: i64) -> Result<StoredLog> {
        self.get(id)?.ok_or(Error::NotFound { id })
    }

    pub fn find(&self, query: &LogQuery) -> Result<Vec<StoredLog>> {
        let (sql, params) = query.select_sql(&select_columns(None));
        let refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| &**p).collect();

        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(refs.as_slice(), row_to_log)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    pub fn find_page(&self, query: &LogQuery) -> Result<Page<StoredLog>> {
        let (sql, params) = query.count_sql();
        let refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| &**p).collect();
        let total: i64 = self.with_connection(|c| c.query_row(&sql, refs.as_slice(), |row| row.get(0)))?;

        Ok(Page {
            items: self.find(query)?,
            total: total.max(0) as usize,
            offset: query.offset,
            limit: query.limit,
        })
    }

    /// Every record carrying `request_id`, oldest first.
    pub fn chain(&self, request_id: &str) -> Result<Vec<StoredLog>> {
        let sql = format!(
            "SELECT {} FROM logs WHERE request_id = ?1 ORDER BY timestamp ASC, id ASC",
            select_columns(None)
        );
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(params![request_id], row_to_log)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    pub fn count(&self) -> Result<usize> {
        let n: i64 = self.with_connection(|c| c.query_row("SELECT COUNT(*) FROM logs", [], |r| r.get(0)))?;
        Ok(n.max(0) as usize)
    }

    pub fn resource_types(&self) -> Result<Vec<String>> {
        self.with_connection(|c| {
            let mut stmt = c.prepare_cached(
                "SELECT DISTINCT resource_type FROM logs
                 WHERE resource_type IS NOT NULL AND resource_type <> ''
                 ORDER BY resource_type",
            )?;
            let rows = stmt.query_map([], |r| r.get(0))?;
            rows.collect()
        })
    }

    pub fn stats(&self) -> Result<StoreStats> {
        self.with_connection(|c| {
            let (total, unread): (i64, i64) = c.query_row(
                "SELECT COUNT(*), COALESCE(SUM(read = 0), 0) FROM logs",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )?;

            let mut stmt = c.prepare_cached("SELECT level, COUNT(*) FROM logs GROUP BY level")?;
            let levels = stmt
                .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)? as usize)))?
                .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;

            let mut stmt = c.prepare_cached(
                "SELECT resource_type, COUNT(*) AS n FROM logs
                 WHERE resource_type IS NOT NULL
                 GROUP BY resource_type
                 ORDER BY n DESC, resource_type ASC
                 LIMIT 10",
            )?;
            let top_resources = stmt
                .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)? as usize)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(StoreStats {
                total: total.max(0) as usize,
                unread: unread.max(0) as usize,
                levels,
                top_resources,
            })
        })
    }
}

// ---------------------------------------------------------------------------
// Row mapping helpers (shared with the search index)
// ---------------------------------------------------------------------------

pub(crate) fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `id, level, ...` optionally prefixed with a table alias.
pub(crate) fn select_columns(alias: Option<&str>) -> String {
    match alias {
        Some(a) => COLUMNS.iter().map(|c| format!("{a}.{c}")).collect::<Vec<_>>().join(", "),
        None => COLUMNS.join(", "),
    }
}

fn execute_insert(
    stmt: &mut rusqlite::Statement<'_>,
    record: &NormalizedLogRecord,
    payloads: &str,
    created_at: &str,
) -> rusqlite::Result<usize> {
    stmt.execute(params![
        record.level.as_str(),
        record.message,
        encode_ts(record.timestamp),
        record.module,
        record.request_id,
        record.resource_type,
        record.rpc_name,
        record.phase.map(|p| p.as_str()),
        payloads,
        record.raw_payload,
        record.read,
        created_at,
    ])
}

pub(crate) fn row_to_log(row: &Row<'_>) -> rusqlite::Result<StoredLog> {
    let level: String = row.get(1)?;
    let phase: Option<String> = row.get(8)?;
    let payloads: String = row.get(9)?;

    Ok(StoredLog {
        id: row.get(0)?,
        record: NormalizedLogRecord {
            level: Level::from(level),
            message: row.get(2)?,
            timestamp: decode_ts(row, 3)?,
            module: row.get(4)?,
            request_id: row.get(5)?,
            resource_type: row.get(6)?,
            rpc_name: row.get(7)?,
            phase: phase.as_deref().and_then(Phase::parse),
            embedded_payloads: serde_json::from_str(&payloads)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e)))?,
            raw_payload: row.get(10)?,
            read: row.get(11)?,
        },
        created_at: decode_ts(row, 12)?,
    })
}

fn decode_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Structured query builder.
//!
//! A [`LogQuery`] is a conjunction of optional filters over the `logs`
//! table. Unset filters contribute nothing; results are always newest first.

use crate::store::encode_ts;
use crate::types::Level;
use chrono::{DateTime, Utc};
use rusqlite::ToSql;
use std::fmt::Write as _;

pub const DEFAULT_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct LogQuery {
    /// Case-insensitive substring of `message` or `raw_payload`.
    pub text: Option<String>,
    pub level: Option<Level>,
    pub resource_type: Option<String>,
    pub request_id: Option<String>,
    /// Inclusive lower bound on `timestamp`.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `timestamp`.
    pub end: Option<DateTime<Utc>>,
    pub unread_only: bool,
    pub offset: usize,
    pub limit: usize,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            text: None,
            level: None,
            resource_type: None,
            request_id: None,
            start: None,
            end: None,
            unread_only: false,
            offset: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl LogQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn level(mut self, level: impl Into<Level>) -> Self {
        self.level = Some(level.into());
        self
    }

    pub fn resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn between(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn unread_only(mut self) -> Self {
        self.unread_only = true;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// `SELECT <columns> FROM logs WHERE ... ORDER BY timestamp DESC LIMIT .. OFFSET ..`
    pub(crate) fn select_sql(&self, columns: &str) -> (String, Vec<Box<dyn ToSql>>) {
        let (where_clause, mut params) = self.where_clause();
        let mut sql = format!("SELECT {columns} FROM logs{where_clause}");

        write!(
            sql,
            " ORDER BY timestamp DESC, id DESC LIMIT ?{} OFFSET ?{}",
            params.len() + 1,
            params.len() + 2
        )
        .expect("writing to a String cannot fail");
        params.push(Box::new(self.limit as i64));
        params.push(Box::new(self.offset as i64));

        (sql, params)
    }

    /// `SELECT COUNT(*) FROM logs WHERE ...`, ignoring limit and offset.
    pub(crate) fn count_sql(&self) -> (String, Vec<Box<dyn ToSql>>) {
        let (where_clause, params) = self.where_clause();
        (format!("SELECT COUNT(*) FROM logs{where_clause}"), params)
    }

    fn where_clause(&self) -> (String, Vec<Box<dyn ToSql>>) {
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(text) = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            params.push(Box::new(format!("%{}%", escape_like(text))));
            let n = params.len();
            conditions.push(format!(
                "(message LIKE ?{n} ESCAPE '\\' OR raw_payload LIKE ?{n} ESCAPE '\\')"
            ));
        }

        if let Some(level) = &self.level {
            params.push(Box::new(level.as_str().to_string()));
            conditions.push(format!("level = ?{}", params.len()));
        }

        if let Some(resource_type) = &self.resource_type {
            params.push(Box::new(resource_type.clone()));
            conditions.push(format!("resource_type = ?{}", params.len()));
        }

        if let Some(request_id) = &self.request_id {
            params.push(Box::new(request_id.clone()));
            conditions.push(format!("request_id = ?{}", params.len()));
        }

        if let Some(start) = self.start {
            params.push(Box::new(encode_ts(start)));
            conditions.push(format!("timestamp >= ?{}", params.len()));
        }

        if let Some(end) = self.end {
            params.push(Box::new(encode_ts(end)));
            conditions.push(format!("timestamp <= ?{}", params.len()));
        }

        if self.unread_only {
            conditions.push("read = 0".to_string());
        }

        if conditions.is_empty() {
            (String::new(), params)
        } else {
            (format!(" WHERE {}", conditions.join(" AND ")), params)
        }
    }
}

/// Escape `LIKE` wildcards so `text` matches literally.
fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_query_has_no_where_clause() {
        let (sql, params) = LogQuery::new().select_sql("id");
        assert_eq!(sql, "SELECT id FROM logs ORDER BY timestamp DESC, id DESC LIMIT ?1 OFFSET ?2");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn filters_are_conjoined_in_order() {
        let q = LogQuery::new()
            .text("timeout")
            .level(Level::Error)
            .resource_type("aws_instance")
            .unread_only();
        let (sql, params) = q.count_sql();
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM logs WHERE (message LIKE ?1 ESCAPE '\\' OR raw_payload LIKE ?1 ESCAPE '\\') \
             AND level = ?2 AND resource_type = ?3 AND read = 0"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn blank_text_is_ignored() {
        let (sql, _) = LogQuery::new().text("   ").count_sql();
        assert_eq!(sql, "SELECT COUNT(*) FROM logs");
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_done\\"), "100\\%\\_done\\\\");
    }
}

//! Structure analysis — a dry run over a log file that reports which levels,
//! modules, resource types and RPCs it contains without storing anything.

use crate::normalizer::{fields, timestamp};
use crate::Result;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::io::BufRead;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogStructure {
    pub total_lines: usize,
    pub valid_json: usize,
    /// `@level` values as written; `unknown` when missing.
    pub levels: BTreeMap<String, usize>,
    /// `@module` values; `unknown` when missing.
    pub modules: BTreeMap<String, usize>,
    pub resource_types: BTreeMap<String, usize>,
    pub rpc_types: BTreeMap<String, usize>,
    /// Lines whose `@timestamp` parses.
    pub timestamp_format_ok: usize,
    pub common_fields: BTreeSet<String>,
}

pub fn analyze_file(path: &Path) -> Result<LogStructure> {
    let file = std::fs::File::open(path)?;
    analyze_reader(std::io::BufReader::new(file))
}

pub fn analyze_reader<R: BufRead>(reader: R) -> Result<LogStructure> {
    let mut out = LogStructure::default();

    for line in reader.split(b'\n') {
        let line = line?;
        let line = line.trim_ascii();
        if line.is_empty() {
            continue;
        }
        out.total_lines += 1;

        let Ok(Value::Object(raw)) = serde_json::from_slice::<Value>(line) else {
            continue;
        };
        out.valid_json += 1;
        out.common_fields.extend(raw.keys().cloned());

        let level = raw.get(fields::LEVEL).and_then(Value::as_str).unwrap_or("unknown");
        *out.levels.entry(level.to_string()).or_default() += 1;

        let module = raw.get(fields::MODULE).and_then(Value::as_str).unwrap_or("unknown");
        *out.modules.entry(module.to_string()).or_default() += 1;

        if let Some(rt) = raw.get(fields::RESOURCE_TYPE).and_then(Value::as_str).filter(|s| !s.is_empty()) {
            *out.resource_types.entry(rt.to_string()).or_default() += 1;
        }
        if let Some(rpc) = raw.get(fields::RPC).and_then(Value::as_str).filter(|s| !s.is_empty()) {
            *out.rpc_types.entry(rpc.to_string()).or_default() += 1;
        }

        if raw
            .get(fields::TIMESTAMP)
            .and_then(Value::as_str)
            .and_then(timestamp::parse)
            .is_some()
        {
            out.timestamp_format_ok += 1;
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_structure_without_persisting() {
        let input = concat!(
            r#"{"@level":"info","@module":"terraform.ui","@timestamp":"2024-05-02T10:00:00Z","@message":"x"}"#,
            "\n",
            r#"{"@level":"debug","tf_resource_type":"aws_instance","tf_rpc":"PlanResourceChange","@timestamp":"bad"}"#,
            "\n",
            "not json\n",
            "\n",
            r#"{"@message":"no level"}"#,
        );

        let s = analyze_reader(input.as_bytes()).unwrap();
        assert_eq!(s.total_lines, 4);
        assert_eq!(s.valid_json, 3);
        assert_eq!(s.levels.get("unknown"), Some(&1));
        assert_eq!(s.levels.get("debug"), Some(&1));
        assert_eq!(s.modules.get("terraform.ui"), Some(&1));
        assert_eq!(s.modules.get("unknown"), Some(&2));
        assert_eq!(s.resource_types.get("aws_instance"), Some(&1));
        assert_eq!(s.rpc_types.get("PlanResourceChange"), Some(&1));
        assert_eq!(s.timestamp_format_ok, 1);
        assert!(s.common_fields.contains("tf_rpc"));
        assert!(s.common_fields.contains("@message"));
    }
}

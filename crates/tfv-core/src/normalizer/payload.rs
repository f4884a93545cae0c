//! Embedded-payload extractor.
//!
//! Provider SDK debug logs carry HTTP bodies in `tf_http_req_body` and
//! `tf_http_res_body`, often wrapped in surrounding text. The extractor takes
//! the widest `{...}` or `[...]` span and tries to parse it as JSON. This is
//! best effort: several fragments in one field, or braces inside string
//! literals, can select the wrong span, in which case nothing is extracted.

use regex::Regex;
use serde_json::Value;

/// Fields scanned for embedded JSON.
pub const PAYLOAD_FIELDS: [&str; 2] = ["tf_http_req_body", "tf_http_res_body"];

/// Outcome of scanning one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Parsed(Value),
    /// Not a string, or an empty one.
    NotText,
    /// No brace or bracket span found.
    NoFragment,
    /// A span was found but is not valid JSON.
    Malformed,
}

impl Extraction {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Extraction::Parsed(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PayloadExtractor {
    span: Regex,
}

impl PayloadExtractor {
    pub fn new() -> Self {
        Self {
            span: Regex::new(r"(?s)(\{.*\}|\[.*\])").expect("payload span regex is valid"),
        }
    }

    pub fn extract(&self, value: &Value) -> Extraction {
        let text = match value.as_str() {
            Some(s) if !s.is_empty() => s,
            _ => return Extraction::NotText,
        };

        let Some(m) = self.span.find(text) else {
            return Extraction::NoFragment;
        };

        match serde_json::from_str(m.as_str()) {
            Ok(v) => Extraction::Parsed(v),
            Err(e) => {
                tracing::trace!(error = %e, "embedded payload is not valid json");
                Extraction::Malformed
            }
        }
    }
}

impl Default for PayloadExtractor {
    fn default() -> Self {
        Self::new()
    }
}

//! Severity classifier.
//!
//! An explicit `@level` wins verbatim. Otherwise the message is tested
//! against [`SEVERITY_RULES`] in order and the first group with a matching
//! keyword decides; a message matching nothing is `info`.

use crate::types::Level;
use regex::Regex;

/// Keyword groups in priority order. A message containing both an
/// error-class and an info-class keyword is `error`.
pub const SEVERITY_RULES: [(Level, &[&str]); 4] = [
    (Level::Error, &["error", "failed", "exception", "fatal"]),
    (Level::Warn, &["warn", "attention", "caution"]),
    (Level::Debug, &["debug", "trace"]),
    (Level::Info, &["info", "message", "starting", "completed"]),
];

/// Where a classified level came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelSource {
    /// Non-empty `@level` field, used verbatim.
    Explicit,
    /// Keyword match against the message.
    Keyword,
    /// Nothing matched.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub level: Level,
    pub source: LevelSource,
}

#[derive(Debug, Clone)]
pub struct SeverityClassifier {
    rules: Vec<(Level, Regex)>,
}

impl SeverityClassifier {
    pub fn new() -> Self {
        let rules = SEVERITY_RULES
            .iter()
            .map(|(level, keywords)| (level.clone(), keyword_regex(keywords)))
            .collect();
        Self { rules }
    }

    pub fn classify(&self, explicit: Option<&str>, message: &str) -> Classification {
        if let Some(level) = explicit.filter(|l| !l.is_empty()) {
            return Classification {
                level: Level::from(level),
                source: LevelSource::Explicit,
            };
        }

        let lowered = message.to_lowercase();
        self.rules
            .iter()
            .find(|(_, re)| re.is_match(&lowered))
            .map(|(level, _)| Classification {
                level: level.clone(),
                source: LevelSource::Keyword,
            })
            .unwrap_or(Classification {
                level: Level::Info,
                source: LevelSource::Fallback,
            })
    }
}

impl Default for SeverityClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn keyword_regex(keywords: &[&str]) -> Regex {
    let alternation = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i){alternation}")).expect("severity keywords are valid regex")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

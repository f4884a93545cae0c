//! Phase detector — tags records that announce the start of a plan, apply
//! or validation run. Stateless; surrounding records are never inspected.

use crate::types::Phase;
use regex::Regex;

/// Start-of-operation phrases, tested in order.
pub const PHASE_RULES: [(Phase, &str); 3] = [
    (Phase::Plan, "starting Plan operation"),
    (Phase::Apply, "starting Apply operation"),
    (Phase::Validation, "running validation operation"),
];

#[derive(Debug, Clone)]
pub struct PhaseDetector {
    rules: Vec<(Phase, Regex)>,
}

impl PhaseDetector {
    pub fn new() -> Self {
        let rules = PHASE_RULES
            .iter()
            .map(|(phase, phrase)| {
                let re = Regex::new(&format!("(?i){}", regex::escape(phrase)))
                    .expect("phase phrases are valid regex");
                (*phase, re)
            })
            .collect();
        Self { rules }
    }

    pub fn detect(&self, message: &str) -> Option<Phase> {
        self.rules
            .iter()
            .find(|(_, re)| re.is_match(message))
            .map(|(phase, _)| *phase)
    }
}

impl Default for PhaseDetector {
    fn default() -> Self {
        Self::new()
    }
}

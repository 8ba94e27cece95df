//! Weak-supervision labeling rules.
//!
//! The rule table maps each taxonomy label to a group of case-insensitive
//! patterns. A label fires when any pattern in its group matches; labels are
//! evaluated independently, so a review can collect any subset of them.

use std::path::Path;

use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{error::RuleError, nlp::LabelSet};

const BUILTIN_RULES: &str = include_str!("../../rules/default_rules.json");

/// Uncompiled rule table as stored on disk: label name to pattern sources.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct RuleTable(pub IndexMap<String, Vec<String>>);

impl RuleTable {
    /// The table shipped with the crate.
    pub fn builtin() -> Result<Self, RuleError> {
        Self::from_json(BUILTIN_RULES)
    }

    pub fn from_json(raw: &str) -> Result<Self, RuleError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, RuleError> {
        let raw = std::fs::read_to_string(path).map_err(|source| RuleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }
}

/// One label and its OR'd pattern group.
#[derive(Debug, Clone)]
pub struct LabelRule {
    pub label: String,
    patterns: Vec<Regex>,
}

impl LabelRule {
    fn matches(&self, text: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(text))
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

/// Compiled rule engine assigning weak labels to normalized review text.
#[derive(Debug, Clone)]
pub struct LabelRuleEngine {
    rules: Vec<LabelRule>,
}

impl LabelRuleEngine {
    /// Compile a rule table. Empty tables, empty groups and invalid patterns are rejected.
    pub fn compile(table: &RuleTable) -> Result<Self, RuleError> {
        if table.0.is_empty() {
            return Err(RuleError::EmptyTable);
        }
        let mut rules = Vec::with_capacity(table.0.len());
        for (label, sources) in &table.0 {
            if sources.is_empty() {
                return Err(RuleError::EmptyGroup(label.clone()));
            }
            let patterns = sources
                .iter()
                .map(|source| {
                    RegexBuilder::new(source)
                        .case_insensitive(true)
                        .build()
                        .map_err(|source| RuleError::Pattern {
                            label: label.clone(),
                            source,
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            rules.push(LabelRule {
                label: label.clone(),
                patterns,
            });
        }
        debug!(labels = rules.len(), "compiled label rules");
        Ok(Self { rules })
    }

    /// Load the configured rule table, falling back to the built-in one.
    pub fn load(path: Option<&Path>) -> Result<Self, RuleError> {
        let table = match path {
            Some(path) => RuleTable::from_path(path)?,
            None => RuleTable::builtin()?,
        };
        Self::compile(&table)
    }

    /// Labels for one normalized text.
    pub fn assign(&self, text: &str) -> LabelSet {
        self.rules
            .iter()
            .filter(|rule| rule.matches(text))
            .map(|rule| rule.label.clone())
            .collect()
    }

    /// Taxonomy labels covered by the table, in table order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.label.as_str())
    }

    pub fn rules(&self) -> &[LabelRule] {
        &self.rules
    }
}

//! `labeled.csv` interchange between the labeling and training stages.
//!
//! Each row carries the normalized text, its label list written as a literal
//! (`['efficacy', 'taste']`) and the review score.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{data::reviews::Review, nlp::LabelSet};

/// One weakly labeled training row.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRow {
    pub normalized_text: String,
    pub labels: LabelSet,
    pub score: Option<f64>,
}

impl From<&Review> for LabeledRow {
    fn from(review: &Review) -> Self {
        Self {
            normalized_text: review.normalized_text.clone(),
            labels: review.label_set.clone(),
            score: review.score,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    #[serde(alias = "clean_text")]
    normalized_text: String,
    labels: String,
    #[serde(alias = "ReviewScore", default)]
    score: Option<f64>,
}

/// Write rows to `path`, creating parent directories as needed.
pub fn write_labeled(path: &Path, rows: &[LabeledRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    for row in rows {
        writer.serialize(CsvRow {
            normalized_text: row.normalized_text.clone(),
            labels: format_label_list(&row.labels),
            score: row.score,
        })?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = rows.len(), "wrote labeled dataset");
    Ok(())
}

/// Read rows back; malformed rows are skipped.
pub fn read_labeled(path: &Path) -> Result<Vec<LabeledRow>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("open {}", path.display()))?;
    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in reader.deserialize::<CsvRow>() {
        let parsed = result
            .ok()
            .and_then(|raw| parse_label_list(&raw.labels).map(|labels| (raw, labels)));
        match parsed {
            Some((raw, labels)) => rows.push(LabeledRow {
                normalized_text: raw.normalized_text,
                labels,
                score: raw.score,
            }),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!(skipped, path = %path.display(), "skipped malformed labeled rows");
    }
    info!(path = %path.display(), rows = rows.len(), "loaded labeled dataset");
    Ok(rows)
}

/// Render a label set as a single-quoted list literal.
pub fn format_label_list(labels: &LabelSet) -> String {
    let items: Vec<String> = labels
        .iter()
        .map(|label| format!("'{}'", label.replace('\\', "\\\\").replace('\'', "\\'")))
        .collect();
    format!("[{}]", items.join(", "))
}

/// Parse a list literal of quoted strings (single or double quotes).
pub fn parse_label_list(raw: &str) -> Option<LabelSet> {
    let mut chars = raw.trim().chars().peekable();
    if chars.next()? != '[' {
        return None;
    }
    let mut labels = LabelSet::new();
    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next()? {
            ']' if labels.is_empty() => break,
            quote @ ('\'' | '"') => {
                let mut label = String::new();
                loop {
                    match chars.next()? {
                        '\\' => label.push(chars.next()?),
                        c if c == quote => break,
                        c => label.push(c),
                    }
                }
                labels.insert(label);
            }
            _ => return None,
        }
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next()? {
            ',' => continue,
            ']' => break,
            _ => return None,
        }
    }
    chars.all(char::is_whitespace).then_some(labels)
}

//! Review CSV ingestion: column cleanup, verification filter and de-duplication.

use std::{collections::HashSet, path::Path};

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    data::normalize::normalize,
    nlp::{rules::LabelRuleEngine, LabelSet},
};

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "ReviewContent", default)]
    content: Option<String>,
    #[serde(rename = "ReviewTitle", default)]
    title: Option<String>,
    #[serde(rename = "ReviewDate", default)]
    date: Option<String>,
    #[serde(rename = "HelpfulCounts", default)]
    helpful: Option<String>,
    #[serde(rename = "Verified", default)]
    verified: Option<String>,
    #[serde(rename = "ReviewScore", default)]
    score: Option<String>,
}

/// A cleaned, verified review as read from the export files.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReview {
    pub content: String,
    pub title: String,
    pub date: Option<NaiveDate>,
    pub helpful_count: f64,
    pub score: Option<f64>,
}

/// A review after normalisation and weak labeling.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub raw_text: String,
    pub normalized_text: String,
    pub label_set: LabelSet,
    pub score: Option<f64>,
}

impl Review {
    pub fn label(raw_text: &str, score: Option<f64>, engine: &LabelRuleEngine) -> Self {
        let normalized_text = normalize(raw_text);
        let label_set = engine.assign(&normalized_text);
        Self {
            raw_text: raw_text.to_string(),
            normalized_text,
            label_set,
            score,
        }
    }

    pub fn is_labeled(&self) -> bool {
        !self.label_set.is_empty()
    }
}

/// Counts reported by [`load_reviews`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestStats {
    pub rows: usize,
    pub malformed: usize,
    pub unverified: usize,
    pub empty: usize,
    pub duplicates: usize,
}

/// Read and merge review exports, keeping verified, non-empty, first-seen reviews.
pub fn load_reviews<P: AsRef<Path>>(paths: &[P]) -> Result<(Vec<RawReview>, IngestStats)> {
    let mut stats = IngestStats::default();
    let mut seen = HashSet::new();
    let mut reviews = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
        let text = decode_text(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());
        for result in reader.deserialize::<RawRow>() {
            stats.rows += 1;
            let row = match result {
                Ok(row) => row,
                Err(err) => {
                    debug!(%err, file = %path.display(), "skipping malformed review row");
                    stats.malformed += 1;
                    continue;
                }
            };
            if !row.verified.as_deref().is_some_and(parse_flag) {
                stats.unverified += 1;
                continue;
            }
            let Some(content) = row.content.filter(|c| !c.trim().is_empty()) else {
                stats.empty += 1;
                continue;
            };
            if !seen.insert(content.clone()) {
                stats.duplicates += 1;
                continue;
            }
            reviews.push(RawReview {
                content,
                title: row.title.unwrap_or_default(),
                date: row.date.as_deref().and_then(parse_date),
                helpful_count: row.helpful.as_deref().and_then(parse_number).unwrap_or(0.0),
                score: row.score.as_deref().and_then(parse_number),
            });
        }
    }
    info!(kept = reviews.len(), ?stats, "loaded review exports");
    Ok((reviews, stats))
}

/// UTF-8 when valid, otherwise ISO-8859-1 (every byte maps to one code point).
fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => err.into_bytes().iter().map(|&b| b as char).collect(),
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "y"
    )
}

/// Leading numeric token, e.g. `"5.0 out of 5 stars"` or `"1,234"`.
fn parse_number(raw: &str) -> Option<f64> {
    raw.split_whitespace()
        .next()
        .map(|token| token.replace(',', ""))
        .and_then(|token| token.parse().ok())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%m/%d/%Y", "%d %B %Y"];
    const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];
    let trimmed = raw.trim();
    // "Reviewed in the United States on January 5, 2023"
    let candidate = trimmed.rsplit_once(" on ").map_or(trimmed, |(_, date)| date);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(candidate, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(candidate, fmt).ok())
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &tempfile::TempDir, name: &str, body: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::File::create(&path).unwrap().write_all(body).unwrap();
        path
    }

    #[test]
    fn filters_unverified_empty_and_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_csv(
            &dir,
            "a.csv",
            b"ReviewContent,ReviewTitle,ReviewDate,HelpfulCounts,Verified,ReviewScore,Images\n\
              Works great,Nice,2023-01-05,3,True,5.0,x\n\
              Works great,Dup,2023-01-06,1,True,4.0,x\n\
              ,Blank,2023-01-07,0,True,3.0,x\n\
              Bitter,Meh,2023-01-08,abc,False,2.0,x\n",
        );
        let b = write_csv(
            &dir,
            "b.csv",
            b"ReviewContent,Verified,HelpfulCounts,ReviewScore\n\
              Fell asleep fast,true,\"1,204\",4.0 out of 5 stars\n",
        );
        let (reviews, stats) = load_reviews(&[a, b]).unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].content, "Works great");
        assert_eq!(reviews[0].date, NaiveDate::from_ymd_opt(2023, 1, 5));
        assert_eq!(reviews[1].helpful_count, 1204.0);
        assert_eq!(reviews[1].score, Some(4.0));
        assert_eq!(reviews[1].title, "");
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.empty, 1);
        assert_eq!(stats.unverified, 1);
        assert_eq!(stats.rows, 5);
    }

    #[test]
    fn latin1_exports_are_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "latin1.csv",
            b"ReviewContent,Verified\nCaf\xe9 taste is bitter,True\n",
        );
        let (reviews, _) = load_reviews(&[path]).unwrap();
        assert_eq!(reviews[0].content, "Caf\u{e9} taste is bitter");
    }

    #[test]
    fn amazon_style_dates_parse() {
        assert_eq!(
            parse_date("Reviewed in the United States on January 5, 2023"),
            NaiveDate::from_ymd_opt(2023, 1, 5)
        );
        assert_eq!(
            parse_date("2022-11-30T00:00:00"),
            NaiveDate::from_ymd_opt(2022, 11, 30)
        );
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn review_label_normalizes_first() {
        let engine = LabelRuleEngine::load(None).unwrap();
        let review = Review::label("Gave me a HEADACHE!", Some(1.0), &engine);
        assert_eq!(review.normalized_text, "gave me a headache");
        assert!(review.is_labeled());
        assert!(review.label_set.contains("side_effect"));
    }
}

//! CLI entry-point for weak labeling of review exports.

use std::{collections::BTreeMap, path::PathBuf};

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{
    config::Settings,
    data::{
        labeled::{write_labeled, LabeledRow},
        reviews::{load_reviews, Review},
    },
    nlp::rules::LabelRuleEngine,
};

/// Args for the `label` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Comma separated review CSV exports.
    #[arg(long, value_delimiter = ',', required = true)]
    pub input: Vec<PathBuf>,
    /// Destination for the labeled dataset (defaults to `<DATA_DIR>/labeled.csv`).
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// JSON rule table overriding `LABEL_RULES`.
    #[arg(long)]
    pub rules: Option<PathBuf>,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let rules = args.rules.or_else(|| settings.label_rules.clone());
    let engine = LabelRuleEngine::load(rules.as_deref()).context("loading label rules")?;
    let (raw, _stats) = load_reviews(&args.input)?;

    let reviews: Vec<Review> = raw
        .iter()
        .map(|review| Review::label(&review.content, review.score, &engine))
        .collect();
    let rows: Vec<LabeledRow> = reviews
        .iter()
        .filter(|review| review.is_labeled())
        .map(LabeledRow::from)
        .collect();

    let mut counts = BTreeMap::new();
    for label in rows.iter().flat_map(|row| &row.labels) {
        *counts.entry(label.as_str()).or_insert(0usize) += 1;
    }
    info!(total = reviews.len(), labeled = rows.len(), ?counts, "weak labeling finished");

    let output = args
        .output
        .unwrap_or_else(|| settings.join_data("labeled.csv"));
    write_labeled(&output, &rows)?;
    println!(
        "labeled {} of {} reviews -> {}",
        rows.len(),
        reviews.len(),
        output.display()
    );
    Ok(())
}

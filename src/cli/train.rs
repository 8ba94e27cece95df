//! CLI entry-point for classifier training.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use tracing::{info, instrument};

use crate::{config::Settings, data::labeled::read_labeled, model::TrainingPipeline};

/// Args for the `train` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Labeled dataset produced by `label` (defaults to `<DATA_DIR>/labeled.csv`).
    #[arg(long)]
    pub labeled: Option<PathBuf>,
    /// Override the split seed.
    #[arg(long)]
    pub seed: Option<u64>,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, mut settings: Settings) -> Result<()> {
    if let Some(seed) = args.seed {
        settings.split_seed = seed;
    }
    let path = args
        .labeled
        .unwrap_or_else(|| settings.join_data("labeled.csv"));
    let rows = read_labeled(&path)?;
    info!(rows = rows.len(), path = %path.display(), "training from labeled dataset");

    let pipeline = TrainingPipeline::from_settings(&settings)?;
    let outcome = pipeline
        .run_labeled(rows)
        .with_context(|| format!("training from {}", path.display()))?;

    println!("=== Classification Report ===");
    println!("{}", outcome.report);
    println!(
        "saved version {} ({} labeled rows, labels: {})",
        outcome.manifest.version,
        outcome.labeled_rows,
        outcome.manifest.labels.join(", ")
    );
    Ok(())
}

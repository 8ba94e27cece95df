//! CLI entry-point for one-off predictions against the active model.

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use crate::{api::types::PredictResponse, config::Settings, model::InferenceService};

/// Args for the `predict` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Review texts to label.
    pub texts: Vec<String>,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let mut service = InferenceService::new(settings.serve_batch_size);
    service.load(&settings.artifacts_dir)?;
    let response = PredictResponse::from(service.predict(&args.texts)?);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

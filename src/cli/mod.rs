//! Command-line interface wiring for review-labeler.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::Settings;

pub mod label;
pub mod predict;
pub mod serve;
pub mod train;

/// Top-level CLI definition.
#[derive(Debug, Parser)]
#[command(author, version, about = "Weakly supervised review tagger", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Parse CLI arguments from the environment.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Dispatch the selected sub-command.
    pub async fn dispatch(self, settings: Settings) -> Result<()> {
        match self.command {
            Commands::Label(args) => label::run(args, settings).await,
            Commands::Train(args) => train::run(args, settings).await,
            Commands::Predict(args) => predict::run(args, settings).await,
            Commands::Serve(args) => serve::run(args, settings).await,
        }
    }
}

/// Supported sub-commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Clean review exports and assign weak labels.
    Label(label::Args),
    /// Train the classifier and persist a new artifact version.
    Train(train::Args),
    /// Label texts with the active artifact version.
    Predict(predict::Args),
    /// Serve the JSON prediction API.
    Serve(serve::Args),
}

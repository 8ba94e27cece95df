//! Runtime configuration utilities for review-labeler.

use std::{
    env,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context;
use serde::Deserialize;

use crate::{
    error::EncoderError,
    nlp::{classifier::TrainConfig, embeddings::EncoderState},
};

/// Application configuration resolved from `.env` and defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Root folder for raw and labeled review data.
    pub data_dir: PathBuf,
    /// Root folder holding versioned model artifacts.
    pub artifacts_dir: PathBuf,
    /// Optional JSON rule table overriding the built-in one.
    pub label_rules: Option<PathBuf>,
    /// Encoder backend: `hashing` or a fastembed model id.
    pub encoder: String,
    /// Output width of the hashing encoder.
    pub encoder_dim: usize,
    /// Batch size used while encoding the training corpus.
    pub train_batch_size: usize,
    /// Batch size used while encoding inference requests.
    pub serve_batch_size: usize,
    /// Seed for the reproducible train/validation split.
    pub split_seed: u64,
    /// Share of labeled rows held out for evaluation.
    pub test_fraction: f64,
    /// Optimizer iteration cap per label.
    pub max_iterations: u64,
    /// Inverse regularisation strength.
    pub regularization_c: f64,
    /// Probability above which a label is predicted.
    pub decision_threshold: f64,
}

impl Settings {
    /// Load configuration from environment with reasonable defaults.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        let artifacts_dir = env::var("ARTIFACTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./artifacts"));
        let label_rules = env::var("LABEL_RULES").ok().map(PathBuf::from);
        let encoder = env::var("ENCODER").unwrap_or_else(|_| "hashing".to_string());

        let defaults = Self::with_dirs(data_dir, artifacts_dir);
        let settings = Self {
            label_rules,
            encoder,
            encoder_dim: env_or("ENCODER_DIM", defaults.encoder_dim),
            train_batch_size: env_or("TRAIN_BATCH_SIZE", defaults.train_batch_size),
            serve_batch_size: env_or("SERVE_BATCH_SIZE", defaults.serve_batch_size),
            split_seed: env_or("SPLIT_SEED", defaults.split_seed),
            test_fraction: env_or("TEST_FRACTION", defaults.test_fraction),
            max_iterations: env_or("MAX_ITERATIONS", defaults.max_iterations),
            regularization_c: env_or("REGULARIZATION_C", defaults.regularization_c),
            decision_threshold: env_or("DECISION_THRESHOLD", defaults.decision_threshold),
            ..defaults
        };

        std::fs::create_dir_all(&settings.data_dir).context("creating data dir")?;
        std::fs::create_dir_all(&settings.artifacts_dir).context("creating artifacts dir")?;
        Ok(settings)
    }

    /// Default settings rooted at the given directories, without touching the environment.
    pub fn with_dirs(data_dir: impl Into<PathBuf>, artifacts_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            artifacts_dir: artifacts_dir.into(),
            label_rules: None,
            encoder: "hashing".to_string(),
            encoder_dim: 512,
            train_batch_size: 64,
            serve_batch_size: 32,
            split_seed: 42,
            test_fraction: 0.2,
            max_iterations: 1000,
            regularization_c: 1.0,
            decision_threshold: 0.5,
        }
    }

    /// Convenience helper for derived path segments.
    pub fn join_data<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.data_dir.join(path)
    }

    /// Hyper-parameters for the one-vs-rest classifier.
    pub fn train_config(&self) -> TrainConfig {
        TrainConfig {
            seed: self.split_seed,
            test_fraction: self.test_fraction,
            max_iterations: self.max_iterations,
            regularization_c: self.regularization_c,
            threshold: self.decision_threshold,
        }
    }

    /// Encoder state for a fresh training run.
    pub fn encoder_state(&self) -> Result<EncoderState, EncoderError> {
        EncoderState::from_setting(&self.encoder, self.encoder_dim)
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

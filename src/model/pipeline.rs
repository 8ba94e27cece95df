//! Training orchestration: weak labels in, a persisted artifact triple out.

use std::{collections::BTreeMap, path::PathBuf};

use tracing::{info, instrument};

use crate::{
    config::Settings,
    data::{labeled::LabeledRow, normalize::normalize, reviews::Review},
    error::PipelineError,
    model::artifact::{ArtifactTriple, Manifest},
    nlp::{
        classifier::{EvaluationReport, MultiLabelClassifier, TrainConfig},
        embeddings::TextEncoder,
        label_space::LabelSpace,
        rules::LabelRuleEngine,
    },
};

/// Summary of one training run.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub manifest: Manifest,
    pub labeled_rows: usize,
    pub dropped_rows: usize,
    pub label_counts: BTreeMap<String, usize>,
    pub report: EvaluationReport,
}

/// normalize → weak labels → label space → encode → fit → persist.
pub struct TrainingPipeline {
    engine: LabelRuleEngine,
    encoder: Box<dyn TextEncoder>,
    config: TrainConfig,
    batch_size: usize,
    artifacts_dir: PathBuf,
}

impl TrainingPipeline {
    pub fn new(
        engine: LabelRuleEngine,
        encoder: Box<dyn TextEncoder>,
        config: TrainConfig,
        batch_size: usize,
        artifacts_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            engine,
            encoder,
            config,
            batch_size,
            artifacts_dir: artifacts_dir.into(),
        }
    }

    /// Build the pipeline described by the runtime settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, PipelineError> {
        let engine = LabelRuleEngine::load(settings.label_rules.as_deref())?;
        let encoder = settings
            .encoder_state()?
            .build(&settings.artifacts_dir.join(".encoder-cache"))?;
        Ok(Self::new(
            engine,
            encoder,
            settings.train_config(),
            settings.train_batch_size,
            settings.artifacts_dir.clone(),
        ))
    }

    pub fn engine(&self) -> &LabelRuleEngine {
        &self.engine
    }

    /// Normalize and weakly label raw review texts, keeping unlabeled ones.
    pub fn label<I, S>(&self, raw_texts: I) -> Vec<Review>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        raw_texts
            .into_iter()
            .map(|text| Review::label(text.as_ref(), None, &self.engine))
            .collect()
    }

    /// Full run from raw review texts.
    #[instrument(skip_all)]
    pub fn run<I, S>(&self, raw_texts: I) -> Result<TrainingOutcome, PipelineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rows: Vec<LabeledRow> = self.label(raw_texts).iter().map(LabeledRow::from).collect();
        self.run_labeled(rows)
    }

    /// Run from an already labeled dataset (`labeled.csv`).
    #[instrument(skip_all, fields(rows = rows.len()))]
    pub fn run_labeled(&self, rows: Vec<LabeledRow>) -> Result<TrainingOutcome, PipelineError> {
        let total = rows.len();
        let rows: Vec<LabeledRow> = rows
            .into_iter()
            .filter(|row| !row.labels.is_empty())
            .collect();
        let dropped_rows = total - rows.len();
        info!(total, labeled = rows.len(), dropped = dropped_rows, "prepared training rows");

        let label_sets: Vec<_> = rows.iter().map(|row| row.labels.clone()).collect();
        let label_space = LabelSpace::fit(&label_sets)?;
        let label_counts = count_labels(&label_sets);
        info!(labels = ?label_space.labels(), counts = ?label_counts, "fitted label space");

        let targets = label_space.encode_matrix(&label_sets)?;
        let texts: Vec<String> = rows
            .iter()
            .map(|row| normalize(&row.normalized_text))
            .collect();
        let features = self.encoder.encode(&texts, self.batch_size)?;
        info!(rows = features.nrows(), dim = features.ncols(), "encoded training texts");

        let (classifier, report) =
            MultiLabelClassifier::fit(&features, &targets, &label_space, &self.config)?;
        info!("held-out evaluation\n{report}");

        let triple = ArtifactTriple::new(self.encoder.state(), classifier, label_space)?;
        let manifest = triple.save(&self.artifacts_dir, Some(&report))?;

        Ok(TrainingOutcome {
            manifest,
            labeled_rows: rows.len(),
            dropped_rows,
            label_counts,
            report,
        })
    }
}

fn count_labels<'a, I>(label_sets: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = &'a crate::nlp::LabelSet>,
{
    let mut counts = BTreeMap::new();
    for label in label_sets.into_iter().flatten() {
        *counts.entry(label.clone()).or_insert(0) += 1;
    }
    counts
}

//! One-vs-rest multi-label classification over text embeddings.

use std::fmt;

use linfa::{dataset::DatasetBase, prelude::Fit};
use linfa_logistic::LogisticRegression;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{error::ClassifierError, nlp::label_space::LabelSpace};

/// Training hyper-parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    pub seed: u64,
    pub test_fraction: f64,
    pub max_iterations: u64,
    /// Inverse L2 regularisation strength.
    pub regularization_c: f64,
    pub threshold: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            test_fraction: 0.2,
            max_iterations: 1000,
            regularization_c: 1.0,
            threshold: 0.5,
        }
    }
}

/// A single label's probabilistic yes/no model.
pub trait BinaryClassifier {
    fn probability(&self, features: ArrayView1<'_, f64>) -> f64;
}

/// Persisted per-label model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LabelModel {
    Logistic { weights: Vec<f64>, intercept: f64 },
    /// The training partition held only one class for this label.
    Constant { probability: f64 },
}

impl BinaryClassifier for LabelModel {
    fn probability(&self, features: ArrayView1<'_, f64>) -> f64 {
        match self {
            Self::Logistic { weights, intercept } => {
                let z = features
                    .iter()
                    .zip(weights)
                    .map(|(x, w)| x * w)
                    .sum::<f64>()
                    + intercept;
                1.0 / (1.0 + (-z).exp())
            }
            Self::Constant { probability } => *probability,
        }
    }
}

impl LabelModel {
    fn fit(
        features: ArrayView2<'_, f64>,
        targets: ArrayView1<'_, bool>,
        config: &TrainConfig,
    ) -> Result<Self, linfa_logistic::error::Error> {
        let positives = targets.iter().filter(|t| **t).count();
        if positives == 0 || positives == targets.len() {
            let probability = if positives == 0 { 0.0 } else { 1.0 };
            return Ok(Self::Constant { probability });
        }

        let dataset = DatasetBase::new(features.to_owned(), targets.to_owned());
        let fitted = LogisticRegression::default()
            .max_iterations(config.max_iterations)
            .alpha(1.0 / config.regularization_c)
            .fit(&dataset)?;

        // linfa picks the positive class itself; orient the weights towards `true`.
        let sign = if fitted.labels().pos.class { 1.0 } else { -1.0 };
        Ok(Self::Logistic {
            weights: fitted.params().iter().map(|w| sign * w).collect(),
            intercept: sign * fitted.intercept(),
        })
    }
}

/// Independent binary classifiers, one per label space bit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawClassifier")]
pub struct MultiLabelClassifier {
    labels: Vec<String>,
    dimension: usize,
    threshold: f64,
    models: Vec<LabelModel>,
}

/// Unchecked persisted form; shape is validated before it becomes a classifier.
#[derive(Deserialize)]
struct RawClassifier {
    labels: Vec<String>,
    dimension: usize,
    threshold: f64,
    models: Vec<LabelModel>,
}

impl TryFrom<RawClassifier> for MultiLabelClassifier {
    type Error = ClassifierError;

    fn try_from(raw: RawClassifier) -> Result<Self, Self::Error> {
        let classifier = Self {
            labels: raw.labels,
            dimension: raw.dimension,
            threshold: raw.threshold,
            models: raw.models,
        };
        classifier.validate()?;
        Ok(classifier)
    }
}

impl MultiLabelClassifier {
    /// Split, train every label on the training partition and score the held-out rows.
    pub fn fit(
        features: &Array2<f64>,
        targets: &Array2<bool>,
        label_space: &LabelSpace,
        config: &TrainConfig,
    ) -> Result<(Self, EvaluationReport), ClassifierError> {
        if features.nrows() != targets.nrows() {
            return Err(ClassifierError::RowMismatch {
                features: features.nrows(),
                targets: targets.nrows(),
            });
        }
        if targets.ncols() != label_space.len() {
            return Err(ClassifierError::LabelMismatch {
                expected: label_space.len(),
                actual: targets.ncols(),
            });
        }
        if features.nrows() == 0 {
            return Err(ClassifierError::EmptyDataset);
        }

        let (train_idx, test_idx) =
            split_indices(features.nrows(), config.test_fraction, config.seed);
        let x_train = features.select(Axis(0), &train_idx);
        let y_train = targets.select(Axis(0), &train_idx);
        info!(
            train = train_idx.len(),
            test = test_idx.len(),
            labels = label_space.len(),
            "fitting one-vs-rest classifier"
        );

        let mut models = Vec::with_capacity(label_space.len());
        for (col, label) in label_space.labels().iter().enumerate() {
            let model = LabelModel::fit(x_train.view(), y_train.column(col), config).map_err(
                |source| ClassifierError::Fit {
                    label: label.clone(),
                    source,
                },
            )?;
            debug!(%label, constant = matches!(model, LabelModel::Constant { .. }), "fitted label");
            models.push(model);
        }

        let classifier = Self {
            labels: label_space.labels().to_vec(),
            dimension: features.ncols(),
            threshold: config.threshold,
            models,
        };
        let report = classifier.evaluate(
            &features.select(Axis(0), &test_idx),
            &targets.select(Axis(0), &test_idx),
        )?;
        Ok((classifier, report))
    }

    /// One model per label, every logistic model sized to `dimension`.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        if self.models.len() != self.labels.len() {
            return Err(ClassifierError::ModelCount {
                labels: self.labels.len(),
                models: self.models.len(),
            });
        }
        for (label, model) in self.labels.iter().zip(&self.models) {
            if let LabelModel::Logistic { weights, .. } = model {
                if weights.len() != self.dimension {
                    return Err(ClassifierError::WeightCount {
                        label: label.clone(),
                        expected: self.dimension,
                        actual: weights.len(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Label names this classifier was trained for, in bit order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn models(&self) -> &[LabelModel] {
        &self.models
    }

    /// Per-label probabilities, one row per input row.
    pub fn predict_proba(&self, features: &Array2<f64>) -> Result<Array2<f64>, ClassifierError> {
        if features.ncols() != self.dimension {
            return Err(ClassifierError::FeatureMismatch {
                expected: self.dimension,
                actual: features.ncols(),
            });
        }
        let mut out = Array2::zeros((features.nrows(), self.models.len()));
        for (row, mut probs) in features.rows().into_iter().zip(out.rows_mut()) {
            for (model, prob) in self.models.iter().zip(probs.iter_mut()) {
                *prob = model.probability(row);
            }
        }
        Ok(out)
    }

    /// Thresholded bitmask per row; labels are decided independently.
    pub fn predict(&self, features: &Array2<f64>) -> Result<Array2<bool>, ClassifierError> {
        Ok(self
            .predict_proba(features)?
            .mapv(|p| p > self.threshold))
    }

    /// Per-label precision, recall and F1 against known targets.
    pub fn evaluate(
        &self,
        features: &Array2<f64>,
        targets: &Array2<bool>,
    ) -> Result<EvaluationReport, ClassifierError> {
        if targets.ncols() != self.labels.len() {
            return Err(ClassifierError::LabelMismatch {
                expected: self.labels.len(),
                actual: targets.ncols(),
            });
        }
        let predicted = self.predict(features)?;
        let mut micro = Counts::default();
        let per_label = self
            .labels
            .iter()
            .enumerate()
            .map(|(col, label)| {
                let counts = Counts::tally(predicted.column(col), targets.column(col));
                micro.add(&counts);
                counts.metrics(label)
            })
            .collect();
        Ok(EvaluationReport {
            rows: features.nrows(),
            per_label,
            micro: micro.metrics("micro avg"),
        })
    }
}

/// Reproducible shuffle split into (train, test) row indices.
///
/// The test share is rounded up but always leaves at least one training row.
pub fn split_indices(rows: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..rows).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));
    let fraction = test_fraction.clamp(0.0, 1.0);
    let test_len = ((rows as f64 * fraction).ceil() as usize).min(rows.saturating_sub(1));
    let train = indices.split_off(test_len);
    (train, indices)
}

#[derive(Debug, Default, Clone, Copy)]
struct Counts {
    tp: usize,
    fp: usize,
    fn_: usize,
}

impl Counts {
    fn tally(predicted: ArrayView1<'_, bool>, actual: ArrayView1<'_, bool>) -> Self {
        let mut counts = Self::default();
        for (p, a) in predicted.iter().zip(actual) {
            match (*p, *a) {
                (true, true) => counts.tp += 1,
                (true, false) => counts.fp += 1,
                (false, true) => counts.fn_ += 1,
                (false, false) => {}
            }
        }
        counts
    }

    fn add(&mut self, other: &Self) {
        self.tp += other.tp;
        self.fp += other.fp;
        self.fn_ += other.fn_;
    }

    fn metrics(&self, label: &str) -> LabelMetrics {
        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let precision = ratio(self.tp, self.tp + self.fp);
        let recall = ratio(self.tp, self.tp + self.fn_);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        LabelMetrics {
            label: label.to_string(),
            precision,
            recall,
            f1,
            support: self.tp + self.fn_,
        }
    }
}

/// Held-out quality of one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Evaluation over the held-out partition. Informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub rows: usize,
    pub per_label: Vec<LabelMetrics>,
    pub micro: LabelMetrics,
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>16} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for m in self.per_label.iter().chain(std::iter::once(&self.micro)) {
            writeln!(
                f,
                "{:>16} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                m.label, m.precision, m.recall, m.f1, m.support
            )?;
        }
        Ok(())
    }
}

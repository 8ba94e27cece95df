//! Typed errors for the labeling, training and serving layers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule table has no labels")]
    EmptyTable,

    #[error("label '{0}' has no patterns")]
    EmptyGroup(String),

    #[error("invalid pattern for label '{label}': {source}")]
    Pattern {
        label: String,
        #[source]
        source: regex::Error,
    },

    #[error("reading rule table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing rule table: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LabelSpaceError {
    #[error("cannot fit a label space without any labeled rows")]
    Empty,

    #[error("label '{0}' is not part of the fitted label space")]
    UnknownLabel(String),

    #[error("bitmask width {actual} does not match label space width {expected}")]
    WidthMismatch { expected: usize, actual: usize },

    #[error("persisted label list is not sorted and unique")]
    Unordered,
}

#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("batch size must be positive")]
    ZeroBatch,

    #[error("encoder dimension must be positive")]
    ZeroDimension,

    #[error("unsupported encoder model '{0}'")]
    UnsupportedModel(String),

    #[error("encoder produced a {actual}-dimensional vector, expected {expected}")]
    Dimension { expected: usize, actual: usize },

    #[error("embedding backend failed: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("feature matrix has {features} rows but target matrix has {targets}")]
    RowMismatch { features: usize, targets: usize },

    #[error("target matrix has {actual} columns for {expected} labels")]
    LabelMismatch { expected: usize, actual: usize },

    #[error("classifier expects {expected} features, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },

    #[error("cannot train on an empty dataset")]
    EmptyDataset,

    #[error("classifier has {models} models for {labels} labels")]
    ModelCount { labels: usize, models: usize },

    #[error("model for label '{label}' has {actual} weights, expected {expected}")]
    WeightCount {
        label: String,
        expected: usize,
        actual: usize,
    },

    #[error("training label '{label}' failed: {source}")]
    Fit {
        label: String,
        #[source]
        source: linfa_logistic::error::Error,
    },
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact file {path} is missing or unreadable: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no active artifact version under {0}")]
    NoCurrentVersion(PathBuf),

    #[error("artifact format version {found} is not supported (expected {expected})")]
    FormatVersion { expected: u32, found: u32 },

    #[error("classifier labels {classifier:?} do not match label space {label_space:?}")]
    LabelSpaceMismatch {
        classifier: Vec<String>,
        label_space: Vec<String>,
    },

    #[error("manifest version '{manifest}' does not match directory version '{directory}'")]
    VersionMismatch { manifest: String, directory: String },

    #[error("encoder dimension {encoder} does not match classifier dimension {classifier}")]
    DimensionMismatch { encoder: usize, classifier: usize },

    #[error(transparent)]
    Encoder(#[from] EncoderError),

    #[error("classifier artifact is malformed: {0}")]
    Classifier(#[from] ClassifierError),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    LabelSpace(#[from] LabelSpaceError),

    #[error(transparent)]
    Encoder(#[from] EncoderError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("model service is not ready (state: {0})")]
    NotReady(&'static str),

    #[error("model service was already loaded (state: {0})")]
    AlreadyLoaded(&'static str),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Encoder(#[from] EncoderError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error(transparent)]
    LabelSpace(#[from] LabelSpaceError),
}

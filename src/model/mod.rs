//! Train/serve contract: artifact persistence, training pipeline and inference service.

pub mod artifact;
pub mod pipeline;
pub mod service;

pub use artifact::{ArtifactTriple, Manifest};
pub use pipeline::{TrainingOutcome, TrainingPipeline};
pub use service::{Health, InferenceService, Prediction, ServiceState};

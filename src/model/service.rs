//! Inference service: loads one artifact triple at startup and answers predictions.

use std::{path::Path, time::Instant};

use serde::Serialize;
use tracing::{debug, error, info};

use crate::{
    data::normalize::normalize,
    error::ServiceError,
    model::artifact::ArtifactTriple,
    nlp::{classifier::MultiLabelClassifier, embeddings::TextEncoder, label_space::LabelSpace},
};

/// Labels per input text plus wall-clock time spent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub predictions: Vec<Vec<String>>,
    pub latency_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub labels: Vec<String>,
}

/// Model parts held by a ready service. Never mutated after load.
pub struct LoadedModel {
    encoder: Box<dyn TextEncoder>,
    classifier: MultiLabelClassifier,
    label_space: LabelSpace,
    version: String,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("encoder", &self.encoder.state())
            .field("labels", &self.label_space.labels())
            .field("version", &self.version)
            .finish()
    }
}

/// `Unloaded → Loading → Ready | Failed`. Ready and Failed are terminal.
#[derive(Debug)]
pub enum ServiceState {
    Unloaded,
    Loading,
    Ready(LoadedModel),
    Failed(String),
}

impl ServiceState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unloaded => "unloaded",
            Self::Loading => "loading",
            Self::Ready(_) => "ready",
            Self::Failed(_) => "failed",
        }
    }
}

#[derive(Debug)]
pub struct InferenceService {
    state: ServiceState,
    batch_size: usize,
}

impl InferenceService {
    pub fn new(batch_size: usize) -> Self {
        Self {
            state: ServiceState::Unloaded,
            batch_size,
        }
    }

    pub fn state(&self) -> &ServiceState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ServiceState::Ready(_))
    }

    /// Version of the loaded artifact triple.
    pub fn version(&self) -> Option<&str> {
        match &self.state {
            ServiceState::Ready(model) => Some(&model.version),
            _ => None,
        }
    }

    /// Load the active artifact version. Allowed once, from `Unloaded` only.
    pub fn load(&mut self, artifacts_dir: &Path) -> Result<(), ServiceError> {
        if !matches!(self.state, ServiceState::Unloaded) {
            return Err(ServiceError::AlreadyLoaded(self.state.name()));
        }
        self.state = ServiceState::Loading;
        match load_model(artifacts_dir) {
            Ok(model) => {
                info!(version = %model.version, labels = ?model.label_space.labels(), "model service ready");
                self.state = ServiceState::Ready(model);
                Ok(())
            }
            Err(err) => {
                error!(%err, dir = %artifacts_dir.display(), "model service failed to load");
                self.state = ServiceState::Failed(err.to_string());
                Err(err)
            }
        }
    }

    fn ready(&self) -> Result<&LoadedModel, ServiceError> {
        match &self.state {
            ServiceState::Ready(model) => Ok(model),
            other => Err(ServiceError::NotReady(other.name())),
        }
    }

    /// Label each text, in input order. An empty batch is a no-op.
    pub fn predict(&self, texts: &[String]) -> Result<Prediction, ServiceError> {
        let model = self.ready()?;
        if texts.is_empty() {
            return Ok(Prediction {
                predictions: Vec::new(),
                latency_ms: 0.0,
            });
        }
        let started = Instant::now();
        let normalized: Vec<String> = texts.iter().map(|text| normalize(text)).collect();
        let features = model.encoder.encode(&normalized, self.batch_size)?;
        let bits = model.classifier.predict(&features)?;
        let predictions = bits
            .rows()
            .into_iter()
            .map(|row| {
                let row: Vec<bool> = row.to_vec();
                model
                    .label_space
                    .decode(&row)
                    .map(|labels| labels.into_iter().collect())
            })
            .collect::<Result<Vec<Vec<String>>, _>>()?;
        let latency_ms = (started.elapsed().as_secs_f64() * 100_000.0).round() / 100.0;
        debug!(texts = texts.len(), latency_ms, "served prediction");
        Ok(Prediction {
            predictions,
            latency_ms,
        })
    }

    /// Loaded label space, for observability. Runs no inference.
    pub fn health(&self) -> Result<Health, ServiceError> {
        let model = self.ready()?;
        Ok(Health {
            status: "ok",
            labels: model.label_space.labels().to_vec(),
        })
    }
}

fn load_model(artifacts_dir: &Path) -> Result<LoadedModel, ServiceError> {
    let (triple, manifest) = ArtifactTriple::load_current(artifacts_dir)?;
    let (encoder_state, classifier, label_space) = triple.into_parts();
    let encoder = encoder_state.build(&artifacts_dir.join(".encoder-cache"))?;
    Ok(LoadedModel {
        encoder,
        classifier,
        label_space,
        version: manifest.version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calls_before_load_are_rejected() {
        let service = InferenceService::new(32);
        assert!(matches!(
            service.predict(&[]),
            Err(ServiceError::NotReady("unloaded"))
        ));
        assert!(matches!(
            service.health(),
            Err(ServiceError::NotReady("unloaded"))
        ));
    }

    #[test]
    fn missing_artifacts_fail_and_stay_failed() {
        let dir = tempfile::tempdir().unwrap();
        let mut service = InferenceService::new(32);
        assert!(service.load(dir.path()).is_err());
        assert_eq!(service.state().name(), "failed");
        assert!(!service.is_ready());
        assert!(matches!(
            service.load(dir.path()),
            Err(ServiceError::AlreadyLoaded("failed"))
        ));
        assert!(matches!(
            service.predict(&["works great".to_string()]),
            Err(ServiceError::NotReady("failed"))
        ));
    }
}

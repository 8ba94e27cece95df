//! Request and response bodies for the JSON API.

use serde::{Deserialize, Serialize};

use crate::model::{Health, Prediction};

#[derive(Debug, Clone, Deserialize)]
pub struct PredictRequest {
    pub texts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictResponse {
    pub predictions: Vec<Vec<String>>,
    pub latency_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub labels: Vec<String>,
}

impl From<Prediction> for PredictResponse {
    fn from(value: Prediction) -> Self {
        PredictResponse {
            predictions: value.predictions,
            latency_ms: value.latency_ms,
        }
    }
}

impl From<Health> for HealthResponse {
    fn from(value: Health) -> Self {
        HealthResponse {
            status: value.status.to_string(),
            labels: value.labels,
        }
    }
}

//! Text encoders turning review text into fixed-width feature vectors.

use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[cfg(feature = "embeddings")]
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::error::EncoderError;

/// Sentence-transformer models the fastembed backend accepts, with their widths.
const KNOWN_MODELS: &[(&str, usize)] = &[
    ("all-MiniLM-L6-v2", 384),
    ("all-MiniLM-L12-v2", 384),
    ("bge-small-en-v1.5", 384),
    ("bge-base-en-v1.5", 768),
];

/// Batch text encoder. Output rows follow input order; batch size never changes values.
pub trait TextEncoder: Send + Sync {
    fn dimension(&self) -> usize;

    fn encode(&self, texts: &[String], batch_size: usize) -> Result<Array2<f64>, EncoderError>;

    /// Persistable description sufficient to rebuild an identical encoder.
    fn state(&self) -> EncoderState;
}

/// Persisted encoder half of the artifact triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EncoderState {
    Hashing { dimension: usize },
    FastEmbed { model: String, dimension: usize },
}

impl EncoderState {
    /// Interpret the `ENCODER` setting.
    pub fn from_setting(name: &str, hashing_dim: usize) -> Result<Self, EncoderError> {
        if name.eq_ignore_ascii_case("hashing") {
            if hashing_dim == 0 {
                return Err(EncoderError::ZeroDimension);
            }
            return Ok(Self::Hashing {
                dimension: hashing_dim,
            });
        }
        KNOWN_MODELS
            .iter()
            .find(|(id, _)| id.eq_ignore_ascii_case(name))
            .map(|(id, dimension)| Self::FastEmbed {
                model: (*id).to_string(),
                dimension: *dimension,
            })
            .ok_or_else(|| EncoderError::UnsupportedModel(name.to_string()))
    }

    pub fn dimension(&self) -> usize {
        match self {
            Self::Hashing { dimension } | Self::FastEmbed { dimension, .. } => *dimension,
        }
    }

    /// Rebuild the encoder. Model weights for fastembed are cached under `cache_dir`.
    pub fn build(&self, cache_dir: &Path) -> Result<Box<dyn TextEncoder>, EncoderError> {
        match self {
            Self::Hashing { dimension } => Ok(Box::new(HashingEncoder::new(*dimension)?)),
            #[cfg(feature = "embeddings")]
            Self::FastEmbed { model, dimension } => Ok(Box::new(FastEmbedEncoder::try_new(
                model, *dimension, cache_dir,
            )?)),
            #[cfg(not(feature = "embeddings"))]
            Self::FastEmbed { model, .. } => {
                let _ = cache_dir;
                Err(EncoderError::UnsupportedModel(format!(
                    "{model} (built without the `embeddings` feature)"
                )))
            }
        }
    }
}

/// Signed feature hashing over word unigrams and bigrams, L2-normalised.
#[derive(Debug, Clone)]
pub struct HashingEncoder {
    dimension: usize,
}

impl HashingEncoder {
    pub fn new(dimension: usize) -> Result<Self, EncoderError> {
        if dimension == 0 {
            return Err(EncoderError::ZeroDimension);
        }
        Ok(Self { dimension })
    }

    fn encode_one(&self, text: &str, row: &mut [f64]) {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        for token in &tokens {
            self.accumulate(fnv1a(token.as_bytes(), FNV_OFFSET), row);
        }
        for pair in tokens.windows(2) {
            let first = fnv1a(pair[0].as_bytes(), FNV_OFFSET);
            let hash = fnv1a(pair[1].as_bytes(), fnv1a(b" ", first));
            self.accumulate(hash, row);
        }
        let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            row.iter_mut().for_each(|v| *v /= norm);
        }
    }

    fn accumulate(&self, hash: u64, row: &mut [f64]) {
        let bucket = (hash % self.dimension as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        row[bucket] += sign;
    }
}

impl TextEncoder for HashingEncoder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, texts: &[String], batch_size: usize) -> Result<Array2<f64>, EncoderError> {
        if batch_size == 0 {
            return Err(EncoderError::ZeroBatch);
        }
        let mut out = Array2::zeros((texts.len(), self.dimension));
        for (chunk_idx, chunk) in texts.chunks(batch_size).enumerate() {
            let offset = chunk_idx * batch_size;
            for (idx, text) in chunk.iter().enumerate() {
                let mut row = out.row_mut(offset + idx);
                if let Some(slice) = row.as_slice_mut() {
                    self.encode_one(text, slice);
                }
            }
        }
        debug!(rows = texts.len(), dim = self.dimension, "hashed text batch");
        Ok(out)
    }

    fn state(&self) -> EncoderState {
        EncoderState::Hashing {
            dimension: self.dimension,
        }
    }
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8], seed: u64) -> u64 {
    bytes
        .iter()
        .fold(seed, |hash, byte| (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME))
}

/// fastembed-backed sentence encoder.
#[cfg(feature = "embeddings")]
pub struct FastEmbedEncoder {
    model: String,
    dimension: usize,
    inner: std::sync::Mutex<TextEmbedding>,
}

#[cfg(feature = "embeddings")]
impl FastEmbedEncoder {
    pub fn try_new(model: &str, dimension: usize, cache_dir: &Path) -> Result<Self, EncoderError> {
        let variant = match model {
            "all-MiniLM-L6-v2" => EmbeddingModel::AllMiniLML6V2,
            "all-MiniLM-L12-v2" => EmbeddingModel::AllMiniLML12V2,
            "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
            "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
            other => return Err(EncoderError::UnsupportedModel(other.to_string())),
        };
        let options = InitOptions::new(variant)
            .with_cache_dir(cache_dir.to_path_buf())
            .with_show_download_progress(false);
        let inner =
            TextEmbedding::try_new(options).map_err(|e| EncoderError::Backend(e.to_string()))?;
        Ok(Self {
            model: model.to_string(),
            dimension,
            inner: std::sync::Mutex::new(inner),
        })
    }
}

#[cfg(feature = "embeddings")]
impl TextEncoder for FastEmbedEncoder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, texts: &[String], batch_size: usize) -> Result<Array2<f64>, EncoderError> {
        if batch_size == 0 {
            return Err(EncoderError::ZeroBatch);
        }
        let mut out = Array2::zeros((texts.len(), self.dimension));
        if texts.is_empty() {
            return Ok(out);
        }
        let embeddings = {
            #[allow(unused_mut)]
            let mut session = self
                .inner
                .lock()
                .map_err(|_| EncoderError::Backend("embedding session poisoned".into()))?;
            session
                .embed(texts.to_vec(), Some(batch_size))
                .map_err(|e| EncoderError::Backend(e.to_string()))?
        };
        for (mut row, vector) in out.rows_mut().into_iter().zip(&embeddings) {
            if vector.len() != self.dimension {
                return Err(EncoderError::Dimension {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
            for (cell, value) in row.iter_mut().zip(vector) {
                *cell = f64::from(*value);
            }
        }
        Ok(out)
    }

    fn state(&self) -> EncoderState {
        EncoderState::FastEmbed {
            model: self.model.clone(),
            dimension: self.dimension,
        }
    }
}

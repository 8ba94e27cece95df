//! Versioned persistence of the (encoder, classifier, label space) triple.
//!
//! Layout under the artifact root:
//!
//! ```text
//! CURRENT                      -> name of the active version
//! <version>/manifest.json
//! <version>/encoder.json
//! <version>/classifier.json
//! <version>/label_space.json
//! <version>/report.json        (informational)
//! ```
//!
//! A version directory is fully written under a staging name and renamed into
//! place before `CURRENT` is swapped, so readers only ever see complete triples.

use std::{
    fs,
    io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::ArtifactError,
    nlp::{
        classifier::{EvaluationReport, MultiLabelClassifier},
        embeddings::EncoderState,
        label_space::LabelSpace,
    },
};

pub const FORMAT_VERSION: u32 = 1;

const CURRENT: &str = "CURRENT";
const MANIFEST: &str = "manifest.json";
const ENCODER: &str = "encoder.json";
const CLASSIFIER: &str = "classifier.json";
const LABEL_SPACE: &str = "label_space.json";
const REPORT: &str = "report.json";

/// Metadata describing one saved triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub labels: Vec<String>,
    pub dimension: usize,
}

/// Encoder state, classifier and label space that were trained together.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactTriple {
    encoder: EncoderState,
    classifier: MultiLabelClassifier,
    label_space: LabelSpace,
}

impl ArtifactTriple {
    /// Bundle the three parts, rejecting combinations that were not trained together.
    pub fn new(
        encoder: EncoderState,
        classifier: MultiLabelClassifier,
        label_space: LabelSpace,
    ) -> Result<Self, ArtifactError> {
        classifier.validate()?;
        if classifier.labels() != label_space.labels() {
            return Err(ArtifactError::LabelSpaceMismatch {
                classifier: classifier.labels().to_vec(),
                label_space: label_space.labels().to_vec(),
            });
        }
        if classifier.dimension() != encoder.dimension() {
            return Err(ArtifactError::DimensionMismatch {
                encoder: encoder.dimension(),
                classifier: classifier.dimension(),
            });
        }
        Ok(Self {
            encoder,
            classifier,
            label_space,
        })
    }

    pub fn encoder(&self) -> &EncoderState {
        &self.encoder
    }

    pub fn classifier(&self) -> &MultiLabelClassifier {
        &self.classifier
    }

    pub fn label_space(&self) -> &LabelSpace {
        &self.label_space
    }

    pub fn into_parts(self) -> (EncoderState, MultiLabelClassifier, LabelSpace) {
        (self.encoder, self.classifier, self.label_space)
    }

    /// Write a new version under `root` and make it the active one.
    pub fn save(
        &self,
        root: &Path,
        report: Option<&EvaluationReport>,
    ) -> Result<Manifest, ArtifactError> {
        fs::create_dir_all(root).map_err(io_error(root))?;
        let created_at = Utc::now();
        let version = unique_version(root, &created_at);
        self.save_version(root, version, created_at, report)
    }

    fn save_version(
        &self,
        root: &Path,
        version: String,
        created_at: DateTime<Utc>,
        report: Option<&EvaluationReport>,
    ) -> Result<Manifest, ArtifactError> {
        let manifest = Manifest {
            format_version: FORMAT_VERSION,
            version: version.clone(),
            created_at,
            labels: self.label_space.labels().to_vec(),
            dimension: self.encoder.dimension(),
        };

        let staging = root.join(format!(".staging-{version}"));
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(io_error(&staging))?;
        }
        let target = root.join(&version);
        if let Err(err) = self.write_version(&staging, &target, &manifest, report) {
            if let Err(cleanup) = fs::remove_dir_all(&staging) {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    warn!(path = %staging.display(), error = %cleanup, "could not remove staging directory");
                }
            }
            return Err(err);
        }

        let pointer_tmp = root.join(format!(".{CURRENT}.tmp"));
        fs::write(&pointer_tmp, &version).map_err(io_error(&pointer_tmp))?;
        let pointer = root.join(CURRENT);
        fs::rename(&pointer_tmp, &pointer).map_err(io_error(&pointer))?;

        info!(%version, path = %target.display(), labels = ?manifest.labels, "saved model artifacts");
        Ok(manifest)
    }

    fn write_version(
        &self,
        staging: &Path,
        target: &Path,
        manifest: &Manifest,
        report: Option<&EvaluationReport>,
    ) -> Result<(), ArtifactError> {
        fs::create_dir_all(staging).map_err(io_error(staging))?;
        write_json(&staging.join(ENCODER), &self.encoder)?;
        write_json(&staging.join(CLASSIFIER), &self.classifier)?;
        write_json(&staging.join(LABEL_SPACE), &self.label_space)?;
        if let Some(report) = report {
            write_json(&staging.join(REPORT), report)?;
        }
        // manifest last: a directory without one is never loadable
        write_json(&staging.join(MANIFEST), manifest)?;
        fs::rename(staging, target).map_err(io_error(target))
    }

    /// Load the version named by `root/CURRENT`.
    pub fn load_current(root: &Path) -> Result<(Self, Manifest), ArtifactError> {
        let pointer = root.join(CURRENT);
        let version = match fs::read_to_string(&pointer) {
            Ok(raw) => raw.trim().to_string(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ArtifactError::NoCurrentVersion(root.to_path_buf()))
            }
            Err(source) => {
                return Err(ArtifactError::Io {
                    path: pointer,
                    source,
                })
            }
        };
        if version.is_empty() {
            return Err(ArtifactError::NoCurrentVersion(root.to_path_buf()));
        }
        Self::load(&root.join(version))
    }

    /// Load and cross-check one version directory. All parts load or none do.
    pub fn load(dir: &Path) -> Result<(Self, Manifest), ArtifactError> {
        let manifest: Manifest = read_json(&dir.join(MANIFEST))?;
        if manifest.format_version != FORMAT_VERSION {
            return Err(ArtifactError::FormatVersion {
                expected: FORMAT_VERSION,
                found: manifest.format_version,
            });
        }
        let directory = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if manifest.version != directory {
            return Err(ArtifactError::VersionMismatch {
                manifest: manifest.version,
                directory,
            });
        }

        let encoder: EncoderState = read_json(&dir.join(ENCODER))?;
        let classifier: MultiLabelClassifier = read_json(&dir.join(CLASSIFIER))?;
        let label_space: LabelSpace = read_json(&dir.join(LABEL_SPACE))?;

        if manifest.labels != label_space.labels() {
            warn!(version = %manifest.version, "manifest labels disagree with label space");
            return Err(ArtifactError::LabelSpaceMismatch {
                classifier: manifest.labels,
                label_space: label_space.labels().to_vec(),
            });
        }
        if manifest.dimension != encoder.dimension() {
            return Err(ArtifactError::DimensionMismatch {
                encoder: encoder.dimension(),
                classifier: manifest.dimension,
            });
        }
        let triple = Self::new(encoder, classifier, label_space)?;
        info!(version = %manifest.version, "loaded model artifacts");
        Ok((triple, manifest))
    }
}

/// Read the informational evaluation report of a version, if it was written.
pub fn read_report(dir: &Path) -> Result<Option<EvaluationReport>, ArtifactError> {
    let path = dir.join(REPORT);
    if !path.exists() {
        return Ok(None);
    }
    read_json(&path).map(Some)
}

/// Directory of the active version, if any.
pub fn current_dir(root: &Path) -> Option<PathBuf> {
    let version = fs::read_to_string(root.join(CURRENT)).ok()?;
    let version = version.trim();
    (!version.is_empty()).then(|| root.join(version))
}

fn unique_version(root: &Path, created_at: &DateTime<Utc>) -> String {
    let base = created_at.format("%Y%m%dT%H%M%S%3fZ").to_string();
    let mut version = base.clone();
    let mut attempt = 1;
    while root.join(&version).exists() {
        version = format!("{base}-{attempt}");
        attempt += 1;
    }
    version
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> ArtifactError {
    let path = path.to_path_buf();
    move |source| ArtifactError::Io { path, source }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ArtifactError> {
    let body = serde_json::to_vec_pretty(value).map_err(|source| ArtifactError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, body).map_err(io_error(path))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let raw = fs::read(path).map_err(io_error(path))?;
    serde_json::from_slice(&raw).map_err(|source| ArtifactError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple() -> ArtifactTriple {
        let classifier = serde_json::from_str(
            r#"{"labels": ["a"], "dimension": 2, "threshold": 0.5, "models": [
                {"kind": "logistic", "weights": [0.5, -0.5], "intercept": 0.0}
            ]}"#,
        )
        .unwrap();
        let label_space = LabelSpace::try_from(vec!["a".to_string()]).unwrap();
        ArtifactTriple::new(EncoderState::Hashing { dimension: 2 }, classifier, label_space)
            .unwrap()
    }

    #[test]
    fn failed_save_leaves_no_staging_directory() {
        let root = tempfile::tempdir().unwrap();
        let blocked = root.path().join("v1");
        fs::create_dir_all(&blocked).unwrap();
        fs::write(blocked.join("occupied"), "x").unwrap();

        let result = triple().save_version(root.path(), "v1".to_string(), Utc::now(), None);
        assert!(matches!(result, Err(ArtifactError::Io { .. })));
        assert!(!root.path().join(".staging-v1").exists());
        assert!(current_dir(root.path()).is_none());
    }

    #[test]
    fn saved_triple_loads_back_identically() {
        let root = tempfile::tempdir().unwrap();
        let saved = triple();
        let manifest = saved.save(root.path(), None).unwrap();
        let (loaded, loaded_manifest) = ArtifactTriple::load_current(root.path()).unwrap();
        assert_eq!(loaded, saved);
        assert_eq!(loaded_manifest, manifest);
        assert_eq!(read_report(&root.path().join(&manifest.version)).unwrap(), None);
    }
}

//! Process-lifetime model ownership.
//!
//! The detector and the three classifier sessions are loaded once, at
//! startup, and shared read-only for the life of the process. Sessions
//! are configured for inference at construction (optimization level,
//! intra-op threads) and never reconfigured afterwards; `session.run`
//! needs `&mut`, so each session sits behind its own mutex and access
//! is serialized per model. Dropping the context releases the
//! underlying runtime resources.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;

use crate::config::{Config, ModelSpec};
use crate::detect::RetinaFaceDetector;
use crate::error::ScanError;
use crate::scoring::Classifier;

/// One classifier capability backed by an ONNX session.
///
/// Only the session's primary output is read; auxiliary outputs
/// (attention maps, secondary heads) are ignored.
pub struct OnnxClassifier {
    name: String,
    session: Mutex<Session>,
}

impl OnnxClassifier {
    fn new(name: &str, session: Session) -> Self {
        Self {
            name: name.to_string(),
            session: Mutex::new(session),
        }
    }
}

impl Classifier for OnnxClassifier {
    fn infer(&self, batch: &Array4<f32>) -> Result<[f32; 2], ScanError> {
        let (n, channels, height, width) = batch.dim();
        let data: Vec<f32> = batch.iter().copied().collect();

        let input_tensor = Tensor::from_array(([n, channels, height, width], data.into_boxed_slice()))
            .map_err(|e| ScanError::inference(&self.name, e))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ScanError::ModelInference {
                name: self.name.clone(),
                reason: "session lock poisoned".to_string(),
            })?;

        let outputs = session
            .run(ort::inputs!["input" => input_tensor])
            .map_err(|e| ScanError::inference(&self.name, e))?;

        let primary = outputs.iter().next().ok_or_else(|| ScanError::MalformedOutput {
            name: self.name.clone(),
            reason: "no outputs".to_string(),
        })?;

        let (_shape, logits) = primary
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e| ScanError::inference(&self.name, e))?;

        if logits.len() < 2 {
            return Err(ScanError::MalformedOutput {
                name: self.name.clone(),
                reason: format!("expected 2 class logits, got {}", logits.len()),
            });
        }

        Ok([logits[0], logits[1]])
    }
}

/// Owns the detector and classifier handles for the process lifetime.
pub struct InferenceContext {
    detector: RetinaFaceDetector,
    model_a: OnnxClassifier,
    model_b: OnnxClassifier,
    model_c: OnnxClassifier,
}

impl InferenceContext {
    /// Load all four models per the configuration, downloading any that
    /// are missing but have a configured source URL.
    pub fn load(config: &Config) -> Result<Self, ScanError> {
        let dir = &config.models.dir;
        std::fs::create_dir_all(dir)?;

        let threads = config.runtime.intra_threads;

        let detector_path = ensure_model(dir, "detector", &config.models.detector)?;
        let detector_session = build_session("detector", &detector_path, threads)?;
        tracing::info!(path = ?detector_path, "Detector model loaded");

        let model_a = load_classifier(dir, "branch_a", &config.models.branch_a, threads)?;
        let model_b = load_classifier(dir, "branch_b", &config.models.branch_b, threads)?;
        let model_c = load_classifier(dir, "branch_c", &config.models.branch_c, threads)?;

        Ok(Self {
            detector: RetinaFaceDetector::new(
                detector_session,
                config.detector.confidence_threshold,
            ),
            model_a,
            model_b,
            model_c,
        })
    }

    pub fn detector(&self) -> &RetinaFaceDetector {
        &self.detector
    }

    pub fn classifiers(&self) -> [&dyn Classifier; 3] {
        [&self.model_a, &self.model_b, &self.model_c]
    }
}

fn load_classifier(
    dir: &Path,
    name: &str,
    spec: &ModelSpec,
    threads: usize,
) -> Result<OnnxClassifier, ScanError> {
    let path = ensure_model(dir, name, spec)?;
    let session = build_session(name, &path, threads)?;
    tracing::info!(model = %name, path = ?path, "Classifier model loaded");
    Ok(OnnxClassifier::new(name, session))
}

fn build_session(name: &str, path: &Path, threads: usize) -> Result<Session, ScanError> {
    let build = || -> Result<Session, ort::Error> {
        Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(threads)?
            .commit_from_file(path)
    };

    build().map_err(|source| ScanError::ModelLoad {
        name: name.to_string(),
        source,
    })
}

/// Resolve a model file inside the models directory, downloading it
/// when absent and a URL is configured.
fn ensure_model(dir: &Path, name: &str, spec: &ModelSpec) -> Result<PathBuf, ScanError> {
    let model_path = dir.join(&spec.file);

    if model_path.exists() {
        return Ok(model_path);
    }

    let url = spec.url.as_ref().ok_or_else(|| {
        ScanError::ModelMissing(model_path.display().to_string())
    })?;

    tracing::info!(model = %spec.file, "Downloading model...");
    let response = ureq::get(url).call().map_err(|e| ScanError::ModelDownload {
        name: name.to_string(),
        reason: e.to_string(),
    })?;

    let mut file = std::fs::File::create(&model_path)?;
    std::io::copy(&mut response.into_reader(), &mut file)?;
    tracing::info!(model = %spec.file, path = ?model_path, "Model downloaded");

    Ok(model_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelSpec;

    #[test]
    fn test_ensure_model_missing_without_url() {
        let dir = tempfile::tempdir().unwrap();
        let spec = ModelSpec {
            file: "absent.onnx".to_string(),
            url: None,
        };
        let err = ensure_model(dir.path(), "branch_a", &spec).unwrap_err();
        assert!(matches!(err, ScanError::ModelMissing(_)));
    }

    #[test]
    fn test_ensure_model_existing_file_skips_download() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("present.onnx");
        std::fs::write(&path, b"weights").unwrap();

        let spec = ModelSpec {
            file: "present.onnx".to_string(),
            url: Some("http://127.0.0.1:9/unreachable".to_string()),
        };
        let resolved = ensure_model(dir.path(), "branch_a", &spec).unwrap();
        assert_eq!(resolved, path);
    }
}

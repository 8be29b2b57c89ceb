//! End-to-end per-image prediction.
//!
//! detect -> collapse duplicates -> per surviving face: align and score.
//! Faces are scored sequentially in detection order; the pipeline holds
//! no state between calls beyond the shared read-only model handles.

use image::RgbImage;

use crate::config::Config;
use crate::context::InferenceContext;
use crate::detect::{dedup, BoundingBox, DedupPolicy, FaceDetector};
use crate::error::ScanError;
use crate::scoring::{align, EnsembleScorer, ALIGNED_SIZE};

/// One surviving face with its fused manipulation score.
#[derive(Debug, Clone)]
pub struct ScoredFace {
    pub bbox: BoundingBox,
    pub score: f32,
}

/// Ordered per-face results for one image.
///
/// An image with no detectable faces yields `faces: []`, a well-formed
/// result deliberately distinct from any error.
#[derive(Debug, Clone, Default)]
pub struct PredictionResult {
    pub faces: Vec<ScoredFace>,
}

impl PredictionResult {
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }
}

pub struct PredictionPipeline<'a> {
    detector: &'a dyn FaceDetector,
    scorer: EnsembleScorer<'a>,
    dedup_policy: DedupPolicy,
}

impl<'a> PredictionPipeline<'a> {
    pub fn new(
        detector: &'a dyn FaceDetector,
        scorer: EnsembleScorer<'a>,
        dedup_policy: DedupPolicy,
    ) -> Self {
        Self {
            detector,
            scorer,
            dedup_policy,
        }
    }

    /// Wire the pipeline to the loaded model context.
    pub fn from_context(context: &'a InferenceContext, config: &Config) -> Self {
        let [model_a, model_b, model_c] = context.classifiers();
        Self::new(
            context.detector(),
            EnsembleScorer::new(model_a, model_b, model_c, config.fusion),
            config.dedup,
        )
    }

    /// Score every canonical face in one image.
    pub fn predict(&self, image: &RgbImage) -> Result<PredictionResult, ScanError> {
        let detections = self.detector.detect(image)?;
        if detections.is_empty() {
            tracing::debug!("No faces detected");
            return Ok(PredictionResult::default());
        }

        let kept = dedup(&detections, self.dedup_policy);
        tracing::debug!(
            raw = detections.len(),
            kept = kept.len(),
            "Collapsed duplicate detections"
        );

        let mut faces = Vec::with_capacity(kept.len());
        for &index in &kept {
            let detection = &detections[index];
            let aligned = align(image, &detection.landmarks, ALIGNED_SIZE);
            let score = self.scorer.score(&aligned)?;
            tracing::debug!(face = index, score, "Scored face");
            faces.push(ScoredFace {
                bbox: detection.bbox,
                score,
            });
        }

        tracing::info!(faces = faces.len(), "Prediction complete");
        Ok(PredictionResult { faces })
    }
}

//! Three-branch ensemble scoring of an aligned face.
//!
//! Each branch applies its own pre-processing to the canonical 320x320
//! crop, runs one classifier, and takes the softmax probability of the
//! "manipulated" class. The three probabilities are fused with fixed,
//! empirically-tuned weights into a single per-face score.

use ndarray::{Array3, Array4};
use serde::{Deserialize, Serialize};

use crate::error::ScanError;
use crate::scoring::imaging::{bilinear_resize, normalize, softmax2, to_batch};

/// Boundary to one classifier capability.
///
/// Returns the raw two-class logits `[authentic, manipulated]` for a
/// batch of one; implementations with auxiliary outputs (attention
/// maps, secondary heads) discard them. Must be deterministic for
/// identical input.
pub trait Classifier: Send + Sync {
    fn infer(&self, batch: &Array4<f32>) -> Result<[f32; 2], ScanError>;
}

/// Class index of the "manipulated" softmax output.
const MANIPULATED_CLASS: usize = 1;

/// Branch A input edge (bilinear resize from the 320 crop).
pub const BRANCH_A_INPUT: usize = 299;
/// Branch C input edge (bilinear resize of branch B's normalized tensor).
pub const BRANCH_C_INPUT: usize = 300;

/// Per-channel statistics for branch B/C normalization, RGB order.
pub const CHANNEL_MEAN: [f32; 3] = [0.4479, 0.3744, 0.3473];
pub const CHANNEL_STD: [f32; 3] = [0.2537, 0.2502, 0.2424];

/// Fusion weights over the three branch probabilities.
///
/// The defaults reflect each model's validated reliability and are
/// deliberate design constants, not request-time parameters; operators
/// re-tune them through configuration, never per call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub branch_a: f32,
    pub branch_b: f32,
    pub branch_c: f32,
}

pub const DEFAULT_WEIGHT_A: f32 = 0.2;
pub const DEFAULT_WEIGHT_B: f32 = 0.7;
pub const DEFAULT_WEIGHT_C: f32 = 0.1;

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            branch_a: DEFAULT_WEIGHT_A,
            branch_b: DEFAULT_WEIGHT_B,
            branch_c: DEFAULT_WEIGHT_C,
        }
    }
}

impl FusionWeights {
    /// Weighted sum of the three branch probabilities.
    pub fn fuse(&self, prob_a: f32, prob_b: f32, prob_c: f32) -> f32 {
        self.branch_a * prob_a + self.branch_b * prob_b + self.branch_c * prob_c
    }
}

/// Runs the three classifier branches and fuses their outputs.
///
/// Holds no mutable state; scoring independent faces concurrently is
/// safe as long as the classifier implementations are.
pub struct EnsembleScorer<'a> {
    model_a: &'a dyn Classifier,
    model_b: &'a dyn Classifier,
    model_c: &'a dyn Classifier,
    weights: FusionWeights,
}

impl<'a> EnsembleScorer<'a> {
    pub fn new(
        model_a: &'a dyn Classifier,
        model_b: &'a dyn Classifier,
        model_c: &'a dyn Classifier,
        weights: FusionWeights,
    ) -> Self {
        Self {
            model_a,
            model_b,
            model_c,
            weights,
        }
    }

    /// Score one aligned 320x320 face, returning the fused probability
    /// that it is manipulated.
    pub fn score(&self, face: &Array3<f32>) -> Result<f32, ScanError> {
        // Branch A: 299x299, intensity rescaled from [0,1] to [-1,1].
        let mut input_a = bilinear_resize(face, BRANCH_A_INPUT, BRANCH_A_INPUT);
        input_a.mapv_inplace(|x| (x - 0.5) * 2.0);
        let prob_a = self.branch_probability(self.model_a, input_a)?;

        // Branch B: the original crop, per-channel normalized.
        let normalized = normalize(face, CHANNEL_MEAN, CHANNEL_STD);
        let prob_b = self.branch_probability(self.model_b, normalized.clone())?;

        // Branch C: branch B's tensor resized to 300x300.
        let input_c = bilinear_resize(&normalized, BRANCH_C_INPUT, BRANCH_C_INPUT);
        let prob_c = self.branch_probability(self.model_c, input_c)?;

        Ok(self.weights.fuse(prob_a, prob_b, prob_c))
    }

    fn branch_probability(
        &self,
        model: &dyn Classifier,
        input: Array3<f32>,
    ) -> Result<f32, ScanError> {
        let logits = model.infer(&to_batch(input))?;
        Ok(softmax2(logits)[MANIPULATED_CLASS])
    }
}

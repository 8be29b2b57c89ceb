//! Face detection types, the detector seam, and duplicate collapsing.

pub mod dedup;
pub mod geometry;
mod retinaface;

pub use dedup::{dedup, DedupPolicy};
pub use geometry::BoundingBox;
pub use retinaface::RetinaFaceDetector;

use image::RgbImage;

use crate::error::ScanError;

/// Five facial landmark points in pixel coordinates, ordered
/// left eye, right eye, nose tip, left mouth corner, right mouth corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Landmarks(pub [[i32; 2]; 5]);

/// A single face hypothesis: box, landmarks and detector confidence.
#[derive(Debug, Clone)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub landmarks: Landmarks,
    pub confidence: f32,
}

/// Detections for one image, in the detector's emission order.
///
/// Order is semantic: duplicate collapsing is first-seen-wins, so the
/// sequence must not be re-sorted between detection and dedup.
pub type DetectionSet = Vec<Detection>;

/// Boundary to the face detection capability.
///
/// Implementations may return an empty set; that is a valid outcome,
/// not an error.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, image: &RgbImage) -> Result<DetectionSet, ScanError>;
}

//! ONNX-backed face detector.
//!
//! Wraps a RetinaFace-style detection graph exported with its decode
//! step baked in: the model takes one NCHW frame and emits per-anchor
//! class scores, normalized boxes and normalized 5-point landmarks.
//! The network architecture itself is an external artifact; this module
//! only owns tensor conversion and output parsing.

use std::sync::Mutex;

use image::RgbImage;
use ort::session::Session;
use ort::value::Tensor;

use super::{BoundingBox, Detection, DetectionSet, FaceDetector, Landmarks};
use crate::error::ScanError;

/// Fixed detector input edge. Frames are resized to this square.
const INPUT_SIZE: u32 = 640;

/// Per-channel pixel means the detector was trained with, RGB order.
const PIXEL_MEAN: [f32; 3] = [123.0, 117.0, 104.0];

/// IoU above which overlapping anchors are suppressed in-detector.
const NMS_IOU_THRESHOLD: f32 = 0.4;

pub struct RetinaFaceDetector {
    session: Mutex<Session>,
    confidence_threshold: f32,
}

impl RetinaFaceDetector {
    pub fn new(session: Session, confidence_threshold: f32) -> Self {
        Self {
            session: Mutex::new(session),
            confidence_threshold,
        }
    }
}

impl FaceDetector for RetinaFaceDetector {
    fn detect(&self, image: &RgbImage) -> Result<DetectionSet, ScanError> {
        let (orig_width, orig_height) = image.dimensions();

        let resized = image::imageops::resize(
            image,
            INPUT_SIZE,
            INPUT_SIZE,
            image::imageops::FilterType::Triangle,
        );

        // NCHW, mean-subtracted
        let side = INPUT_SIZE as usize;
        let mut input_data = vec![0.0f32; 3 * side * side];
        for y in 0..side {
            for x in 0..side {
                let pixel = resized.get_pixel(x as u32, y as u32);
                let idx = y * side + x;
                input_data[idx] = pixel[0] as f32 - PIXEL_MEAN[0];
                input_data[side * side + idx] = pixel[1] as f32 - PIXEL_MEAN[1];
                input_data[2 * side * side + idx] = pixel[2] as f32 - PIXEL_MEAN[2];
            }
        }

        let input_tensor = Tensor::from_array(([1usize, 3, side, side], input_data.into_boxed_slice()))
            .map_err(|e| ScanError::inference("detector", e))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ScanError::ModelInference {
                name: "detector".to_string(),
                reason: "session lock poisoned".to_string(),
            })?;

        let outputs = session
            .run(ort::inputs!["input" => input_tensor])
            .map_err(|e| ScanError::inference("detector", e))?;

        let scores_value = outputs.get("scores").ok_or_else(|| ScanError::MalformedOutput {
            name: "detector".to_string(),
            reason: "missing scores output".to_string(),
        })?;
        let boxes_value = outputs.get("boxes").ok_or_else(|| ScanError::MalformedOutput {
            name: "detector".to_string(),
            reason: "missing boxes output".to_string(),
        })?;
        let landmarks_value =
            outputs.get("landmarks").ok_or_else(|| ScanError::MalformedOutput {
                name: "detector".to_string(),
                reason: "missing landmarks output".to_string(),
            })?;

        let (scores_shape, scores_data) = scores_value
            .try_extract_tensor::<f32>()
            .map_err(|e| ScanError::inference("detector", e))?;
        let (_, boxes_data) = boxes_value
            .try_extract_tensor::<f32>()
            .map_err(|e| ScanError::inference("detector", e))?;
        let (_, landmarks_data) = landmarks_value
            .try_extract_tensor::<f32>()
            .map_err(|e| ScanError::inference("detector", e))?;

        // scores: [1, N, 2], boxes: [1, N, 4], landmarks: [1, N, 10],
        // box and landmark coordinates normalized to [0,1].
        let num_anchors = scores_shape[1] as usize;
        if boxes_data.len() < num_anchors * 4 || landmarks_data.len() < num_anchors * 10 {
            return Err(ScanError::MalformedOutput {
                name: "detector".to_string(),
                reason: format!(
                    "anchor count mismatch: {} scores, {} box values, {} landmark values",
                    num_anchors,
                    boxes_data.len(),
                    landmarks_data.len()
                ),
            });
        }

        let width = orig_width as f32;
        let height = orig_height as f32;
        let mut detections = Vec::new();

        for i in 0..num_anchors {
            let confidence = scores_data[i * 2 + 1];
            if confidence <= self.confidence_threshold {
                continue;
            }

            let bbox = BoundingBox::new(
                boxes_data[i * 4] * width,
                boxes_data[i * 4 + 1] * height,
                boxes_data[i * 4 + 2] * width,
                boxes_data[i * 4 + 3] * height,
            );

            let mut points = [[0i32; 2]; 5];
            for (p, point) in points.iter_mut().enumerate() {
                point[0] = (landmarks_data[i * 10 + p * 2] * width).round() as i32;
                point[1] = (landmarks_data[i * 10 + p * 2 + 1] * height).round() as i32;
            }

            detections.push(Detection {
                bbox,
                landmarks: Landmarks(points),
                confidence,
            });
        }

        Ok(suppress_overlapping(detections, NMS_IOU_THRESHOLD))
    }
}

/// Greedy IoU suppression of overlapping anchors, highest confidence
/// first. This is the detector's own anchor cleanup; the pipeline still
/// runs its order-dependent duplicate collapse on the result.
fn suppress_overlapping(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Detection> = Vec::with_capacity(detections.len());
    for det in detections {
        let overlaps = keep.iter().any(|kept| iou(&det.bbox, &kept.bbox) > iou_threshold);
        if !overlaps {
            keep.push(det);
        }
    }
    keep
}

fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let intersection = super::geometry::overlap_area(a, b);
    let union = a.area() + b.area() - intersection;
    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

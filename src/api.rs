//! Wire types for the scan request/response boundary.
//!
//! The request carries an identifier and a base64-encoded image; the
//! response carries the face count and one record per surviving face.
//! Field names are fixed by the consuming service contract.

use base64::Engine;
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::ScanError;
use crate::pipeline::PredictionResult;

#[derive(Debug, Clone, Deserialize)]
pub struct ScanRequest {
    pub uuid: String,
    /// Base64-encoded image bytes (any format the decoder supports).
    pub image: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanResponse {
    pub uuid: String,
    #[serde(rename = "faceNum")]
    pub face_num: usize,
    pub faces: Vec<FaceRecord>,
}

/// One face in the response: integer box corners and the fused score.
#[derive(Debug, Clone, Serialize)]
pub struct FaceRecord {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub score: f32,
}

impl ScanRequest {
    /// Decode the base64 image payload into pixels.
    pub fn decode_image(&self) -> Result<RgbImage, ScanError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&self.image)
            .map_err(|e| ScanError::InputDecode(format!("invalid base64: {e}")))?;
        decode_image(&bytes)
    }
}

/// Decode raw image bytes into RGB pixels.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, ScanError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgb8())
        .map_err(|e| ScanError::InputDecode(e.to_string()))
}

impl ScanResponse {
    /// Build the response for one request.
    ///
    /// A zero-face result serializes as `faceNum: 0, faces: []`, a
    /// well-formed response rather than an error.
    pub fn from_result(uuid: &str, result: &PredictionResult) -> Self {
        let faces = result
            .faces
            .iter()
            .map(|face| FaceRecord {
                x1: face.bbox.x1 as i32,
                y1: face.bbox.y1 as i32,
                x2: face.bbox.x2 as i32,
                y2: face.bbox.y2 as i32,
                score: face.score,
            })
            .collect();

        Self {
            uuid: uuid.to_string(),
            face_num: result.len(),
            faces,
        }
    }
}

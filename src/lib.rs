//! Veriface: a deepfake detection engine.
//!
//! Locates faces in an image, collapses duplicate detections into a
//! canonical set, aligns each surviving face, and fuses the outputs of
//! three independently-trained classifiers into one manipulation score
//! per face.

pub mod api;
pub mod config;
pub mod context;
pub mod detect;
pub mod error;
pub mod export;
pub mod logging;
pub mod pipeline;
pub mod scoring;

pub use config::Config;
pub use context::InferenceContext;
pub use error::ScanError;
pub use pipeline::{PredictionPipeline, PredictionResult, ScoredFace};

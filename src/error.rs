use thiserror::Error;

/// Errors surfaced by the scan pipeline and its model boundaries.
///
/// An image with no detectable faces is NOT an error; it produces an
/// empty [`crate::pipeline::PredictionResult`].
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to decode input image: {0}")]
    InputDecode(String),

    #[error("model file not found: {0}")]
    ModelMissing(String),

    #[error("failed to load model {name}: {source}")]
    ModelLoad {
        name: String,
        #[source]
        source: ort::Error,
    },

    #[error("inference failed for model {name}: {reason}")]
    ModelInference { name: String, reason: String },

    #[error("model {name} returned malformed output: {reason}")]
    MalformedOutput { name: String, reason: String },

    #[error("model download failed for {name}: {reason}")]
    ModelDownload { name: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScanError {
    /// Wrap an ort error from a `session.run` call.
    pub fn inference(name: &str, err: ort::Error) -> Self {
        ScanError::ModelInference {
            name: name.to_string(),
            reason: err.to_string(),
        }
    }
}

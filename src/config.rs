use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::detect::DedupPolicy;
use crate::scoring::FusionWeights;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub detector: DetectorConfig,

    #[serde(default)]
    pub dedup: DedupPolicy,

    #[serde(default)]
    pub fusion: FusionWeights,

    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// One model file, optionally fetchable when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    pub file: String,

    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_models_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_detector_model")]
    pub detector: ModelSpec,

    #[serde(default = "default_branch_a_model")]
    pub branch_a: ModelSpec,

    #[serde(default = "default_branch_b_model")]
    pub branch_b: ModelSpec,

    #[serde(default = "default_branch_c_model")]
    pub branch_c: ModelSpec,
}

fn default_models_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("veriface")
        .join("models")
}

fn default_detector_model() -> ModelSpec {
    ModelSpec {
        file: "retinaface-resnet50.onnx".to_string(),
        url: None,
    }
}

fn default_branch_a_model() -> ModelSpec {
    ModelSpec {
        file: "xception.onnx".to_string(),
        url: None,
    }
}

fn default_branch_b_model() -> ModelSpec {
    ModelSpec {
        file: "wsdan-xception.onnx".to_string(),
        url: None,
    }
}

fn default_branch_c_model() -> ModelSpec {
    ModelSpec {
        file: "wsdan-efficientnet.onnx".to_string(),
        url: None,
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            dir: default_models_dir(),
            detector: default_detector_model(),
            branch_a: default_branch_a_model(),
            branch_b: default_branch_b_model(),
            branch_c: default_branch_c_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
}

fn default_confidence_threshold() -> f32 {
    0.7
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Intra-op thread count for each ONNX session.
    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,
}

fn default_intra_threads() -> usize {
    4
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            intra_threads: default_intra_threads(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            models: ModelsConfig::default(),
            detector: DetectorConfig::default(),
            dedup: DedupPolicy::default(),
            fusion: FusionWeights::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    pub fn load_from(config_path: PathBuf) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            // Create default config
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    fn save_to(&self, config_path: &PathBuf) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;

        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("veriface")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::dedup::DEFAULT_OVERLAP_RATIO;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(
            config.dedup,
            DedupPolicy::AreaOverlap {
                min_ratio: DEFAULT_OVERLAP_RATIO
            }
        );
        assert_eq!(config.fusion, FusionWeights::default());
        assert_eq!(config.detector.confidence_threshold, 0.7);
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.fusion, config.fusion);
        assert_eq!(back.dedup, config.dedup);
        assert_eq!(back.models.branch_b.file, config.models.branch_b.file);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let text = r#"
            [fusion]
            branch_a = 0.3
            branch_b = 0.6
            branch_c = 0.1

            [dedup]
            policy = "corner_distance"
            max_shift = 12.0
        "#;
        let config: Config = toml::from_str(text).unwrap();
        assert_eq!(config.fusion.branch_a, 0.3);
        assert_eq!(config.dedup, DedupPolicy::CornerDistance { max_shift: 12.0 });
        assert_eq!(config.detector.confidence_threshold, 0.7);
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config::load_from(path.clone()).unwrap();
        assert!(path.exists());
        assert_eq!(config.detector.confidence_threshold, 0.7);
    }
}

//! Classifier configuration.

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_MODEL_PATH: &str = "models/vit-base-patch16-224/model.onnx";
const DEFAULT_LABELS_PATH: &str = "models/vit-base-patch16-224/config.json";
const DEFAULT_OUTPUT_NAME: &str = "logits";

/// Input geometry and normalization expected by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessConfig {
    /// Model input width
    pub width: u32,
    /// Model input height
    pub height: u32,
    /// Per-channel mean, applied after rescaling to [0, 1]
    pub mean: [f32; 3],
    /// Per-channel standard deviation
    pub std: [f32; 3],
}

impl Default for PreprocessConfig {
    /// ViT image processor defaults: 224x224, mean 0.5, std 0.5.
    fn default() -> Self {
        Self {
            width: 224,
            height: 224,
            mean: [0.5, 0.5, 0.5],
            std: [0.5, 0.5, 0.5],
        }
    }
}

/// Configuration for the ONNX classifier.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Path to ONNX model file
    pub model_path: PathBuf,
    /// Path to labels (HF config.json or one label per line)
    pub labels_path: PathBuf,
    /// Name of the logits output tensor
    pub output_name: String,
    /// Input preprocessing
    pub preprocess: PreprocessConfig,
    /// Deadline for one inference pass
    pub inference_timeout: Duration,
    /// Intra-op threads (None lets ONNX Runtime decide)
    pub intra_threads: Option<usize>,
    /// Run one inference at load time to validate output size
    pub warm_up: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            labels_path: PathBuf::from(DEFAULT_LABELS_PATH),
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            preprocess: PreprocessConfig::default(),
            inference_timeout: Duration::from_secs(30),
            intra_threads: None,
            warm_up: true,
        }
    }
}

impl ClassifierConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = PreprocessConfig::default();
        let input_size: u32 = std::env::var("VIDISNAP_INPUT_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|s| *s > 0)
            .unwrap_or(defaults.width);

        Self {
            model_path: std::env::var("VIDISNAP_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL_PATH)),
            labels_path: std::env::var("VIDISNAP_LABELS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_LABELS_PATH)),
            output_name: std::env::var("VIDISNAP_MODEL_OUTPUT")
                .unwrap_or_else(|_| DEFAULT_OUTPUT_NAME.to_string()),
            preprocess: PreprocessConfig {
                width: input_size,
                height: input_size,
                mean: std::env::var("VIDISNAP_NORMALIZE_MEAN")
                    .ok()
                    .and_then(|s| parse_triple(&s))
                    .unwrap_or(defaults.mean),
                std: std::env::var("VIDISNAP_NORMALIZE_STD")
                    .ok()
                    .and_then(|s| parse_triple(&s))
                    .filter(|t| t.iter().all(|v| *v > 0.0))
                    .unwrap_or(defaults.std),
            },
            inference_timeout: Duration::from_secs(
                std::env::var("VIDISNAP_INFERENCE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            intra_threads: std::env::var("VIDISNAP_INFERENCE_THREADS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0),
            warm_up: std::env::var("VIDISNAP_MODEL_WARM_UP")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        }
    }
}

/// Parse "a,b,c" into three floats.
fn parse_triple(s: &str) -> Option<[f32; 3]> {
    let values: Vec<f32> = s
        .split(',')
        .map(|v| v.trim().parse().ok())
        .collect::<Option<Vec<f32>>>()?;

    match values.as_slice() {
        [a, b, c] => Some([*a, *b, *c]),
        _ => None,
    }
}

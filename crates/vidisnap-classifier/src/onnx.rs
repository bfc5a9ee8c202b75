//! ONNX Runtime image classifier.
//!
//! The session is built once per process and shared by every request.
//! Execution provider selection:
//! - CUDA on Linux with NVIDIA GPU (when `cuda` feature enabled)
//! - CoreML on macOS
//! - CPU fallback on all platforms

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::{RunOptions, Session};
use ort::value::{Tensor, Value};
use tracing::{debug, info, warn};
use vidisnap_media::ExtractedFrame;
use vidisnap_models::ClassificationResult;

use crate::classifier::Classifier;
use crate::config::ClassifierConfig;
use crate::error::{ClassifyError, ClassifyResult};
use crate::preprocess::{input_shape, to_nchw};
use crate::softmax::softmax;
use crate::vocabulary::Vocabulary;

/// Loaded network plus the name of its logits output.
struct OnnxModel {
    session: Mutex<Session>,
    output_name: String,
}

impl OnnxModel {
    /// Run one forward pass and return the flattened logits.
    fn run(
        &self,
        data: Vec<f32>,
        shape: Vec<usize>,
        options: &RunOptions,
    ) -> ClassifyResult<Vec<f32>> {
        let input: Value = Tensor::from_array((shape, data.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| {
                ClassifyError::inference_failed(format!("Failed to create tensor: {}", e))
            })?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ClassifyError::inference_failed("Session lock poisoned"))?;

        let outputs = session
            .run_with_options(ort::inputs![input], options)
            .map_err(|e| ClassifyError::inference_failed(format!("ONNX inference failed: {}", e)))?;

        let output = outputs.get(self.output_name.as_str()).ok_or_else(|| {
            ClassifyError::inference_failed(format!("Missing {} tensor", self.output_name))
        })?;

        let tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                ClassifyError::inference_failed(format!("Failed to extract tensor: {}", e))
            })?;

        Ok(tensor.1.iter().copied().collect())
    }
}

/// Terminates an in-flight run when dropped unless disarmed.
///
/// Dropping the classify future (client gone, pipeline budget spent) or
/// hitting the inference deadline stops the blocking ONNX run instead of
/// letting it finish in the background.
struct TerminateOnDrop {
    options: Arc<RunOptions>,
    armed: bool,
}

impl TerminateOnDrop {
    fn new(options: Arc<RunOptions>) -> Self {
        Self { options, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TerminateOnDrop {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.options.terminate() {
                warn!(error = %e, "Failed to terminate ONNX run");
            }
        }
    }
}

/// Vision transformer (or any single-logits-output) classifier over ONNX Runtime.
pub struct OnnxClassifier {
    model: Arc<OnnxModel>,
    vocabulary: Arc<Vocabulary>,
    config: ClassifierConfig,
}

impl OnnxClassifier {
    /// Load model and vocabulary.
    ///
    /// Any failure here means the service cannot classify and is reported
    /// as `ModelUnavailable`.
    pub fn load(config: ClassifierConfig) -> ClassifyResult<Self> {
        if !config.model_path.exists() {
            return Err(ClassifyError::model_unavailable(format!(
                "model not found: {}",
                config.model_path.display()
            )));
        }

        let vocabulary = Vocabulary::load(&config.labels_path).map_err(|e| match e {
            ClassifyError::InvalidVocabulary(msg) => ClassifyError::model_unavailable(msg),
            other => other,
        })?;

        let session = create_session(&config.model_path, config.intra_threads)?;
        let model = OnnxModel {
            session: Mutex::new(session),
            output_name: config.output_name.clone(),
        };

        let classifier = Self {
            model: Arc::new(model),
            vocabulary: Arc::new(vocabulary),
            config,
        };

        if classifier.config.warm_up {
            classifier.warm_up()?;
        }

        info!(
            model_path = %classifier.config.model_path.display(),
            labels = classifier.vocabulary.len(),
            input_width = classifier.config.preprocess.width,
            input_height = classifier.config.preprocess.height,
            "Classifier initialized"
        );

        Ok(classifier)
    }

    /// Run one pass on a blank input and check the output matches the vocabulary.
    fn warm_up(&self) -> ClassifyResult<()> {
        let preprocess = &self.config.preprocess;
        let shape = input_shape(preprocess);
        let data = vec![0.0f32; shape.iter().product()];
        let options = RunOptions::new()
            .map_err(|e| {
                ClassifyError::model_unavailable(format!("Failed to create run options: {}", e))
            })?;

        let logits = self
            .model
            .run(data, shape, &options)
            .map_err(|e| ClassifyError::model_unavailable(e.to_string()))?;

        if logits.len() != self.vocabulary.len() {
            return Err(ClassifyError::model_unavailable(format!(
                "model emits {} logits but vocabulary has {} labels",
                logits.len(),
                self.vocabulary.len()
            )));
        }

        debug!(logits = logits.len(), "Classifier warm-up complete");
        Ok(())
    }
}

#[async_trait]
impl Classifier for OnnxClassifier {
    async fn classify(&self, frame: &ExtractedFrame) -> ClassifyResult<ClassificationResult> {
        if frame.is_degenerate() {
            return Err(ClassifyError::InvalidFrame {
                width: frame.width(),
                height: frame.height(),
            });
        }

        let data = to_nchw(frame.image(), &self.config.preprocess);
        let shape = input_shape(&self.config.preprocess);

        let options = Arc::new(RunOptions::new().map_err(|e| {
            ClassifyError::inference_failed(format!("Failed to create run options: {}", e))
        })?);
        let mut guard = TerminateOnDrop::new(Arc::clone(&options));

        let model = Arc::clone(&self.model);
        let task = tokio::task::spawn_blocking(move || model.run(data, shape, &options));

        let timeout = self.config.inference_timeout;
        let logits = match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join_err)) => {
                return Err(ClassifyError::inference_failed(format!(
                    "inference task failed: {}",
                    join_err
                )))
            }
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs_f64(), "Inference deadline exceeded");
                return Err(ClassifyError::InferenceTimeout(timeout));
            }
        };
        guard.disarm();

        if logits.len() != self.vocabulary.len() {
            return Err(ClassifyError::inference_failed(format!(
                "model emitted {} logits for {} labels",
                logits.len(),
                self.vocabulary.len()
            )));
        }

        let probabilities = softmax(&logits)?;
        Ok(ClassificationResult::rank(self.vocabulary.labels(), &probabilities))
    }

    fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }
}

/// Create ONNX Runtime session with automatic execution provider selection.
fn create_session(model_path: &Path, intra_threads: Option<usize>) -> ClassifyResult<Session> {
    let model_bytes = std::fs::read(model_path)
        .map_err(|e| {
            ClassifyError::model_unavailable(format!("Failed to read model file: {}", e))
        })?;

    let mut builder = Session::builder()
        .map_err(|e| {
            ClassifyError::model_unavailable(format!("Failed to create session builder: {}", e))
        })?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| {
            ClassifyError::model_unavailable(format!("Failed to set optimization level: {}", e))
        })?;

    if let Some(threads) = intra_threads {
        builder = builder
            .with_intra_threads(threads)
            .map_err(|e| {
                ClassifyError::model_unavailable(format!("Failed to set intra threads: {}", e))
            })?;
    }

    #[cfg(all(target_os = "linux", feature = "cuda"))]
    {
        use ort::execution_providers::CUDAExecutionProvider;
        if let Ok(cuda_builder) = builder
            .clone()
            .with_execution_providers([CUDAExecutionProvider::default().build()])
        {
            if let Ok(session) = cuda_builder.commit_from_memory(&model_bytes) {
                info!("Using CUDA execution provider for classification");
                return Ok(session);
            }
        }
        debug!("CUDA execution provider not available, trying alternatives");
    }

    #[cfg(target_os = "macos")]
    {
        use ort::execution_providers::CoreMLExecutionProvider;
        if let Ok(coreml_builder) = builder
            .clone()
            .with_execution_providers([CoreMLExecutionProvider::default().build()])
        {
            if let Ok(session) = coreml_builder.commit_from_memory(&model_bytes) {
                info!("Using CoreML execution provider for classification");
                return Ok(session);
            }
        }
        debug!("CoreML execution provider not available, using CPU");
    }

    info!("Using CPU execution provider for classification");
    builder
        .commit_from_memory(&model_bytes)
        .map_err(|e| ClassifyError::model_unavailable(format!("Failed to load ONNX model: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_model_is_unavailable() {
        let config = ClassifierConfig {
            model_path: "/nonexistent/model.onnx".into(),
            ..Default::default()
        };

        let err = OnnxClassifier::load(config).err().unwrap();
        assert!(matches!(err, ClassifyError::ModelUnavailable(_)));
    }

    #[test]
    fn test_load_bad_model_bytes_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("model.onnx");
        let labels_path = dir.path().join("labels.txt");
        std::fs::write(&model_path, b"not an onnx graph").unwrap();
        std::fs::write(&labels_path, "cat\ndog\n").unwrap();

        let config = ClassifierConfig {
            model_path,
            labels_path,
            ..Default::default()
        };

        let err = OnnxClassifier::load(config).err().unwrap();
        assert!(matches!(err, ClassifyError::ModelUnavailable(_)));
    }

    #[test]
    fn test_load_empty_vocabulary_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("model.onnx");
        let labels_path = dir.path().join("labels.txt");
        std::fs::write(&model_path, b"placeholder").unwrap();
        std::fs::write(&labels_path, "\n").unwrap();

        let config = ClassifierConfig {
            model_path,
            labels_path,
            ..Default::default()
        };

        let err = OnnxClassifier::load(config).err().unwrap();
        assert!(matches!(err, ClassifyError::ModelUnavailable(_)));
    }

    /// Requires the exported ViT model under `models/`.
    #[tokio::test]
    #[ignore = "requires VIDISNAP_MODEL_PATH and VIDISNAP_LABELS_PATH"]
    async fn test_classify_with_real_model() {
        use image::{Rgb, RgbImage};

        let classifier = OnnxClassifier::load(ClassifierConfig::from_env()).unwrap();
        let image =
            RgbImage::from_fn(320, 240, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
        let frame = ExtractedFrame::new(image, Vec::new());

        let first = classifier.classify(&frame).await.unwrap();
        let second = classifier.classify(&frame).await.unwrap();

        assert_eq!(first.len(), classifier.vocabulary().len());
        assert!(first.is_ranked());
        assert_eq!(first, second);

        let total: f32 = first.top(first.len()).iter().map(|e| e.score).sum();
        assert!((total - 1.0).abs() < 1e-3);
    }
}

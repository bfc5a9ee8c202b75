//! Image classification for extracted frames.
//!
//! This crate provides:
//! - The [`Classifier`] seam used by the pipeline
//! - Vocabulary loading (Hugging Face `config.json` or plain label lists)
//! - Deterministic preprocessing into NCHW tensors
//! - Numerically stable softmax
//! - An ONNX Runtime backed classifier loaded once per process

pub mod classifier;
pub mod config;
pub mod error;
pub mod onnx;
pub mod preprocess;
pub mod softmax;
pub mod vocabulary;

pub use classifier::Classifier;
pub use config::{ClassifierConfig, PreprocessConfig};
pub use error::{ClassifyError, ClassifyResult};
pub use onnx::OnnxClassifier;
pub use softmax::softmax;
pub use vocabulary::Vocabulary;

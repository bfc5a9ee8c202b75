//! Classifier error types.

use std::time::Duration;

use thiserror::Error;

pub type ClassifyResult<T> = Result<T, ClassifyError>;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Invalid vocabulary: {0}")]
    InvalidVocabulary(String),

    #[error("Inference timed out after {0:?}")]
    InferenceTimeout(Duration),

    #[error("Invalid frame: {width}x{height}")]
    InvalidFrame { width: u32, height: u32 },

    #[error("Inference failed: {0}")]
    InferenceFailed(String),
}

impl ClassifyError {
    pub fn model_unavailable(msg: impl Into<String>) -> Self {
        Self::ModelUnavailable(msg.into())
    }

    pub fn inference_failed(msg: impl Into<String>) -> Self {
        Self::InferenceFailed(msg.into())
    }

    pub fn invalid_vocabulary(msg: impl Into<String>) -> Self {
        Self::InvalidVocabulary(msg.into())
    }
}

//! Pipeline error types.

use std::fmt;

use thiserror::Error;
use vidisnap_classifier::ClassifyError;
use vidisnap_media::MediaError;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Pipeline stage an error originated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Store,
    Extract,
    Classify,
    Assemble,
    /// The orchestrator itself (overall budget).
    Pipeline,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Store => "store",
            Stage::Extract => "extract",
            Stage::Classify => "classify",
            Stage::Assemble => "assemble",
            Stage::Pipeline => "pipeline",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure category surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    StorageFailure,
    UnsupportedFormat,
    CorruptInput,
    DecodeTimeout,
    ModelUnavailable,
    InferenceTimeout,
    InferenceFailed,
    InvalidFrame,
    EmptyResult,
    PipelineTimeout,
    Internal,
}

impl ErrorKind {
    /// Stable identifier used in logs, metrics and API error codes.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::StorageFailure => "STORAGE_FAILURE",
            ErrorKind::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            ErrorKind::CorruptInput => "CORRUPT_INPUT",
            ErrorKind::DecodeTimeout => "DECODE_TIMEOUT",
            ErrorKind::ModelUnavailable => "MODEL_UNAVAILABLE",
            ErrorKind::InferenceTimeout => "INFERENCE_TIMEOUT",
            ErrorKind::InferenceFailed => "INFERENCE_FAILED",
            ErrorKind::InvalidFrame => "INVALID_FRAME",
            ErrorKind::EmptyResult => "EMPTY_RESULT",
            ErrorKind::PipelineTimeout => "PIPELINE_TIMEOUT",
            ErrorKind::Internal => "INTERNAL",
        }
    }

    /// Caused by the uploaded content rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ErrorKind::UnsupportedFormat | ErrorKind::CorruptInput | ErrorKind::InvalidFrame
        )
    }

    /// A deadline fired.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ErrorKind::DecodeTimeout | ErrorKind::InferenceTimeout | ErrorKind::PipelineTimeout
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed pipeline invocation: where it failed, how, and the detail.
#[derive(Debug, Clone, Error)]
#[error("{stage} stage failed ({kind}): {message}")]
pub struct PipelineError {
    pub stage: Stage,
    pub kind: ErrorKind,
    pub message: String,
}

impl PipelineError {
    pub fn new(stage: Stage, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            message: message.into(),
        }
    }

    pub fn empty_result() -> Self {
        Self::new(Stage::Assemble, ErrorKind::EmptyResult, "classification result is empty")
    }

    /// Budget exhausted while `stalled` was running. Without a known stage
    /// the orchestrator itself is blamed.
    pub fn pipeline_timeout(budget: std::time::Duration, stalled: Option<Stage>) -> Self {
        Self::new(
            stalled.unwrap_or(Stage::Pipeline),
            ErrorKind::PipelineTimeout,
            format!("pipeline exceeded its {:?} budget", budget),
        )
    }

    /// Classify a media error raised in `stage`.
    pub fn from_media(stage: Stage, err: MediaError) -> Self {
        let kind = match &err {
            MediaError::StorageFailure(_) => ErrorKind::StorageFailure,
            MediaError::Io(_) if stage == Stage::Store => ErrorKind::StorageFailure,
            MediaError::UnsupportedFormat(_) | MediaError::FfprobeFailed { .. } => {
                ErrorKind::UnsupportedFormat
            }
            MediaError::CorruptInput(_) | MediaError::FfmpegFailed { .. } => {
                ErrorKind::CorruptInput
            }
            MediaError::Timeout(_) => ErrorKind::DecodeTimeout,
            MediaError::FfmpegNotFound
            | MediaError::FfprobeNotFound
            | MediaError::UnknownHandle(_)
            | MediaError::FileNotFound(_)
            | MediaError::Encode(_)
            | MediaError::Io(_)
            | MediaError::JsonParse(_) => ErrorKind::Internal,
        };
        Self::new(stage, kind, err.to_string())
    }
}

impl From<ClassifyError> for PipelineError {
    fn from(err: ClassifyError) -> Self {
        let kind = match &err {
            ClassifyError::ModelUnavailable(_) | ClassifyError::InvalidVocabulary(_) => {
                ErrorKind::ModelUnavailable
            }
            ClassifyError::InferenceTimeout(_) => ErrorKind::InferenceTimeout,
            ClassifyError::InvalidFrame { .. } => ErrorKind::InvalidFrame,
            ClassifyError::InferenceFailed(_) => ErrorKind::InferenceFailed,
        };
        Self::new(Stage::Classify, kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_media_error_mapping() {
        let err =
            PipelineError::from_media(Stage::Extract, MediaError::Timeout(Duration::from_secs(20)));
        assert_eq!(err.kind, ErrorKind::DecodeTimeout);
        assert_eq!(err.stage, Stage::Extract);

        let err =
            PipelineError::from_media(Stage::Extract, MediaError::unsupported_format("audio only"));
        assert_eq!(err.kind, ErrorKind::UnsupportedFormat);

        let err = PipelineError::from_media(Stage::Store, MediaError::storage_failure("quota"));
        assert_eq!(err.kind, ErrorKind::StorageFailure);

        let err = PipelineError::from_media(Stage::Extract, MediaError::FfmpegNotFound);
        assert_eq!(err.kind, ErrorKind::Internal);
    }

    #[test]
    fn test_io_error_depends_on_stage() {
        let io = || std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert_eq!(
            PipelineError::from_media(Stage::Store, MediaError::Io(io())).kind,
            ErrorKind::StorageFailure
        );
        assert_eq!(
            PipelineError::from_media(Stage::Extract, MediaError::Io(io())).kind,
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_classify_error_mapping() {
        let err: PipelineError = ClassifyError::InvalidFrame { width: 0, height: 10 }.into();
        assert_eq!(err.stage, Stage::Classify);
        assert_eq!(err.kind, ErrorKind::InvalidFrame);

        let err: PipelineError = ClassifyError::InferenceTimeout(Duration::from_secs(30)).into();
        assert_eq!(err.kind, ErrorKind::InferenceTimeout);
        assert!(err.kind.is_timeout());
    }

    #[test]
    fn test_display() {
        let err = PipelineError::pipeline_timeout(Duration::from_secs(60), None);
        assert_eq!(err.stage, Stage::Pipeline);
        assert!(err.to_string().starts_with("pipeline stage failed (PIPELINE_TIMEOUT)"));
    }

    #[test]
    fn test_pipeline_timeout_names_stalled_stage() {
        let err = PipelineError::pipeline_timeout(Duration::from_secs(60), Some(Stage::Extract));
        assert_eq!(err.stage, Stage::Extract);
        assert_eq!(err.kind, ErrorKind::PipelineTimeout);
        assert!(err.to_string().starts_with("extract stage failed (PIPELINE_TIMEOUT)"));
    }
}

//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use vidisnap_pipeline::{ErrorKind, PipelineError};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::UnsupportedFileType(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Pipeline(e) => pipeline_status(e.kind),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::UnsupportedFileType(_) => "UNSUPPORTED_FILE_TYPE",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::Pipeline(e) => e.kind.as_str(),
        }
    }

    fn is_internal(&self) -> bool {
        match self {
            ApiError::Pipeline(e) => self.status_code().is_server_error() && !e.kind.is_timeout(),
            _ => false,
        }
    }
}

/// Transport status for a pipeline failure.
pub fn pipeline_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::UnsupportedFormat | ErrorKind::CorruptInput | ErrorKind::InvalidFrame => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::DecodeTimeout | ErrorKind::InferenceTimeout | ErrorKind::PipelineTimeout => {
            StatusCode::GATEWAY_TIMEOUT
        }
        ErrorKind::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::StorageFailure
        | ErrorKind::InferenceFailed
        | ErrorKind::EmptyResult
        | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl ApiError {
    /// Render as `{detail, code}`. In production, details of internal
    /// failures are replaced with a generic message.
    pub fn render(self, production: bool) -> Response {
        let status = self.status_code();

        let detail = if production && self.is_internal() {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            detail,
            code: Some(self.code().to_string()),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidisnap_pipeline::Stage;

    #[test]
    fn test_pipeline_status_mapping() {
        assert_eq!(pipeline_status(ErrorKind::CorruptInput), StatusCode::BAD_REQUEST);
        assert_eq!(
            pipeline_status(ErrorKind::InferenceTimeout),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            pipeline_status(ErrorKind::PipelineTimeout),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            pipeline_status(ErrorKind::ModelUnavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            pipeline_status(ErrorKind::EmptyResult),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_code_uses_pipeline_kind() {
        let err: ApiError =
            PipelineError::new(Stage::Extract, ErrorKind::UnsupportedFormat, "audio only").into();
        assert_eq!(err.code(), "UNSUPPORTED_FORMAT");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_internal());
    }

    #[test]
    fn test_internal_pipeline_errors_are_hidden() {
        let err: ApiError =
            PipelineError::new(Stage::Store, ErrorKind::StorageFailure, "disk full").into();
        assert!(err.is_internal());

        let err: ApiError =
            PipelineError::new(Stage::Classify, ErrorKind::InferenceTimeout, "30s").into();
        assert!(!err.is_internal());
    }

    #[test]
    fn test_render_hides_internal_detail_in_production() {
        let err: ApiError =
            PipelineError::new(Stage::Store, ErrorKind::StorageFailure, "disk full").into();
        let response = err.render(true);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err: ApiError =
            PipelineError::new(Stage::Extract, ErrorKind::CorruptInput, "bad moov atom").into();
        assert_eq!(err.render(true).status(), StatusCode::BAD_REQUEST);
    }
}

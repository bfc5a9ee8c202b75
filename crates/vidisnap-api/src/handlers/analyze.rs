//! Upload analysis handler.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::{Extension, Json};
use tracing::{debug, info};
use vidisnap_models::{is_supported_video_filename, AnalysisResponse, RequestId, UploadedVideo};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Multipart field carrying the video.
const FILE_FIELD: &str = "file";

/// `POST /analyze`: classify the first frame of an uploaded video.
///
/// Expects a multipart body with a `file` field whose filename has a known
/// video extension.
pub async fn analyze(
    State(state): State<AppState>,
    request_id: Option<Extension<String>>,
    multipart: Multipart,
) -> Result<Json<AnalysisResponse>, Response> {
    let production = state.config.is_production();
    analyze_upload(&state, request_id, multipart)
        .await
        .map(Json)
        .map_err(|e| e.render(production))
}

async fn analyze_upload(
    state: &AppState,
    request_id: Option<Extension<String>>,
    mut multipart: Multipart,
) -> ApiResult<AnalysisResponse> {
    let limit = state.config.max_upload_bytes;

    let video = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(multipart_error)?
            .ok_or_else(|| ApiError::bad_request("missing multipart field 'file'"))?;

        if field.name() != Some(FILE_FIELD) {
            debug!(field = ?field.name(), "Skipping multipart field");
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::bad_request("uploaded file has no filename"))?;

        if !is_supported_video_filename(&filename) {
            return Err(ApiError::UnsupportedFileType(filename));
        }

        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.len() > limit {
            return Err(ApiError::PayloadTooLarge(format!(
                "{} bytes exceeds the {} byte limit",
                bytes.len(),
                limit
            )));
        }

        break UploadedVideo::new(bytes.to_vec(), filename);
    };

    let request_id = request_id
        .map(|Extension(id)| RequestId(id))
        .unwrap_or_default();

    info!(
        request_id = %request_id,
        filename = %video.filename(),
        bytes = video.content_length(),
        "Analyzing upload"
    );

    Ok(state.pipeline.analyze_with_id(video, request_id).await?)
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::bad_request(format!("invalid multipart body: {}", err.body_text()))
    }
}

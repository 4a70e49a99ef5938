//! Video upload handler.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use serde::Serialize;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::response::ApiResponse;
use crate::state::AppState;

/// Multipart field carrying the video file.
pub const UPLOAD_FIELD: &str = "video";

/// Name used when the client sends no filename.
const DEFAULT_FILENAME: &str = "video.mp4";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: String,
    pub filename: String,
    pub keyframes: usize,
}

/// `POST /api/upload_video`
///
/// Stores the `video` field and derives its audio track and keyframes
/// before answering, so the returned id is immediately analyzable.
pub async fn upload_video(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, ApiResponse<UploadResponse>)> {
    let limit = state.config.max_upload_bytes;
    let mut multipart =
        multipart.map_err(|rejection| ApiError::validation(rejection.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_FILENAME)
            .to_string();
        let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
        if bytes.is_empty() {
            return Err(ApiError::validation("uploaded video is empty"));
        }

        let outcome = state.ingestion.ingest(&bytes, &filename).await?;
        info!(
            video_id = %outcome.record.video_id,
            filename = %outcome.record.filename,
            keyframes = outcome.keyframes,
            "Video uploaded"
        );

        return Ok((
            StatusCode::CREATED,
            ApiResponse(UploadResponse {
                id: outcome.record.video_id.as_str().to_string(),
                filename: outcome.record.filename,
                keyframes: outcome.keyframes,
            }),
        ));
    }

    Err(ApiError::validation(format!(
        "missing '{}' file field",
        UPLOAD_FIELD
    )))
}

fn multipart_error(e: MultipartError, limit: usize) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(limit)
    } else {
        ApiError::validation(format!("malformed multipart body: {}", e.body_text()))
    }
}

//! Keyframe retrieval.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use tokio::fs;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Retrieval URL of a keyframe, as handed out in analysis results.
pub fn keyframe_url(video_id: &str, image: &str) -> String {
    format!("/api/uploads/{}/keyframes/{}", video_id, image)
}

/// `GET /api/uploads/:video_id/keyframes/:frame`
pub async fn get_keyframe(
    State(state): State<AppState>,
    Path((video_id, frame)): Path<(String, String)>,
) -> ApiResult<Response> {
    let path = state
        .store()
        .keyframe_path(&video_id, &frame)
        .await
        .ok_or_else(|| ApiError::not_found(format!("keyframe {} of video {}", frame, video_id)))?;

    let bytes = fs::read(&path)
        .await
        .map_err(|e| ApiError::internal(format!("failed to read keyframe: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/jpeg"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        bytes,
    )
        .into_response())
}

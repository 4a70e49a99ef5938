//! Health check handler.

use axum::extract::State;
use serde::Serialize;

use vinsight_media::check_ffmpeg;

use crate::response::ApiResponse;
use crate::state::AppState;

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy`, or `degraded` when ffmpeg is unavailable
    pub status: &'static str,
    pub version: &'static str,
    pub ffmpeg: bool,
    pub inference_backend: &'static str,
}

/// Liveness probe. Always 200; ingestion needs ffmpeg, so its absence is
/// reported as degraded.
pub async fn health(State(state): State<AppState>) -> ApiResponse<HealthResponse> {
    let ffmpeg = check_ffmpeg().is_ok();
    ApiResponse(HealthResponse {
        status: if ffmpeg { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        ffmpeg,
        inference_backend: state.backend_name,
    })
}

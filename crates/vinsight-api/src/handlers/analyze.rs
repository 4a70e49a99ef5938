//! Analysis handler.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use vinsight_models::{AnalysisResult, Language, ParseEnumError, Stage, SummaryStyle, VideoId};

use crate::error::{ApiError, ApiResult};
use crate::handlers::keyframes::keyframe_url;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Analysis request body. Omitted options fall back to English and concise.
#[derive(Debug, Deserialize, Validate)]
pub struct AnalyzeRequest {
    #[validate(custom(function = "validate_video_id"))]
    pub video_id: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub summary_type: Option<String>,
}

fn validate_video_id(id: &str) -> Result<(), ValidationError> {
    if VideoId::is_valid(id) {
        Ok(())
    } else {
        Err(ValidationError::new("video_id")
            .with_message("must be an id returned by upload".into()))
    }
}

impl AnalyzeRequest {
    fn options(&self) -> ApiResult<(Language, SummaryStyle)> {
        let language = match &self.language {
            Some(raw) => raw
                .parse()
                .map_err(|e: ParseEnumError| ApiError::validation(e.to_string()))?,
            None => Language::default(),
        };
        let style = match &self.summary_type {
            Some(raw) => raw
                .parse()
                .map_err(|e: ParseEnumError| ApiError::validation(e.to_string()))?,
            None => SummaryStyle::default(),
        };
        Ok((language, style))
    }
}

/// One described keyframe with its retrieval path.
#[derive(Debug, Serialize)]
pub struct FrameView {
    pub frame_index: u32,
    pub image: String,
    pub image_path: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub video_id: String,
    pub language: Language,
    pub summary_type: SummaryStyle,
    pub transcript: String,
    pub transcript_summary: String,
    pub holistic_summary: String,
    pub topics: Vec<String>,
    pub frame_descriptions: Vec<FrameView>,
    pub degraded_stages: Vec<Stage>,
}

impl From<AnalysisResult> for AnalysisResponse {
    fn from(result: AnalysisResult) -> Self {
        let video_id = result.video_id.as_str().to_string();
        let frame_descriptions = result
            .frame_descriptions
            .into_iter()
            .map(|frame| FrameView {
                frame_index: frame.frame_index,
                image_path: keyframe_url(&video_id, &frame.image),
                image: frame.image,
                description: frame.description,
            })
            .collect();

        Self {
            video_id,
            language: result.language,
            summary_type: result.style,
            transcript: result.transcript,
            transcript_summary: result.transcript_summary,
            holistic_summary: result.holistic_summary,
            topics: result.topics,
            frame_descriptions,
            degraded_stages: result.degraded_stages,
        }
    }
}

/// `POST /api/analyze_video`
pub async fn analyze_video(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<AnalysisResponse>> {
    let Json(request) = body.map_err(|rejection| ApiError::validation(rejection.body_text()))?;
    request
        .validate()
        .map_err(|e| ApiError::validation(e.to_string()))?;
    let (language, style) = request.options()?;

    let result = state
        .orchestrator
        .analyze(&request.video_id, language, style)
        .await?;

    Ok(ApiResponse(result.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vinsight_models::FrameDescription;

    #[test]
    fn test_request_validation() {
        let ok = AnalyzeRequest {
            video_id: VideoId::new().as_str().to_string(),
            language: Some("fr".into()),
            summary_type: Some("detailed".into()),
        };
        assert!(ok.validate().is_ok());
        assert_eq!(ok.options().unwrap(), (Language::Fr, SummaryStyle::Detailed));

        let bad_id = AnalyzeRequest {
            video_id: "../etc".into(),
            language: None,
            summary_type: None,
        };
        assert!(bad_id.validate().is_err());
        assert_eq!(
            bad_id.options().unwrap(),
            (Language::En, SummaryStyle::Concise)
        );

        let bad_language = AnalyzeRequest {
            video_id: VideoId::new().as_str().to_string(),
            language: Some("klingon".into()),
            summary_type: None,
        };
        assert!(matches!(
            bad_language.options(),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_response_adds_image_paths() {
        let id = VideoId::new();
        let result = AnalysisResult {
            video_id: id.clone(),
            language: Language::En,
            style: SummaryStyle::Concise,
            transcript: "t".into(),
            transcript_summary: "s".into(),
            holistic_summary: "h".into(),
            topics: vec!["a".into()],
            frame_descriptions: vec![FrameDescription {
                frame_index: 0,
                image: "frame_00.jpg".into(),
                description: "a desk".into(),
            }],
            degraded_stages: vec![],
        };

        let response = AnalysisResponse::from(result);
        assert_eq!(
            response.frame_descriptions[0].image_path,
            format!("/api/uploads/{}/keyframes/frame_00.jpg", id)
        );
    }
}

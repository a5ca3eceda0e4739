//! `POST /transcripts/extract` handler.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use vclip_core::CoreError;
use vclip_models::TranscriptResult;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::security::validate_video_url;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub video_url: String,
    #[serde(default)]
    pub languages: Vec<String>,
}

pub async fn extract(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(request): Json<ExtractRequest>,
) -> ApiResult<Json<TranscriptResult>> {
    validate_video_url(&request.video_url).into_result().map_err(ApiError::bad_request)?;

    let result = state
        .transcript_extractor
        .extract(&request.video_url, &request.languages)
        .await
        .map_err(CoreError::from)?;
    Ok(Json(result))
}

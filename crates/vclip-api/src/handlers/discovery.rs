//! `POST /discovery` handler.

use std::collections::HashMap;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use vclip_core::discovery::DiscoveryRequest;
use vclip_core::CoreError;
use vclip_models::{DurationType, VideoCandidate};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DiscoveryBody {
    pub query: String,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub min_quality: f32,
    #[serde(default)]
    pub duration_type: DurationType,
}

fn default_max_results() -> usize {
    20
}

#[derive(Serialize)]
pub struct DiscoveryResponse {
    pub candidates: Vec<VideoCandidate>,
    pub reformulated_queries: Vec<String>,
    pub total_searched: usize,
    pub languages_searched: Vec<String>,
    pub videos_per_language: HashMap<String, usize>,
    pub search_duration_ms: u64,
}

pub async fn discover(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(body): Json<DiscoveryBody>,
) -> ApiResult<Json<DiscoveryResponse>> {
    let result = state
        .discovery
        .discover(DiscoveryRequest {
            query: body.query,
            languages: body.languages,
            max_results: body.max_results,
            min_quality: body.min_quality,
            duration_type: body.duration_type,
        })
        .await
        .map_err(CoreError::from)?;

    Ok(Json(DiscoveryResponse {
        candidates: result.candidates,
        reformulated_queries: result.reformulated_queries,
        total_searched: result.total_searched,
        languages_searched: result.languages_searched,
        videos_per_language: result.videos_per_language,
        search_duration_ms: result.search_duration_ms,
    }))
}

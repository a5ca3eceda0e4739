//! `POST /chat/{summary_id}`, `GET /chat/{summary_id}/history`, and
//! `GET /chat/{summary_id}/quota` handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vclip_core::chat::ChatTurnRequest;
use vclip_core::CoreError;
use vclip_models::{ChatMessage, QuotaStatus};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatTurnBody {
    pub question: String,
    #[serde(default)]
    pub use_web_search: bool,
    /// Present in the wire contract for forward compatibility with
    /// alternate response styles; not yet read by the enrichment
    /// controller beyond the plan/question-class heuristics.
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Serialize)]
pub struct ChatTurnResponseBody {
    pub response: String,
    pub web_search_used: bool,
    pub sources: Vec<String>,
    pub enrichment_level: vclip_models::EnrichmentLevel,
    pub quota_info: QuotaStatus,
}

pub async fn ask(
    State(state): State<AppState>,
    user: AuthUser,
    Path(summary_id): Path<Uuid>,
    Json(body): Json<ChatTurnBody>,
) -> ApiResult<Json<ChatTurnResponseBody>> {
    let _ = body.mode;
    let result = state
        .chat
        .ask(ChatTurnRequest {
            user_id: user.uid,
            summary_id,
            question: body.question,
            plan: user.plan,
            web_search_requested: body.use_web_search,
        })
        .await
        .map_err(CoreError::from)?;

    Ok(Json(ChatTurnResponseBody {
        response: result.message.content,
        web_search_used: result.message.web_search_used,
        sources: result.message.sources,
        enrichment_level: result.message.enrichment_level,
        quota_info: result.quota,
    }))
}

pub async fn history(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(summary_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ChatMessage>>> {
    let messages = state.chat.history(summary_id, 100).await.map_err(CoreError::from)?;
    Ok(Json(messages))
}

pub async fn quota(
    State(state): State<AppState>,
    user: AuthUser,
    Path(summary_id): Path<Uuid>,
) -> ApiResult<Json<QuotaStatus>> {
    let status = state.chat.quota_status(&user.uid, summary_id, user.plan).await.map_err(CoreError::from)?;
    Ok(Json(status))
}

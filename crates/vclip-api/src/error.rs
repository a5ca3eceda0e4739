//! API error types: thin HTTP wrapper around `vclip_core::CoreError`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use vclip_core::CoreError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Core(e) => match e {
                CoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                CoreError::PermissionDenied => StatusCode::FORBIDDEN,
                CoreError::VideoNotFound => StatusCode::NOT_FOUND,
                CoreError::QuotaExceeded { .. } | CoreError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                CoreError::TranscriptNotAvailable(_) | CoreError::LlmUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                CoreError::FactCheckUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                CoreError::Discovery(_) => StatusCode::SERVICE_UNAVAILABLE,
                CoreError::Chat(chat_err) => match chat_err {
                    vclip_core::ChatError::DailyLimitReached { .. }
                    | vclip_core::ChatError::VideoLimitReached { .. } => StatusCode::TOO_MANY_REQUESTS,
                    vclip_core::ChatError::SummaryNotFound => StatusCode::NOT_FOUND,
                    vclip_core::ChatError::PermissionDenied => StatusCode::FORBIDDEN,
                    vclip_core::ChatError::LlmUnavailable(_) | vclip_core::ChatError::Persistence(_) => {
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                },
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::BadRequest(_) => "invalid_input",
            ApiError::Internal(_) => "internal_error",
            ApiError::Core(e) => e.code(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code().to_string();

        let message = if matches!(self, ApiError::Internal(_))
            && std::env::var("ENVIRONMENT").unwrap_or_default() == "production"
        {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let context = match &self {
            ApiError::Core(CoreError::QuotaExceeded { daily_limit, daily_used, required_plan }) => Some(json!({
                "daily_limit": daily_limit,
                "daily_used": daily_used,
                "required_plan": required_plan,
            })),
            ApiError::Core(CoreError::Chat(vclip_core::ChatError::DailyLimitReached { used, limit })) => {
                Some(json!({ "daily_limit": limit, "daily_used": used }))
            }
            ApiError::Core(CoreError::Chat(vclip_core::ChatError::VideoLimitReached { used, limit })) => {
                Some(json!({ "video_limit": limit, "video_used": used }))
            }
            _ => None,
        };

        let body = ErrorResponse { code, message, context };
        (status, Json(body)).into_response()
    }
}

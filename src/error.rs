use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Too many attempts")]
    RateLimited {
        remaining_seconds: u64,
        message: String,
    },

    #[error("Upstream auth endpoint returned {status}")]
    UpstreamAuth { status: u16, body: String },

    #[error("Upstream API returned {status}")]
    UpstreamApi { status: u16, body: String },

    #[error("SMS delivery failed with status {0}")]
    SmsDelivery(u16),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::NotFound(msg) => error_response(StatusCode::NOT_FOUND, "not_found", msg),
            AppError::BadRequest(msg) => {
                error_response(StatusCode::BAD_REQUEST, "bad_request", msg)
            }
            AppError::RateLimited {
                remaining_seconds,
                message,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "blocked": true,
                    "remainingSeconds": remaining_seconds,
                    "message": message,
                })),
            )
                .into_response(),
            AppError::UpstreamAuth { status, body } => {
                tracing::warn!("Upstream auth rejected request: {} {}", status, body);
                (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({
                        "error": {
                            "code": "upstream_auth_error",
                            "upstreamStatus": status,
                            "upstreamBody": body,
                        }
                    })),
                )
                    .into_response()
            }
            AppError::UpstreamApi { status, body } => {
                tracing::warn!("Upstream API rejected request: {} {}", status, body);
                (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({
                        "error": {
                            "code": "upstream_api_error",
                            "upstreamStatus": status,
                            "upstreamBody": body,
                        }
                    })),
                )
                    .into_response()
            }
            AppError::SmsDelivery(status) => {
                tracing::error!("SMS delivery failed: {}", status);
                error_response(
                    StatusCode::BAD_GATEWAY,
                    "sms_delivery_error",
                    "Failed to send SMS",
                )
            }
            AppError::Transport(e) => {
                tracing::error!("Transport error: {:?}", e);
                error_response(
                    StatusCode::BAD_GATEWAY,
                    "transport_error",
                    "Failed to reach upstream service",
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "Database error",
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        }
    }
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    let body = Json(json!({
        "error": {
            "code": code,
            "message": message
        }
    }));

    (status, body).into_response()
}

pub type Result<T> = std::result::Result<T, AppError>;

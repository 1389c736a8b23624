//! Twitter connection endpoints.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    twitter::TwitterAuth,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct RequestTokenRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestTokenResponse {
    pub authorize_url: String,
    pub request_token: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPinRequest {
    pub pin: String,
    pub oauth_token: String,
    pub complaint_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPinResponse {
    pub connected: bool,
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
pub struct TweetRequest {
    pub user_id: String,
    pub message: String,
    pub access_token: String,
    pub complaint_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetResponse {
    pub success: bool,
    pub tweet_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ValidityQuery {
    pub access_token: String,
    pub access_token_secret: String,
}

#[derive(Debug, Serialize)]
pub struct ValidityResponse {
    pub valid: bool,
}

fn twitter(state: &AppState) -> Result<&TwitterAuth> {
    state
        .twitter
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Twitter integration is not configured".to_string()))
}

/// First leg: obtain a request token and the URL the user must visit to
/// authorize and receive a PIN.
pub async fn request_token(
    State(state): State<AppState>,
    Json(req): Json<RequestTokenRequest>,
) -> Result<Json<RequestTokenResponse>> {
    let owner_id = req.user_id.trim();
    if owner_id.is_empty() {
        return Err(AppError::BadRequest("user_id is required".to_string()));
    }

    let start = twitter(&state)?.begin_connect(owner_id).await?;

    Ok(Json(RequestTokenResponse {
        authorize_url: start.authorize_url,
        request_token: start.request_token,
    }))
}

/// Third leg: exchange the out-of-band PIN for access credentials.
pub async fn verify_pin(
    State(state): State<AppState>,
    Json(req): Json<VerifyPinRequest>,
) -> Result<Json<VerifyPinResponse>> {
    let connected = twitter(&state)?
        .verify_pin(&req.oauth_token, &req.pin, req.complaint_id.as_deref())
        .await?;

    Ok(Json(VerifyPinResponse {
        connected: true,
        access_token: connected.access_token,
    }))
}

/// Post a tweet with a previously granted access token.
pub async fn tweet(
    State(state): State<AppState>,
    Json(req): Json<TweetRequest>,
) -> Result<Json<TweetResponse>> {
    let owner_id = req.user_id.trim();
    if owner_id.is_empty() {
        return Err(AppError::BadRequest("user_id is required".to_string()));
    }

    let tweet_id = twitter(&state)?
        .post_tweet(
            owner_id,
            &req.access_token,
            &req.message,
            req.complaint_id.as_deref(),
        )
        .await?;

    Ok(Json(TweetResponse {
        success: true,
        tweet_id,
    }))
}

/// Advisory credential check; never errors.
pub async fn validity(
    State(state): State<AppState>,
    Query(query): Query<ValidityQuery>,
) -> Result<Json<ValidityResponse>> {
    let valid = twitter(&state)?
        .check_token_validity(&query.access_token, &query.access_token_secret)
        .await;

    Ok(Json(ValidityResponse { valid }))
}

//! Phone OTP endpoints.
//!
//! Phone-format validation happens here, before any store access. The
//! generated code is never echoed in a response; the SMS channel is the
//! only carrier.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    error::{AppError, Result},
    otp::{ResendOutcome, VerifyOutcome},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct PhoneRequest {
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub phone: String,
    pub otp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpSentResponse {
    pub sent: bool,
    pub remaining_attempts: u32,
    pub is_last_attempt: bool,
    pub next_reset_time: DateTime<Utc>,
}

/// Initial code delivery for a phone number.
pub async fn send_otp(
    State(state): State<AppState>,
    Json(req): Json<PhoneRequest>,
) -> Result<Json<OtpSentResponse>> {
    let phone = validate_phone(&req.phone)?;
    let issued = state.otp.send(&phone).await?;

    Ok(Json(OtpSentResponse {
        sent: true,
        remaining_attempts: issued.remaining_attempts,
        is_last_attempt: issued.is_last_attempt,
        next_reset_time: issued.next_reset_time,
    }))
}

/// Resend, throttled per phone. A blocked request surfaces as 429 with
/// the wait time.
pub async fn resend_otp(
    State(state): State<AppState>,
    Json(req): Json<PhoneRequest>,
) -> Result<Json<OtpSentResponse>> {
    let phone = validate_phone(&req.phone)?;

    match state.otp.resend(&phone).await? {
        ResendOutcome::Sent(issued) => Ok(Json(OtpSentResponse {
            sent: true,
            remaining_attempts: issued.remaining_attempts,
            is_last_attempt: issued.is_last_attempt,
            next_reset_time: issued.next_reset_time,
        })),
        ResendOutcome::Blocked {
            remaining_seconds,
            message,
        } => Err(AppError::RateLimited {
            remaining_seconds,
            message,
        }),
    }
}

/// Verify a submitted code. A mismatch says only "invalid"; expired and
/// wrong codes are indistinguishable by design.
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<Response> {
    let phone = validate_phone(&req.phone)?;
    let code = req.otp.trim();
    if code.is_empty() {
        return Err(AppError::BadRequest("OTP is required".to_string()));
    }

    match state.otp.verify(&phone, code).await? {
        VerifyOutcome::Verified { phone_known } => Ok(Json(json!({
            "verified": true,
            "phoneKnown": phone_known,
        }))
        .into_response()),
        VerifyOutcome::InvalidOtp => Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "verified": false,
                "message": "Invalid OTP",
            })),
        )
            .into_response()),
    }
}

/// Accepts an optional `+` country code (1-3 digits, optionally followed
/// by a space or dash) and a 10-digit subscriber number.
pub fn validate_phone(raw: &str) -> Result<String> {
    let phone = raw.trim();
    if is_valid_phone(phone) {
        Ok(phone.to_string())
    } else {
        Err(AppError::BadRequest(
            "Invalid phone number format".to_string(),
        ))
    }
}

fn is_valid_phone(phone: &str) -> bool {
    let Some(rest) = phone.strip_prefix('+') else {
        return phone.len() == 10 && phone.chars().all(|c| c.is_ascii_digit());
    };

    if let Some(idx) = rest.find(['-', ' ']) {
        let cc = &rest[..idx];
        let number = &rest[idx + 1..];
        (1..=3).contains(&cc.len())
            && cc.chars().all(|c| c.is_ascii_digit())
            && number.len() == 10
            && number.chars().all(|c| c.is_ascii_digit())
    } else {
        (11..=13).contains(&rest.len()) && rest.chars().all(|c| c.is_ascii_digit())
    }
}

pub mod auth;
pub mod twitter;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

/// Build the API router
pub fn router() -> Router<AppState> {
    Router::new()
        // Phone OTP routes
        .route("/auth/otp/send", post(auth::send_otp))
        .route("/auth/otp/resend", post(auth::resend_otp))
        .route("/auth/otp/verify", post(auth::verify_otp))
        // Twitter connection routes (three-legged OAuth 1.0a)
        .route("/twitter/request-token", post(twitter::request_token))
        .route("/twitter/verify-pin", post(twitter::verify_pin))
        .route("/twitter/tweet", post(twitter::tweet))
        .route("/twitter/validity", get(twitter::validity))
}

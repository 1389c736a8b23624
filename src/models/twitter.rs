use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Progress of a three-legged exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "twitter_session_state", rename_all = "snake_case")]
pub enum SessionState {
    /// Request token obtained; waiting for the user to authorize and
    /// submit the verifier PIN
    RequestTokenIssued,
    /// Access token minted; the request token is spent and never reused
    AccessTokenGranted,
}

/// One Twitter connect attempt, persisted across the independent HTTP
/// requests of the three-legged flow.
///
/// The request token and access token are kept in separate columns so a
/// pre-authorization token can never be used to sign resource calls.
#[derive(Debug, Clone, FromRow)]
pub struct TwitterSession {
    pub id: Uuid,
    pub owner_id: String,
    pub request_token: String,
    pub request_token_secret: String,
    /// Empty until the verifier exchange completes
    pub access_token: String,
    pub access_token_secret: String,
    pub state: SessionState,
    /// Optional foreign reference (e.g. a complaint), attached at time of
    /// use rather than at time of connection
    pub linked_resource_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTwitterSession {
    pub owner_id: String,
    pub request_token: String,
    pub request_token_secret: String,
}

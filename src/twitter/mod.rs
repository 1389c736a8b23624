//! Three-legged OAuth 1.0a connection to Twitter.
//!
//! Flow, persisted across independent HTTP requests:
//! 1. `begin_connect` obtains a request token and stores a pending
//!    session keyed by it; the caller opens the authorize URL.
//! 2. The user authorizes out-of-band and receives a verifier PIN.
//! 3. `verify_pin` exchanges request token + PIN for an access token and
//!    marks the session granted. The request token is spent by this
//!    transition and never reused.
//! 4. Posts sign with the stored access credentials.

pub mod client;
pub mod signer;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{NewTwitterSession, TwitterSession};
use client::TwitterClient;

/// Persistence interface for exchange sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: NewTwitterSession) -> Result<TwitterSession>;

    async fn find_by_request_token(&self, request_token: &str) -> Result<Option<TwitterSession>>;

    /// Transition the pending session for `request_token` to granted,
    /// recording the access credentials. Returns false when no pending
    /// session matched, including when a raced second submission already
    /// consumed the token.
    async fn grant_access_token(
        &self,
        request_token: &str,
        access_token: &str,
        access_token_secret: &str,
        linked_resource_id: Option<&str>,
    ) -> Result<bool>;

    /// Look up a granted session by access token and owner, attaching
    /// the linked resource at time of use.
    async fn attach_resource(
        &self,
        access_token: &str,
        owner_id: &str,
        linked_resource_id: Option<&str>,
    ) -> Result<Option<TwitterSession>>;
}

/// Outcome of starting a connection.
#[derive(Debug, Clone)]
pub struct ConnectStart {
    pub authorize_url: String,
    pub request_token: String,
}

/// Outcome of a completed exchange.
#[derive(Debug, Clone)]
pub struct Connected {
    pub access_token: String,
}

/// Orchestrates the exchange and authenticated calls on top of the
/// signed client and the session store.
pub struct TwitterAuth {
    client: TwitterClient,
    sessions: Arc<dyn SessionStore>,
}

impl TwitterAuth {
    pub fn new(client: TwitterClient, sessions: Arc<dyn SessionStore>) -> Self {
        Self { client, sessions }
    }

    /// First leg. Nothing is persisted if the upstream call fails.
    pub async fn begin_connect(&self, owner_id: &str) -> Result<ConnectStart> {
        let pair = self.client.request_token().await?;

        self.sessions
            .create(NewTwitterSession {
                owner_id: owner_id.to_string(),
                request_token: pair.oauth_token.clone(),
                request_token_secret: pair.oauth_token_secret,
            })
            .await?;

        let authorize_url = format!(
            "{}/oauth/authorize?oauth_token={}",
            self.client.base_url(),
            pair.oauth_token
        );

        Ok(ConnectStart {
            authorize_url,
            request_token: pair.oauth_token,
        })
    }

    /// Third leg: exchange the verifier PIN for access credentials and
    /// transition the session in place.
    pub async fn verify_pin(
        &self,
        request_token: &str,
        pin: &str,
        linked_resource_id: Option<&str>,
    ) -> Result<Connected> {
        let pin = pin.trim();
        if pin.is_empty() {
            return Err(AppError::BadRequest("Verifier PIN is required".to_string()));
        }

        let session = self
            .sessions
            .find_by_request_token(request_token)
            .await?
            .ok_or_else(|| AppError::NotFound("Token not found".to_string()))?;

        let pair = self
            .client
            .access_token(&session.request_token, &session.request_token_secret, pin)
            .await?;

        let granted = self
            .sessions
            .grant_access_token(
                request_token,
                &pair.oauth_token,
                &pair.oauth_token_secret,
                linked_resource_id,
            )
            .await?;

        if !granted {
            // Lost a race: another submission consumed this token first.
            return Err(AppError::NotFound("Token already used".to_string()));
        }

        Ok(Connected {
            access_token: pair.oauth_token,
        })
    }

    /// Post a tweet for a connected owner. The session is read for its
    /// credentials and the linked resource is attached, but the exchange
    /// state is not touched.
    pub async fn post_tweet(
        &self,
        owner_id: &str,
        access_token: &str,
        text: &str,
        linked_resource_id: Option<&str>,
    ) -> Result<String> {
        if text.trim().is_empty() {
            return Err(AppError::BadRequest("Message is required".to_string()));
        }

        let session = self
            .sessions
            .attach_resource(access_token, owner_id, linked_resource_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Access token not found".to_string()))?;

        self.client
            .post_tweet(text, &session.access_token, &session.access_token_secret)
            .await
    }

    /// Advisory: fails soft to `false`.
    pub async fn check_token_validity(
        &self,
        access_token: &str,
        access_token_secret: &str,
    ) -> bool {
        self.client
            .check_token_validity(access_token, access_token_secret)
            .await
    }
}

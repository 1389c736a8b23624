//! Signed HTTP calls against the Twitter API.
//!
//! The HTTP transport sits behind a trait so the token-exchange logic is
//! testable without the network; production uses reqwest with a bounded
//! request timeout (upstream calls must not hang indefinitely).

use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::twitter::signer::{OauthSigner, Token};

/// A request that has already been signed; the transport only delivers it.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub authorization: String,
    pub json_body: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP delivery collaborator.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: UpstreamRequest) -> Result<UpstreamResponse>;
}

/// reqwest-backed transport.
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("SpeakUpServer")
            .build()
            .unwrap_or_default();
        Self { http }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: UpstreamRequest) -> Result<UpstreamResponse> {
        let mut builder = self
            .http
            .request(request.method, &request.url)
            .header(reqwest::header::AUTHORIZATION, request.authorization)
            .header(reqwest::header::ACCEPT, "application/json");

        if let Some(body) = request.json_body {
            builder = builder.json(&body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(UpstreamResponse { status, body })
    }
}

/// Token pair returned by both the request-token and access-token
/// endpoints (form-encoded).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub oauth_token: String,
    pub oauth_token_secret: String,
}

/// Tweet created via `POST /2/tweets`.
#[derive(Debug, Deserialize)]
struct TweetResponse {
    data: TweetData,
}

#[derive(Debug, Deserialize)]
struct TweetData {
    id: String,
}

/// Signed client for the three token-exchange legs and authenticated
/// resource calls.
pub struct TwitterClient {
    signer: OauthSigner,
    transport: std::sync::Arc<dyn Transport>,
    base_url: String,
}

impl TwitterClient {
    pub fn new(
        signer: OauthSigner,
        transport: std::sync::Arc<dyn Transport>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            signer,
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// First leg: obtain a request token. Signed without a token; the
    /// callback mode is out-of-band (the user relays a PIN).
    pub async fn request_token(&self) -> Result<TokenPair> {
        let url = format!("{}/oauth/request_token", self.base_url);
        let query = [
            ("oauth_callback".to_string(), "oob".to_string()),
            ("x_auth_access_type".to_string(), "write".to_string()),
        ];

        let authorization = self
            .signer
            .authorization_header(Method::POST.as_str(), &url, None, &query)?;

        let response = self
            .transport
            .execute(UpstreamRequest {
                method: Method::POST,
                url: with_query(&url, &query)?,
                authorization,
                json_body: None,
            })
            .await?;

        if !response.is_success() {
            return Err(AppError::UpstreamAuth {
                status: response.status,
                body: response.body,
            });
        }

        parse_token_pair(&response.body)
    }

    /// Third leg: trade the request token plus the user's verifier PIN
    /// for an access token. Signed with the request token.
    pub async fn access_token(
        &self,
        request_token: &str,
        request_token_secret: &str,
        verifier: &str,
    ) -> Result<TokenPair> {
        let url = format!("{}/oauth/access_token", self.base_url);
        let extra = [("oauth_verifier".to_string(), verifier.to_string())];

        let authorization = self.signer.authorization_header(
            Method::POST.as_str(),
            &url,
            Some(Token {
                key: request_token,
                secret: request_token_secret,
            }),
            &extra,
        )?;

        // oauth_token rides in the query as well as the OAuth header;
        // it is one parameter in the signature set either way.
        let query = [
            ("oauth_verifier".to_string(), verifier.to_string()),
            ("oauth_token".to_string(), request_token.to_string()),
        ];

        let response = self
            .transport
            .execute(UpstreamRequest {
                method: Method::POST,
                url: with_query(&url, &query)?,
                authorization,
                json_body: None,
            })
            .await?;

        if !response.is_success() {
            return Err(AppError::UpstreamAuth {
                status: response.status,
                body: response.body,
            });
        }

        parse_token_pair(&response.body)
    }

    /// Post a tweet with caller-supplied access credentials. Never
    /// retried: a retry could double-post.
    pub async fn post_tweet(
        &self,
        text: &str,
        access_token: &str,
        access_token_secret: &str,
    ) -> Result<String> {
        let url = format!("{}/2/tweets", self.base_url);

        let authorization = self.signer.authorization_header(
            Method::POST.as_str(),
            &url,
            Some(Token {
                key: access_token,
                secret: access_token_secret,
            }),
            &[],
        )?;

        let response = self
            .transport
            .execute(UpstreamRequest {
                method: Method::POST,
                url,
                authorization,
                json_body: Some(serde_json::json!({ "text": text })),
            })
            .await?;

        if !response.is_success() {
            return Err(AppError::UpstreamApi {
                status: response.status,
                body: response.body,
            });
        }

        let tweet: TweetResponse = serde_json::from_str(&response.body)
            .context("malformed tweet response from Twitter")?;
        Ok(tweet.data.id)
    }

    /// Advisory credential check. Any failure, including transport
    /// errors, collapses to `false`.
    pub async fn check_token_validity(
        &self,
        access_token: &str,
        access_token_secret: &str,
    ) -> bool {
        let url = format!("{}/1.1/account/verify_credentials.json", self.base_url);

        let authorization = match self.signer.authorization_header(
            Method::GET.as_str(),
            &url,
            Some(Token {
                key: access_token,
                secret: access_token_secret,
            }),
            &[],
        ) {
            Ok(h) => h,
            Err(_) => return false,
        };

        let result = self
            .transport
            .execute(UpstreamRequest {
                method: Method::GET,
                url,
                authorization,
                json_body: None,
            })
            .await;

        match result {
            Ok(response) => response.is_success(),
            Err(e) => {
                tracing::debug!("Credential check failed: {}", e);
                false
            }
        }
    }
}

fn with_query(url: &str, params: &[(String, String)]) -> Result<String> {
    let query = serde_urlencoded::to_string(params)
        .map_err(|e| AppError::Internal(anyhow!("failed to encode query: {e}")))?;
    Ok(format!("{url}?{query}"))
}

fn parse_token_pair(body: &str) -> Result<TokenPair> {
    serde_urlencoded::from_str(body)
        .context("malformed token response from Twitter")
        .map_err(AppError::Internal)
}

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub otp: OtpConfig,
    pub twilio: TwilioConfig,
    pub twitter: TwitterConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connection acquire timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// OTP issuance and resend-throttling policy.
///
/// The window and attempt cap are deliberately configuration, not constants:
/// the defaults (60s / 3 attempts) are short demo values.
#[derive(Debug, Clone, Deserialize)]
pub struct OtpConfig {
    /// Burst window in seconds, anchored at the first attempt in a burst
    #[serde(default = "default_otp_window")]
    pub window_secs: u64,
    /// Max issuances allowed inside one window
    #[serde(default = "default_otp_max_attempts")]
    pub max_attempts: u32,
    /// Number of digits in a generated code
    #[serde(default = "default_otp_code_length")]
    pub code_length: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    /// When false, codes are logged instead of sent (local development)
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TwitterConfig {
    pub consumer_key: String,
    pub consumer_secret: String,
    #[serde(default = "default_twitter_api_base")]
    pub api_base: String,
}

impl TwitterConfig {
    pub fn is_configured(&self) -> bool {
        !self.consumer_key.is_empty() && !self.consumer_secret.is_empty()
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_max_connections() -> u32 { 20 }
fn default_connect_timeout() -> u64 { 30 }
fn default_otp_window() -> u64 { 60 }
fn default_otp_max_attempts() -> u32 { 3 }
fn default_otp_code_length() -> u32 { 4 }
fn default_twitter_api_base() -> String { "https://api.twitter.com".to_string() }

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            server: ServerConfig {
                host: std::env::var("HOST").unwrap_or_else(|_| default_host()),
                port: std::env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_port),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .context("DATABASE_URL must be set")?,
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_max_connections),
                connect_timeout_secs: std::env::var("DATABASE_CONNECT_TIMEOUT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_connect_timeout),
            },
            otp: OtpConfig {
                window_secs: std::env::var("OTP_WINDOW_SECS")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_otp_window),
                max_attempts: std::env::var("OTP_MAX_ATTEMPTS")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_otp_max_attempts),
                code_length: std::env::var("OTP_CODE_LENGTH")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_otp_code_length),
            },
            twilio: TwilioConfig {
                account_sid: std::env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
                auth_token: std::env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
                from_number: std::env::var("TWILIO_PHONE_NUMBER").unwrap_or_default(),
                enabled: std::env::var("TWILIO_ENABLED")
                    .map(|v| v == "true" || v == "1")
                    .unwrap_or(false),
            },
            twitter: TwitterConfig {
                consumer_key: std::env::var("TWITTER_CONSUMER_KEY").unwrap_or_default(),
                consumer_secret: std::env::var("TWITTER_CONSUMER_SECRET").unwrap_or_default(),
                api_base: std::env::var("TWITTER_API_BASE")
                    .unwrap_or_else(|_| default_twitter_api_base()),
            },
        })
    }
}

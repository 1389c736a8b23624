//! Outbound SMS transport.
//!
//! Production delivery goes through the Twilio REST API. When Twilio is not
//! configured (local development), messages are logged instead of sent so
//! the OTP flow stays exercisable without an account.

use async_trait::async_trait;
use reqwest::Client;

use crate::config::TwilioConfig;
use crate::error::{AppError, Result};

/// Narrow interface the OTP throttler uses to deliver codes.
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<()>;
}

/// Twilio-backed sender.
pub struct TwilioSender {
    http: Client,
    config: TwilioConfig,
}

impl TwilioSender {
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl SmsSender for TwilioSender {
    async fn send(&self, to: &str, body: &str) -> Result<()> {
        if !self.config.enabled {
            tracing::info!("SMS delivery disabled; message for {}: {}", to, body);
            return Ok(());
        }

        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.config.account_sid
        );

        let params = [
            ("To", to),
            ("From", self.config.from_number.as_str()),
            ("Body", body),
        ];

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error = response.text().await.unwrap_or_default();
            tracing::error!("Twilio rejected message: {} {}", status, error);
            return Err(AppError::SmsDelivery(status));
        }

        Ok(())
    }
}

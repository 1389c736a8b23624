//! OTP issuance and resend throttling.
//!
//! Every issuance is recorded; the resend path evaluates a burst window
//! against the record history. The window is anchored at the *oldest*
//! qualifying record, so a burst of N attempts blocks for exactly one
//! window measured from the first attempt, not a window that refreshes
//! on every retry.
//!
//! The count check and the insert are separate store calls, so two
//! concurrent resends for the same phone can each observe a count under
//! the cap and both issue. The cap is a soft bound under concurrency;
//! it is exact for sequential calls.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::clock::Clock;
use crate::config::OtpConfig;
use crate::error::Result;
use crate::models::{NewOtpRecord, OtpRecord};
use crate::sms::SmsSender;

/// Persistence interface for OTP records.
///
/// All mutations are expressed as create or find-matching-and-update so
/// correctness is bounded by the store's per-row atomicity.
#[async_trait]
pub trait OtpStore: Send + Sync {
    async fn create(&self, record: NewOtpRecord) -> Result<OtpRecord>;

    /// Records for `phone` with `last_resend_at >= since`, newest first.
    /// Includes consumed/superseded records: every send attempt counts
    /// toward the window.
    async fn recent_for_phone(&self, phone: &str, since: DateTime<Utc>) -> Result<Vec<OtpRecord>>;

    /// Deactivate all active records for `phone` (window-reset sweep).
    /// Returns the number of records swept.
    async fn supersede_all(&self, phone: &str) -> Result<u64>;

    /// Atomically consume the active record matching `(phone, code)`.
    /// Returns false when no such record exists, including when a raced
    /// second verification already consumed it.
    async fn consume(&self, phone: &str, code: &str) -> Result<bool>;
}

/// Existence probe for registered identities, consulted on verification.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn phone_known(&self, phone: &str) -> Result<bool>;
}

/// Successful issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpIssued {
    pub remaining_attempts: u32,
    pub is_last_attempt: bool,
    pub next_reset_time: DateTime<Utc>,
}

/// Result of a resend request. Being throttled is an expected outcome,
/// not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResendOutcome {
    Sent(OtpIssued),
    Blocked {
        remaining_seconds: u64,
        message: String,
    },
}

/// Result of a verification attempt. No distinction is made between a
/// wrong code and an expired one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified { phone_known: bool },
    InvalidOtp,
}

/// Issues OTPs and bounds resend frequency per phone number.
pub struct OtpThrottler {
    store: Arc<dyn OtpStore>,
    sms: Arc<dyn SmsSender>,
    identity: Arc<dyn IdentityLookup>,
    clock: Arc<dyn Clock>,
    config: OtpConfig,
}

impl OtpThrottler {
    pub fn new(
        store: Arc<dyn OtpStore>,
        sms: Arc<dyn SmsSender>,
        identity: Arc<dyn IdentityLookup>,
        clock: Arc<dyn Clock>,
        config: OtpConfig,
    ) -> Self {
        Self {
            store,
            sms,
            identity,
            clock,
            config,
        }
    }

    fn window(&self) -> Duration {
        Duration::seconds(self.config.window_secs as i64)
    }

    /// Initial send. Same issuance path as `resend` but without the
    /// historical-count gate; recent history still feeds the
    /// remaining-attempts accounting.
    pub async fn send(&self, phone: &str) -> Result<OtpIssued> {
        let now = self.clock.now();
        let recent = self.store.recent_for_phone(phone, now - self.window()).await?;
        self.issue(phone, now, recent.len() as u32).await
    }

    /// Resend, gated by the burst window.
    pub async fn resend(&self, phone: &str) -> Result<ResendOutcome> {
        let now = self.clock.now();
        let window = self.window();
        let recent = self.store.recent_for_phone(phone, now - window).await?;

        let mut prior_count = recent.len() as u32;

        if prior_count >= self.config.max_attempts {
            // The oldest record inside the window anchors the block.
            // recent is ordered newest first and non-empty here.
            let oldest = &recent[recent.len() - 1];
            let elapsed = now - oldest.last_resend_at;

            if elapsed < window {
                let remaining_ms = (window - elapsed).num_milliseconds().max(0) as u64;
                let remaining_seconds = remaining_ms.div_ceil(1000);
                let minutes = remaining_seconds.div_ceil(60);
                return Ok(ResendOutcome::Blocked {
                    remaining_seconds,
                    message: format!(
                        "Too many attempts. Please try again after {} minutes",
                        minutes
                    ),
                });
            }

            // The full window elapsed even though the count matched:
            // clear the slate for this phone and start a fresh burst.
            let swept = self.store.supersede_all(phone).await?;
            tracing::debug!("OTP window reset for {}: {} records superseded", phone, swept);
            prior_count = 0;
        }

        let issued = self.issue(phone, now, prior_count).await?;
        Ok(ResendOutcome::Sent(issued))
    }

    /// Verify a submitted code. A matching active record is consumed
    /// (single-use); a second attempt with the same code reports
    /// `InvalidOtp` with no further detail.
    pub async fn verify(&self, phone: &str, code: &str) -> Result<VerifyOutcome> {
        if !self.store.consume(phone, code).await? {
            return Ok(VerifyOutcome::InvalidOtp);
        }

        let phone_known = self.identity.phone_known(phone).await?;
        Ok(VerifyOutcome::Verified { phone_known })
    }

    async fn issue(&self, phone: &str, now: DateTime<Utc>, prior_count: u32) -> Result<OtpIssued> {
        let code = generate_code(self.config.code_length);

        self.sms
            .send(phone, &format!("Your Speak Up verification code is: {}", code))
            .await?;

        self.store
            .create(NewOtpRecord {
                phone: phone.to_string(),
                code,
                issued_at: now,
                last_resend_at: now,
            })
            .await?;

        let remaining_attempts = self.config.max_attempts.saturating_sub(prior_count + 1);

        Ok(OtpIssued {
            remaining_attempts,
            is_last_attempt: remaining_attempts == 0,
            next_reset_time: now + self.window(),
        })
    }
}

/// Fixed-width numeric code, uniform over the full width (no leading
/// zero, so the width is stable for display and entry).
fn generate_code(length: u32) -> String {
    let low = 10u64.pow(length - 1);
    let high = 10u64.pow(length);
    let mut rng = rand::thread_rng();
    rng.gen_range(low..high).to_string()
}

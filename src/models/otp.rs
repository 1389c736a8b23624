use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of an OTP record. Records are never deleted, so the table
/// doubles as an audit trail of every send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "otp_state", rename_all = "snake_case")]
pub enum OtpState {
    /// Usable for verification (at most one per phone is consulted)
    Active,
    /// Spent by a successful verification (single-use)
    Consumed,
    /// Deactivated by a window-reset sweep or a later issuance
    Superseded,
}

/// A single issued passcode.
#[derive(Debug, Clone, FromRow)]
pub struct OtpRecord {
    pub id: Uuid,
    pub phone: String,
    pub code: String,
    pub state: OtpState,
    pub issued_at: DateTime<Utc>,
    /// Drives the resend window; equals `issued_at` for the initial send
    pub last_resend_at: DateTime<Utc>,
}

/// Fields for a new record. Timestamps come from the caller's clock so
/// issuance stays deterministic under test.
#[derive(Debug, Clone)]
pub struct NewOtpRecord {
    pub phone: String,
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub last_resend_at: DateTime<Utc>,
}

//! OTP record persistence.
//!
//! Mutations are single-statement conditional updates, so single-use
//! consumption holds under concurrent verification attempts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{NewOtpRecord, OtpRecord, OtpState};
use crate::otp::OtpStore;

#[async_trait]
impl OtpStore for super::Database {
    async fn create(&self, record: NewOtpRecord) -> Result<OtpRecord> {
        let record = sqlx::query_as::<_, OtpRecord>(
            r#"
            INSERT INTO otp_codes (phone, code, state, issued_at, last_resend_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&record.phone)
        .bind(&record.code)
        .bind(OtpState::Active)
        .bind(record.issued_at)
        .bind(record.last_resend_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn recent_for_phone(&self, phone: &str, since: DateTime<Utc>) -> Result<Vec<OtpRecord>> {
        let records = sqlx::query_as::<_, OtpRecord>(
            r#"
            SELECT * FROM otp_codes
            WHERE phone = $1
              AND last_resend_at >= $2
            ORDER BY last_resend_at DESC
            "#,
        )
        .bind(phone)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn supersede_all(&self, phone: &str) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE otp_codes
            SET state = $2
            WHERE phone = $1
              AND state = $3
            "#,
        )
        .bind(phone)
        .bind(OtpState::Superseded)
        .bind(OtpState::Active)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn consume(&self, phone: &str, code: &str) -> Result<bool> {
        // Conditional update: a raced second verification matches zero rows
        let result = sqlx::query(
            r#"
            UPDATE otp_codes
            SET state = $3
            WHERE id IN (
                SELECT id FROM otp_codes
                WHERE phone = $1
                  AND code = $2
                  AND state = $4
                ORDER BY last_resend_at DESC
                LIMIT 1
            )
            "#,
        )
        .bind(phone)
        .bind(code)
        .bind(OtpState::Consumed)
        .bind(OtpState::Active)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

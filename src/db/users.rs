//! Identity existence probe. Account management itself lives elsewhere;
//! OTP verification only needs to know whether a phone is registered.

use async_trait::async_trait;

use crate::error::Result;
use crate::otp::IdentityLookup;

#[async_trait]
impl IdentityLookup for super::Database {
    async fn phone_known(&self, phone: &str) -> Result<bool> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE phone = $1")
            .bind(phone)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }
}

mod otp;
mod twitter;
mod users;

use sqlx::PgPool;

/// Database connection wrapper. Implements the store traits consumed by
/// the OTP throttler and the Twitter exchange service.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

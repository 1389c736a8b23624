//! Twitter session persistence.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{NewTwitterSession, SessionState, TwitterSession};
use crate::twitter::SessionStore;

#[async_trait]
impl SessionStore for super::Database {
    async fn create(&self, session: NewTwitterSession) -> Result<TwitterSession> {
        let session = sqlx::query_as::<_, TwitterSession>(
            r#"
            INSERT INTO twitter_sessions (owner_id, request_token, request_token_secret)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&session.owner_id)
        .bind(&session.request_token)
        .bind(&session.request_token_secret)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    async fn find_by_request_token(&self, request_token: &str) -> Result<Option<TwitterSession>> {
        let session = sqlx::query_as::<_, TwitterSession>(
            "SELECT * FROM twitter_sessions WHERE request_token = $1",
        )
        .bind(request_token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn grant_access_token(
        &self,
        request_token: &str,
        access_token: &str,
        access_token_secret: &str,
        linked_resource_id: Option<&str>,
    ) -> Result<bool> {
        // Only a still-pending session transitions; a raced second
        // submission matches zero rows instead of overwriting.
        let result = sqlx::query(
            r#"
            UPDATE twitter_sessions
            SET access_token = $2,
                access_token_secret = $3,
                state = $5,
                linked_resource_id = $4
            WHERE request_token = $1
              AND state = $6
            "#,
        )
        .bind(request_token)
        .bind(access_token)
        .bind(access_token_secret)
        .bind(linked_resource_id)
        .bind(SessionState::AccessTokenGranted)
        .bind(SessionState::RequestTokenIssued)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn attach_resource(
        &self,
        access_token: &str,
        owner_id: &str,
        linked_resource_id: Option<&str>,
    ) -> Result<Option<TwitterSession>> {
        let session = sqlx::query_as::<_, TwitterSession>(
            r#"
            UPDATE twitter_sessions
            SET linked_resource_id = $3
            WHERE access_token = $1
              AND owner_id = $2
              AND state = $4
            RETURNING *
            "#,
        )
        .bind(access_token)
        .bind(owner_id)
        .bind(linked_resource_id)
        .bind(SessionState::AccessTokenGranted)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }
}

use sqlx::SqlitePool;
use tracing::{debug, instrument};

use crate::models::refresh_token::RefreshTokenRecord;

/// Persisted refresh tokens. At most one record per user survives a
/// successful [`RefreshTokenStore::replace_for_user`].
#[derive(Clone)]
pub struct RefreshTokenStore {
    pool: SqlitePool,
}

impl RefreshTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Deletes every record for `user_id` and stores `token` in one transaction.
    #[instrument(skip(self, token))]
    pub async fn replace_for_user(
        &self,
        user_id: &str,
        token: &str,
        expires_at: i64,
        now: i64,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query(
            "INSERT INTO refresh_tokens (user_id, token, expires_at, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(removed, "rotated refresh token");
        Ok(())
    }

    /// The record for exactly this user and token, if it has not expired.
    pub async fn find_active(
        &self,
        user_id: &str,
        token: &str,
        now: i64,
    ) -> Result<Option<RefreshTokenRecord>, sqlx::Error> {
        sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT id, user_id, token, expires_at, created_at
            FROM refresh_tokens
            WHERE user_id = ? AND token = ? AND expires_at > ?
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
    }

    #[instrument(skip(self, token))]
    pub async fn delete_token(&self, token: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    pub async fn delete_for_user(&self, user_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    #[cfg(test)]
    pub async fn count_for_user(&self, user_id: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
    }
}

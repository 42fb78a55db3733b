// src/services/jwt_service.rs
use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::JwtConfig;
use crate::error::TokenError;
use crate::models::jwt::{AccessClaims, AccessPayload, RefreshClaims, TokenPair};
use crate::services::refresh_token_store::RefreshTokenStore;
use crate::utils::jwt::JwtKeys;

/// Issues and verifies access and refresh tokens. Access tokens are purely
/// cryptographic; refresh tokens must also be present in the store.
#[derive(Clone)]
pub struct JwtService {
    store: RefreshTokenStore,
    access_keys: JwtKeys,
    refresh_keys: JwtKeys,
    access_ttl: Duration,
    refresh_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl JwtService {
    pub fn new(config: &JwtConfig, store: RefreshTokenStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            access_keys: JwtKeys::from_secret(&config.access_secret),
            refresh_keys: JwtKeys::from_secret(&config.refresh_secret),
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
            clock,
        }
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /* ---------- ACCESS TOKENS ---------- */

    pub fn issue_access_token(&self, payload: AccessPayload) -> Result<String, TokenError> {
        let claims = AccessClaims::new(payload, self.clock.now(), self.access_ttl);
        self.access_keys.encode(&claims)
    }

    /// Validate an access token and return its claims.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.access_keys
            .decode::<AccessClaims>(token, self.clock.now())
            .inspect_err(|e| debug!(reason = %e, "access token rejected"))
    }

    /* ---------- REFRESH TOKENS ---------- */

    /// Mint a refresh token and make it the user's only stored one.
    #[instrument(skip(self))]
    pub async fn issue_refresh_token(&self, user_id: &str) -> Result<String, TokenError> {
        let now = self.clock.now();
        let claims = RefreshClaims::new(
            user_id.to_string(),
            Uuid::new_v4().to_string(),
            now,
            self.refresh_ttl,
        );
        let token = self.refresh_keys.encode(&claims)?;

        self.store
            .replace_for_user(user_id, &token, claims.exp, now.timestamp())
            .await?;

        Ok(token)
    }

    /// Signature and expiry must hold, and the store must still know the token.
    #[instrument(skip(self, token))]
    pub async fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let now = self.clock.now();
        let claims = self
            .refresh_keys
            .decode::<RefreshClaims>(token, now)
            .inspect_err(|e| debug!(reason = %e, "refresh token rejected"))?;

        let record = self
            .store
            .find_active(&claims.user_id, token, now.timestamp())
            .await?;

        if record.is_none() {
            debug!(user_id = %claims.user_id, "refresh token not in store");
            return Err(TokenError::Revoked);
        }

        Ok(claims)
    }

    /// Idempotent: revoking an unknown token is not an error.
    pub async fn revoke_refresh_token(&self, token: &str) -> Result<(), TokenError> {
        self.store.delete_token(token).await?;
        Ok(())
    }

    pub async fn revoke_all_for_user(&self, user_id: &str) -> Result<(), TokenError> {
        let removed = self.store.delete_for_user(user_id).await?;
        debug!(user_id = %user_id, removed, "revoked all refresh tokens");
        Ok(())
    }

    /// Generate a fresh access/refresh pair for a user.
    pub async fn create_tokens(&self, payload: AccessPayload) -> Result<TokenPair, TokenError> {
        let refresh_token = self.issue_refresh_token(&payload.user_id).await?;
        let access_token = self.issue_access_token(payload)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}

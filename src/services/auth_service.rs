use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{info, instrument, warn};

use crate::clock::Clock;
use crate::error::{ApiError, TokenError};
use crate::models::jwt::{AccessClaims, RefreshClaims, TokenPair};
use crate::models::user::{NewUser, User};
use crate::services::jwt_service::JwtService;
use crate::services::password::PasswordHasher;

#[derive(Clone)]
pub struct AuthService {
    pool: SqlitePool,
    jwt_service: JwtService,
    hasher: PasswordHasher,
    clock: Arc<dyn Clock>,
}

pub struct Registration<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
}

impl AuthService {
    pub fn new(
        pool: SqlitePool,
        jwt_service: JwtService,
        hasher: PasswordHasher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pool,
            jwt_service,
            hasher,
            clock,
        }
    }

    #[instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn register(&self, registration: Registration<'_>) -> Result<User, ApiError> {
        if User::find_by_email(&self.pool, registration.email)
            .await?
            .is_some()
        {
            return Err(ApiError::EmailTaken);
        }
        if User::find_by_username(&self.pool, registration.username)
            .await?
            .is_some()
        {
            return Err(ApiError::UsernameTaken);
        }

        let password_hash = self.hash_password(registration.password).await?;

        let user = User::create(
            &self.pool,
            NewUser {
                email: registration.email,
                username: registration.username,
                password_hash: &password_hash,
                first_name: registration.first_name,
                last_name: registration.last_name,
                is_admin: false,
                created_at: self.clock.now().timestamp(),
            },
        )
        .await?;

        info!(user_id = %user.id, "registered user");
        Ok(user)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, TokenPair), ApiError> {
        let user = User::find_by_email(&self.pool, email)
            .await?
            .ok_or(ApiError::InvalidCredentials)?;

        if !self.verify_password(password, &user.password_hash).await? {
            warn!(user_id = %user.id, "failed login attempt");
            return Err(ApiError::InvalidCredentials);
        }

        let tokens = self.jwt_service.create_tokens(user.access_payload()).await?;

        info!(user_id = %user.id, "user logged in");
        Ok((user, tokens))
    }

    /// Mint a new access token from a stored refresh token.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, ApiError> {
        let claims = self.verify_refresh(refresh_token).await?;

        let user = User::find_by_id(&self.pool, &claims.user_id)
            .await?
            .ok_or(ApiError::UserNotFound)?;

        Ok(self.jwt_service.issue_access_token(user.access_payload())?)
    }

    #[instrument(skip_all)]
    pub async fn logout(&self, refresh_token: &str) -> Result<(), ApiError> {
        self.jwt_service.revoke_refresh_token(refresh_token).await?;
        Ok(())
    }

    /// Revoke every refresh token belonging to the owner of `refresh_token`.
    #[instrument(skip_all)]
    pub async fn logout_all(&self, refresh_token: &str) -> Result<(), ApiError> {
        let claims = self.verify_refresh(refresh_token).await?;
        self.jwt_service.revoke_all_for_user(&claims.user_id).await?;
        info!(user_id = %claims.user_id, "logged out of all sessions");
        Ok(())
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, ApiError> {
        Ok(self.jwt_service.verify_access_token(token)?)
    }

    async fn verify_refresh(&self, refresh_token: &str) -> Result<RefreshClaims, ApiError> {
        self.jwt_service
            .verify_refresh_token(refresh_token)
            .await
            .map_err(|e| match e {
                TokenError::Store(e) => e.into(),
                _ => ApiError::InvalidRefreshToken,
            })
    }

    async fn hash_password(&self, password: &str) -> Result<String, ApiError> {
        let hasher = self.hasher;
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))?
            .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
    }

    async fn verify_password(&self, password: &str, digest: &str) -> Result<bool, ApiError> {
        let hasher = self.hasher;
        let password = password.to_string();
        let digest = digest.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .map_err(|e| ApiError::Internal(format!("password check failed: {e}")))
    }
}

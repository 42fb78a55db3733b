use std::sync::Arc;

use sqlx::SqlitePool;

use crate::clock::Clock;
use crate::config::{AppConfig, Environment};
use crate::middleware::rate_limit::RateLimiters;
use crate::services::{
    auth_service::AuthService, cookie_service::CookieService, jwt_service::JwtService,
    password::PasswordHasher, refresh_token_store::RefreshTokenStore,
    tracking_service::TrackingTokenService,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub auth_service: AuthService,
    pub jwt_service: JwtService,
    pub tracking_service: TrackingTokenService,
    pub cookie_service: CookieService,
    pub rate_limiters: RateLimiters,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        let store = RefreshTokenStore::new(pool.clone());
        let jwt_service = JwtService::new(&config.jwt, store, clock.clone());
        let tracking_service = TrackingTokenService::new(&config.jwt, clock.clone());
        let auth_service = AuthService::new(
            pool.clone(),
            jwt_service.clone(),
            PasswordHasher::new(config.bcrypt_cost),
            clock.clone(),
        );

        Self {
            pool,
            auth_service,
            jwt_service,
            tracking_service,
            cookie_service: CookieService::new(config.environment == Environment::Production),
            rate_limiters: RateLimiters::new(&config.rate_limits),
            clock,
        }
    }
}

// src/models/jwt.rs
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Literal every order-tracking token must carry in its `purpose` claim.
pub const TRACKING_PURPOSE: &str = "order-tracking";

/// Claims that carry an expiry, checked against the service clock.
pub trait ExpiringClaims {
    fn expires_at(&self) -> i64;
}

/// Identity carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPayload {
    pub user_id: String,
    pub email: String,
    pub username: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(flatten)]
    pub identity: AccessPayload,
    pub iat: i64, // issued at
    pub exp: i64, // expiration time
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshClaims {
    pub user_id: String,
    pub token_id: String, // unique per issuance
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingClaims {
    pub order_id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub purpose: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl AccessClaims {
    pub fn new(identity: AccessPayload, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            identity,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

impl RefreshClaims {
    pub fn new(user_id: String, token_id: String, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            user_id,
            token_id,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

impl TrackingClaims {
    pub fn new(order_id: String, email: Option<String>, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            order_id,
            email,
            purpose: TRACKING_PURPOSE.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

impl ExpiringClaims for AccessClaims {
    fn expires_at(&self) -> i64 {
        self.exp
    }
}

impl ExpiringClaims for RefreshClaims {
    fn expires_at(&self) -> i64 {
        self.exp
    }
}

impl ExpiringClaims for TrackingClaims {
    fn expires_at(&self) -> i64 {
        self.exp
    }
}

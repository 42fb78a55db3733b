use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::TokenError;
use crate::models::jwt::ExpiringClaims;

/// HS256 key pair derived from one shared secret.
#[derive(Clone)]
pub struct JwtKeys {
    enc_key: EncodingKey,
    dec_key: DecodingKey,
}

impl JwtKeys {
    pub fn from_secret(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            enc_key: EncodingKey::from_secret(bytes),
            dec_key: DecodingKey::from_secret(bytes),
        }
    }

    pub fn encode<T: Serialize>(&self, claims: &T) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.enc_key).map_err(TokenError::Signing)
    }

    /// Checks signature and structure, then expiry against `now`.
    /// Expiry is checked here rather than by `jsonwebtoken` so the clock can be
    /// injected.
    pub fn decode<T>(&self, token: &str, now: DateTime<Utc>) -> Result<T, TokenError>
    where
        T: DeserializeOwned + ExpiringClaims,
    {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let claims = decode::<T>(token, &self.dec_key, &validation)?.claims;
        if claims.expires_at() <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

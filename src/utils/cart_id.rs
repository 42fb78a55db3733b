//! Anonymous cart identity carried in the `X-Cart-Id` header.

use http::{HeaderMap, HeaderName};
use uuid::Uuid;

use crate::middleware::auth::AuthState;

pub const CART_ID_HEADER: HeaderName = HeaderName::from_static("x-cart-id");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartId(pub String);

/// 32 lowercase hex characters.
pub fn generate_cart_id() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn is_valid_cart_id(value: &str) -> bool {
    value.len() == 32 && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// The cart id from the request, or a fresh one. The flag is true when the
/// id was generated and must be echoed back to the client.
pub fn resolve_cart_id(headers: &HeaderMap) -> (CartId, bool) {
    match headers
        .get(&CART_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| is_valid_cart_id(v))
    {
        Some(existing) => (CartId(existing.to_string()), false),
        None => (CartId(generate_cart_id()), true),
    }
}

/// `user:<id>` for signed-in requests, `cart:<id>` otherwise.
pub fn owner_key(auth: &AuthState, cart_id: &CartId) -> String {
    match auth {
        AuthState::Authenticated(claims) => format!("user:{}", claims.identity.user_id),
        AuthState::Unauthenticated => format!("cart:{}", cart_id.0),
    }
}

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::{
    error::ApiError,
    models::jwt::AccessClaims,
    services::jwt_service::JwtService,
    state::AppState,
};

/// Outcome of authenticating a request; inserted into request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated(AccessClaims),
}

/// Identity attached by [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AccessClaims);

/// The token from `Authorization: Bearer <token>`, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Never fails: a missing and a bad token are both `Unauthenticated`.
pub fn resolve_optional(jwt_service: &JwtService, headers: &HeaderMap) -> AuthState {
    match bearer_token(headers).map(|token| jwt_service.verify_access_token(token)) {
        Some(Ok(claims)) => AuthState::Authenticated(claims),
        Some(Err(e)) => {
            debug!(reason = %e, "ignoring invalid token on optional route");
            AuthState::Unauthenticated
        }
        None => AuthState::Unauthenticated,
    }
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or(ApiError::MissingCredential)?;
    let claims = state.jwt_service.verify_access_token(token)?;

    request.extensions_mut().insert(CurrentUser(claims.clone()));
    request
        .extensions_mut()
        .insert(AuthState::Authenticated(claims));

    Ok(next.run(request).await)
}

pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth = resolve_optional(&state.jwt_service, request.headers());
    request.extensions_mut().insert(auth);

    next.run(request).await
}

/// Must run inside [`require_auth`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or(ApiError::MissingCredential)?;

    if !user.0.identity.is_admin {
        debug!(user_id = %user.0.identity.user_id, "admin access denied");
        return Err(ApiError::InsufficientRole);
    }

    Ok(next.run(request).await)
}

/// Admins pass; everyone else must own the resource.
pub fn require_owner_or_admin(claims: &AccessClaims, resource_user_id: &str) -> Result<(), ApiError> {
    if claims.identity.is_admin || claims.identity.user_id == resource_user_id {
        Ok(())
    } else {
        Err(ApiError::ResourceNotOwned)
    }
}

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;
use validator::{Validate, ValidationError};

use crate::{
    error::ApiError,
    middleware::auth::bearer_token,
    models::{jwt::AccessPayload, user::User},
    services::{auth_service::Registration, cookie_service::CookieService},
    state::AppState,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(
        length(min = 3, max = 30, message = "must be between 3 and 30 characters"),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(
        length(min = 8, message = "must be at least 8 characters"),
        custom(function = "validate_password_strength")
    )]
    pub password: String,
    #[validate(length(min = 1, max = 50, message = "must be between 1 and 50 characters"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 50, message = "must be between 1 and 50 characters"))]
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    message: &'static str,
    user: User,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    message: &'static str,
    access_token: String,
    refresh_token: String,
    user: User,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    access_token: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    message: &'static str,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    valid: bool,
    user: AccessPayload,
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        Ok(())
    } else {
        Err(ValidationError::new("username_charset")
            .with_message("may only contain letters, digits, dashes and underscores".into()))
    }
}

fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if has_lower && has_upper && has_digit {
        Ok(())
    } else {
        Err(ValidationError::new("password_strength").with_message(
            "must contain a lowercase letter, an uppercase letter and a digit".into(),
        ))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// The refresh token from the JSON body, falling back to the cookie.
fn refresh_token_from(body: Option<Json<RefreshRequest>>, cookies: &Cookies) -> Option<String> {
    body.and_then(|Json(body)| body.refresh_token)
        .filter(|t| !t.is_empty())
        .or_else(|| CookieService::refresh_token(cookies))
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    payload.validate()?;

    let email = normalize_email(&payload.email);
    let user = state
        .auth_service
        .register(Registration {
            email: &email,
            username: &payload.username,
            password: &payload.password,
            first_name: payload.first_name.as_deref(),
            last_name: payload.last_name.as_deref(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User created successfully",
            user,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    payload.validate()?;

    let (user, tokens) = state
        .auth_service
        .login(&normalize_email(&payload.email), &payload.password)
        .await?;

    state.cookie_service.set_refresh_cookie(
        &cookies,
        &tokens.refresh_token,
        state.jwt_service.refresh_ttl(),
    );

    Ok(Json(LoginResponse {
        message: "Login successful",
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        user,
    }))
}

pub async fn refresh(
    State(state): State<AppState>,
    cookies: Cookies,
    body: Option<Json<RefreshRequest>>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let refresh_token = refresh_token_from(body, &cookies).ok_or(ApiError::RefreshTokenRequired)?;

    let access_token = state.auth_service.refresh(&refresh_token).await?;

    Ok(Json(RefreshResponse { access_token }))
}

pub async fn logout(
    State(state): State<AppState>,
    cookies: Cookies,
    body: Option<Json<RefreshRequest>>,
) -> Result<Json<MessageResponse>, ApiError> {
    if let Some(refresh_token) = refresh_token_from(body, &cookies) {
        state.auth_service.logout(&refresh_token).await?;
    }
    state.cookie_service.clear_refresh_cookie(&cookies);

    Ok(Json(MessageResponse {
        message: "Logged out",
    }))
}

pub async fn logout_all(
    State(state): State<AppState>,
    cookies: Cookies,
    body: Option<Json<RefreshRequest>>,
) -> Result<Json<MessageResponse>, ApiError> {
    let refresh_token = refresh_token_from(body, &cookies).ok_or(ApiError::RefreshTokenRequired)?;

    state.auth_service.logout_all(&refresh_token).await?;
    state.cookie_service.clear_refresh_cookie(&cookies);

    Ok(Json(MessageResponse {
        message: "Logged out of all devices",
    }))
}

pub async fn verify(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<VerifyResponse>, ApiError> {
    let token = bearer_token(&headers).ok_or(ApiError::MissingCredential)?;
    let claims = state.auth_service.verify_access(token)?;

    Ok(Json(VerifyResponse {
        valid: true,
        user: claims.identity,
    }))
}

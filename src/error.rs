use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::errors::ErrorKind;
use serde::Serialize;
use tracing::error;

/// Why a token was rejected. Kept for logging; callers outside the
/// services see a single rejection per token kind.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature does not match")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("token has no matching store record")]
    Revoked,
    #[error("token purpose does not match")]
    WrongPurpose,
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("token store failure: {0}")]
    Store(#[from] sqlx::Error),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not defined")]
    MissingSecret(&'static str),
    #[error("{name} must be at least {min} characters")]
    SecretTooShort { name: &'static str, min: usize },
    #[error("invalid duration `{value}` for {name}")]
    InvalidDuration { name: &'static str, value: String },
    #[error("invalid value `{value}` for {name}")]
    InvalidValue { name: &'static str, value: String },
}

/// Every failure a handler can return. Rendered as `{ error, code }`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Access token required")]
    MissingCredential,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Administrator access required")]
    InsufficientRole,
    #[error("Access to this resource is not allowed")]
    ResourceNotOwned,
    #[error("Invalid tracking token")]
    InvalidTrackingToken,
    #[error("Tracking token was not issued for order tracking")]
    InvalidTrackingPurpose,
    #[error("Access to this order is not allowed")]
    OrderAccessDenied,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Refresh token required")]
    RefreshTokenRequired,
    #[error("Invalid refresh token")]
    InvalidRefreshToken,
    #[error("Invalid data: {0}")]
    Validation(String),
    #[error("This email is already in use")]
    EmailTaken,
    #[error("This username is already in use")]
    UsernameTaken,
    #[error("User not found")]
    UserNotFound,
    #[error("Order not found")]
    OrderNotFound,
    #[error("Too many attempts, try again later")]
    RateLimited { retry_after_secs: u64 },
    #[error("Internal server error")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingCredential
            | ApiError::InvalidToken
            | ApiError::InvalidTrackingToken
            | ApiError::OrderAccessDenied
            | ApiError::InvalidCredentials
            | ApiError::InvalidRefreshToken => StatusCode::UNAUTHORIZED,
            ApiError::InsufficientRole
            | ApiError::ResourceNotOwned
            | ApiError::InvalidTrackingPurpose => StatusCode::FORBIDDEN,
            ApiError::RefreshTokenRequired | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::EmailTaken | ApiError::UsernameTaken => StatusCode::CONFLICT,
            ApiError::UserNotFound | ApiError::OrderNotFound => StatusCode::NOT_FOUND,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingCredential => "ACCESS_TOKEN_REQUIRED",
            ApiError::InvalidToken => "INVALID_TOKEN",
            ApiError::InsufficientRole => "ADMIN_ACCESS_REQUIRED",
            ApiError::ResourceNotOwned => "RESOURCE_NOT_OWNED",
            ApiError::InvalidTrackingToken => "INVALID_TRACKING_TOKEN",
            ApiError::InvalidTrackingPurpose => "INVALID_TRACKING_PURPOSE",
            ApiError::OrderAccessDenied => "ORDER_ACCESS_DENIED",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::RefreshTokenRequired => "REFRESH_TOKEN_REQUIRED",
            ApiError::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::EmailTaken => "EMAIL_ALREADY_EXISTS",
            ApiError::UsernameTaken => "USERNAME_ALREADY_EXISTS",
            ApiError::UserNotFound => "USER_NOT_FOUND",
            ApiError::OrderNotFound => "ORDER_NOT_FOUND",
            ApiError::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            ApiError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            error!(detail = %detail, "request failed");
        }

        let body = ErrorBody {
            error: self.to_string(),
            code: self.code(),
        };
        let mut response = (self.status(), Json(body)).into_response();
        if let ApiError::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Internal(format!("database error: {err}"))
    }
}

/// Access-token failures collapse into one rejection.
impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Store(e) => e.into(),
            TokenError::Signing(e) => ApiError::Internal(format!("token signing failed: {e}")),
            _ => ApiError::InvalidToken,
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let reason = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| "is invalid".to_string());
                format!("{field} {reason}")
            })
            .collect();
        fields.sort();
        ApiError::Validation(fields.join(", "))
    }
}

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::Value;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::sync::{Arc, Once};
use tower::ServiceExt;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

use crate::clock::ManualClock;
use crate::config::{AppConfig, MIN_BCRYPT_COST};
use crate::models::user::{NewUser, User};
use crate::services::password::PasswordHasher;
use crate::state::AppState;

pub const ACCESS_SECRET: &str = "test-access-secret-0123456789abcdef0123456789abcdef0123456789abcdef";
pub const REFRESH_SECRET: &str = "test-refresh-secret-0123456789abcdef0123456789abcdef0123456789abcd";
pub const PASSWORD: &str = "Password123";

static INIT: Once = Once::new();

/// Initialize logging exactly once
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_target(false)
            .with_level(true)
            .with_file(true)
            .with_line_number(true)
            .with_max_level(Level::ERROR)
            .with_span_events(FmtSpan::NONE)
            .init();
    });
}

/// Test config: fixed secrets, no dedicated tracking secret, cheapest bcrypt,
/// and rate limits high enough to stay out of the way. `overrides` win.
pub fn test_config(overrides: &[(&str, &str)]) -> AppConfig {
    let cost = MIN_BCRYPT_COST.to_string();
    AppConfig::from_lookup(|key| {
        if let Some((_, value)) = overrides.iter().find(|(k, _)| *k == key) {
            return Some(value.to_string());
        }
        match key {
            "APP_ENV" => Some("test".to_string()),
            "JWT_SECRET" => Some(ACCESS_SECRET.to_string()),
            "JWT_REFRESH_SECRET" => Some(REFRESH_SECRET.to_string()),
            "BCRYPT_COST" => Some(cost.clone()),
            "AUTH_RATE_LIMIT_MAX" | "REFRESH_RATE_LIMIT_MAX" => Some("1000".to_string()),
            _ => None,
        }
    })
    .expect("test config is valid")
}

pub async fn setup_test_db() -> SqlitePool {
    init_tracing();
    info!("Setting up test database");

    // One connection that never recycles, so every query sees the same
    // in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database");

    crate::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: ManualClock,
    pub pool: SqlitePool,
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(&[]).await
}

pub async fn create_test_app_with(overrides: &[(&str, &str)]) -> TestApp {
    let pool = setup_test_db().await;
    let clock = ManualClock::new();
    let config = test_config(overrides);
    let state = AppState::new(pool.clone(), &config, Arc::new(clock.clone()));
    let router = crate::create_router(state.clone(), &config.cors_origins);

    TestApp {
        router,
        state,
        clock,
        pool,
    }
}

pub async fn seed_user(pool: &SqlitePool, email: &str, username: &str, is_admin: bool) -> User {
    let password_hash = PasswordHasher::new(MIN_BCRYPT_COST)
        .hash(PASSWORD)
        .expect("hash password");

    User::create(
        pool,
        NewUser {
            email,
            username,
            password_hash: &password_hash,
            first_name: None,
            last_name: None,
            is_admin,
            created_at: chrono::Utc::now().timestamp(),
        },
    )
    .await
    .expect("seed user")
}

pub async fn seed_order(pool: &SqlitePool, id: &str, user_id: Option<&str>, email: &str) {
    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        r#"
        INSERT INTO orders (id, order_number, user_id, email, status, carrier, tracking_number,
                            shipping_address, currency, total_cents, created_at, updated_at)
        VALUES (?, ?, ?, ?, 'SHIPPED', 'COLISSIMO', 'ABC123', '1 rue de la Paix, Paris', 'EUR', 4200, ?, ?)
        "#,
    )
    .bind(id)
    .bind(format!("ORD-{id}"))
    .bind(user_id)
    .bind(email)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .expect("seed order");

    sqlx::query(
        r#"
        INSERT INTO order_items (order_id, product_name, quantity, unit_price_cents, total_price_cents)
        VALUES (?, 'Booster Pack', 2, 2100, 4200)
        "#,
    )
    .bind(id)
    .execute(pool)
    .await
    .expect("seed order item");
}

pub async fn seed_event(
    pool: &SqlitePool,
    order_id: &str,
    event_type: &str,
    message: Option<&str>,
    created_at: i64,
) {
    sqlx::query(
        "INSERT INTO order_events (order_id, event_type, message, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(order_id)
    .bind(event_type)
    .bind(message)
    .bind(created_at)
    .execute(pool)
    .await
    .expect("seed order event");
}

pub fn bearer(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "authorization",
        format!("Bearer {token}").parse().expect("header value"),
    );
    headers
}

pub async fn test_request(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    headers: Option<HeaderMap>,
) -> (StatusCode, String, HeaderMap) {
    info!(method = %method, uri = %uri, "Making test request");

    let body = match body {
        Some(json) => Body::from(serde_json::to_string(&json).unwrap()),
        None => Body::empty(),
    };

    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");

    if let Some(custom_headers) = headers {
        for (key, value) in custom_headers.iter() {
            request = request.header(key, value);
        }
    }

    let request = request.body(body).unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = String::from_utf8(
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec(),
    )
    .unwrap();

    info!(status = %status, body = %body, "Test response received");
    (status, body, headers)
}

pub fn json(body: &str) -> Value {
    serde_json::from_str(body).expect("response body is JSON")
}

/// Logs in through the API and returns `(access_token, refresh_token)`.
pub async fn login(app: &Router, email: &str) -> (String, String) {
    let (status, body, _) = test_request(
        app.clone(),
        "POST",
        "/auth/login",
        Some(serde_json::json!({ "email": email, "password": PASSWORD })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");

    let body = json(&body);
    (
        body["accessToken"].as_str().unwrap().to_string(),
        body["refreshToken"].as_str().unwrap().to_string(),
    )
}

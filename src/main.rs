use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::{net::SocketAddr, sync::Arc};
use tower_cookies::CookieManagerLayer;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

mod api;
mod clock;
mod config;
mod db;
mod error;
mod middleware;
mod models;
mod services;
mod state;
mod utils;
#[cfg(test)]
mod tests;

use crate::clock::SystemClock;
use crate::config::AppConfig;
use crate::middleware::{
    auth::{optional_auth, require_admin, require_auth},
    cart::cart_id_middleware,
    rate_limit::{limit_auth, limit_refresh},
};
use crate::state::AppState;
use crate::utils::cart_id::CART_ID_HEADER;

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, CART_ID_HEADER])
        .expose_headers([CART_ID_HEADER])
        .allow_credentials(true)
}

pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    let credentials = Router::new()
        .route("/auth/register", post(api::auth::register))
        .route("/auth/login", post(api::auth::login))
        .route_layer(from_fn_with_state(state.clone(), limit_auth));

    let refresh = Router::new()
        .route("/auth/refresh", post(api::auth::refresh))
        .route_layer(from_fn_with_state(state.clone(), limit_refresh));

    let public = Router::new()
        .route("/health", get(health))
        .merge(credentials)
        .merge(refresh)
        .route("/auth/logout", post(api::auth::logout))
        .route("/auth/logout-all", post(api::auth::logout_all))
        .route("/auth/verify", get(api::auth::verify));

    let authenticated = Router::new()
        .route("/users/me", get(api::user::get_current_user))
        .route("/users/:user_id", get(api::user::get_user))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    // Layers run outside-in: authenticate first, then check the role.
    let admin = Router::new()
        .route("/admin/users", get(api::admin::list_users))
        .route(
            "/admin/orders/:order_id/tracking-token",
            post(api::admin::issue_tracking_token),
        )
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let cart = Router::new()
        .route("/cart/owner", get(api::cart::get_owner))
        .route_layer(from_fn(cart_id_middleware));

    let optional = Router::new()
        .route("/orders/:order_id", get(api::orders::get_order))
        .merge(cart)
        .route_layer(from_fn_with_state(state.clone(), optional_auth));

    Router::new()
        .merge(public)
        .merge(authenticated)
        .merge(admin)
        .merge(optional)
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("storefront_auth=info,tower_http=info")),
        )
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration, refusing to start");
            std::process::exit(1);
        }
    };

    let pool = match db::create_db_pool(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "failed to open database");
            std::process::exit(1);
        }
    };

    let state = AppState::new(pool, &config, Arc::new(SystemClock));
    let app = create_router(state, &config.cors_origins);

    let listener = match tokio::net::TcpListener::bind(config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, addr = %config.bind_addr, "failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!(environment = ?config.environment, "listening on {}", config.bind_addr);
    let service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, service).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}

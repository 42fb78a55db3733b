use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::{
    error::ApiError,
    models::{order::Order, user::User},
    services::tracking_service::build_tracking_url,
    state::AppState,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingTokenResponse {
    order_id: String,
    token: String,
    tracking_url: Option<String>,
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(User::list(&state.pool).await?))
}

/// Mints the link a customer receives to follow an order without signing in.
pub async fn issue_tracking_token(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<TrackingTokenResponse>, ApiError> {
    let order = Order::find_by_id(&state.pool, &order_id)
        .await?
        .ok_or(ApiError::OrderNotFound)?;

    let token = state
        .tracking_service
        .issue(&order.id, order.email.as_deref())
        .map_err(ApiError::from)?;

    let tracking_url = build_tracking_url(order.carrier.as_deref(), order.tracking_number.as_deref());
    if let Some(url) = &tracking_url {
        if order.tracking_url.as_deref() != Some(url.as_str()) {
            let now = state.clock.now().timestamp();
            Order::set_tracking_url(&state.pool, &order.id, url, now).await?;
        }
    }

    info!(order_id = %order.id, "issued order tracking token");
    Ok(Json(TrackingTokenResponse {
        order_id: order.id,
        token,
        tracking_url,
    }))
}

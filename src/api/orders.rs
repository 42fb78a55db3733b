use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, TokenError},
    middleware::auth::AuthState,
    models::order::{Order, OrderDetails, PublicTrackingOrder},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct TrackingQuery {
    pub token: Option<String>,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum OrderView {
    Owner(OrderDetails),
    Public(PublicTrackingOrder),
}

#[derive(Serialize, PartialEq, Eq, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OrderAccess {
    Owner,
    Token,
}

#[derive(Serialize)]
pub struct OrderResponse {
    order: OrderView,
    access: OrderAccess,
}

/// Signed-in owners see the full order; anyone holding a tracking token for
/// this order sees the public view.
pub async fn get_order(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthState>,
    Path(order_id): Path<String>,
    Query(query): Query<TrackingQuery>,
) -> Result<Json<OrderResponse>, ApiError> {
    let token_order_id = match query.token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => match state.tracking_service.verify(token) {
            Ok(claims) => Some(claims.order_id),
            Err(TokenError::WrongPurpose) => return Err(ApiError::InvalidTrackingPurpose),
            Err(_) => return Err(ApiError::InvalidTrackingToken),
        },
        None => None,
    };
    let can_use_token = token_order_id.as_deref() == Some(order_id.as_str());

    if let AuthState::Authenticated(claims) = &auth {
        if let Some(order) =
            Order::find_for_user(&state.pool, &order_id, &claims.identity.user_id).await?
        {
            return Ok(Json(OrderResponse {
                order: OrderView::Owner(order.into_details(&state.pool).await?),
                access: OrderAccess::Owner,
            }));
        }
    } else if !can_use_token {
        return Err(ApiError::OrderAccessDenied);
    }

    if !can_use_token {
        return Err(ApiError::OrderNotFound);
    }

    let order = Order::find_by_id(&state.pool, &order_id)
        .await?
        .ok_or(ApiError::OrderNotFound)?;

    Ok(Json(OrderResponse {
        order: OrderView::Public(order.into_details(&state.pool).await?.into()),
        access: OrderAccess::Token,
    }))
}

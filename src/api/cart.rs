use axum::{Extension, Json};
use serde::Serialize;

use crate::{
    middleware::auth::AuthState,
    utils::cart_id::{owner_key, CartId},
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerResponse {
    owner_key: String,
}

/// Who a cart belongs to: the signed-in user, else the anonymous cart id.
pub async fn get_owner(
    Extension(auth): Extension<AuthState>,
    Extension(cart_id): Extension<CartId>,
) -> Json<OwnerResponse> {
    Json(OwnerResponse {
        owner_key: owner_key(&auth, &cart_id),
    })
}

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::{
    error::ApiError,
    middleware::auth::{require_owner_or_admin, CurrentUser},
    models::user::User,
    state::AppState,
};

pub async fn get_current_user(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<User>, ApiError> {
    let user = User::find_by_id(&state.pool, &current_user.0.identity.user_id)
        .await?
        .ok_or(ApiError::UserNotFound)?;

    Ok(Json(user))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    require_owner_or_admin(&current_user.0, &user_id)?;

    let user = User::find_by_id(&state.pool, &user_id)
        .await?
        .ok_or(ApiError::UserNotFound)?;

    Ok(Json(user))
}

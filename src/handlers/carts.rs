//! Cart endpoints. Every operation is scoped to the authenticated user.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::{common, AppState},
    services::cart::{AddItemInput, UpdateQuantityInput},
};

pub async fn get_cart(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ServiceError> {
    let lines = state.cart.get_cart(auth_user.user_id).await?;
    Ok(common::success(lines))
}

pub async fn add_item(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(input): Json<AddItemInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let line = state.cart.add_item(auth_user.user_id, input).await?;
    Ok(common::created(line))
}

pub async fn update_quantity(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(cart_item_id): Path<Uuid>,
    Json(input): Json<UpdateQuantityInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let line = state
        .cart
        .update_quantity(auth_user.user_id, cart_item_id, input)
        .await?;
    Ok(common::success(line))
}

pub async fn remove_item(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(cart_item_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .cart
        .remove_item(auth_user.user_id, cart_item_id)
        .await?;
    Ok(common::success_message("Cart item removed"))
}

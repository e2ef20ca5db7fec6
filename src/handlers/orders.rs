//! Order endpoints. Customers place, view and cancel their own orders;
//! admins list a store's orders and advance statuses.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::{common, AppState},
    services::{
        orders::{PlaceOrderInput, UpdateStatusInput},
        Pagination,
    },
};

pub async fn place_order(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(input): Json<PlaceOrderInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.orders.place_order(auth_user.user_id, input).await?;
    Ok(common::created(order))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(page): Query<Pagination>,
) -> Result<impl IntoResponse, ServiceError> {
    let (orders, total) = state.orders.list_orders(auth_user.user_id, page).await?;
    Ok(common::paginated(orders, total, page))
}

pub async fn get_order(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.orders.get_order(auth_user.user_id, order_id).await?;
    Ok(common::success(order))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state
        .orders
        .cancel_order(auth_user.user_id, order_id)
        .await?;
    Ok(common::success(order))
}

pub async fn list_store_orders(
    State(state): State<AppState>,
    Path(store_id): Path<Uuid>,
    Query(page): Query<Pagination>,
) -> Result<impl IntoResponse, ServiceError> {
    let (orders, total) = state.orders.list_store_orders(store_id, page).await?;
    Ok(common::paginated(orders, total, page))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(input): Json<UpdateStatusInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.orders.update_status(order_id, input).await?;
    Ok(common::success(order))
}

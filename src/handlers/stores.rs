//! Store endpoints. Reads are public; mutations sit behind the admin gate.

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
        catalog::{CreateStoreInput, UpdateStoreInput},
        Pagination,
    },
};

pub async fn list_stores(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<impl IntoResponse, ServiceError> {
    let (stores, total) = state.catalog.list_stores(page).await?;
    Ok(common::paginated(stores, total, page))
}

pub async fn get_store(
    State(state): State<AppState>,
    Path(store_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let store = state.catalog.get_store(store_id).await?;
    Ok(common::success(store))
}

pub async fn create_store(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(input): Json<CreateStoreInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let store = state.catalog.create_store(auth_user.user_id, input).await?;
    Ok(common::created(store))
}

pub async fn update_store(
    State(state): State<AppState>,
    Path(store_id): Path<Uuid>,
    Json(input): Json<UpdateStoreInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let store = state.catalog.update_store(store_id, input).await?;
    Ok(common::success(store))
}

pub async fn delete_store(
    State(state): State<AppState>,
    Path(store_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.catalog.delete_store(store_id).await?;
    Ok(common::success_message("Store deleted"))
}

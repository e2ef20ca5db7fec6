//! Category endpoints.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    handlers::{common, AppState},
    services::catalog::{CreateCategoryInput, UpdateCategoryInput},
};

pub async fn list_categories(
    State(state): State<AppState>,
    Path(store_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let categories = state.catalog.list_categories(store_id).await?;
    Ok(common::success(categories))
}

pub async fn create_category(
    State(state): State<AppState>,
    Json(input): Json<CreateCategoryInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let category = state.catalog.create_category(input).await?;
    Ok(common::created(category))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    Json(input): Json<UpdateCategoryInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let category = state.catalog.update_category(category_id, input).await?;
    Ok(common::success(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.catalog.delete_category(category_id).await?;
    Ok(common::success_message("Category deleted"))
}

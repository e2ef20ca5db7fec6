//! Product endpoints. A public product fetch also bumps the best-effort
//! view counter.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    handlers::{common, AppState},
    services::{
        catalog::{CreateProductInput, ProductFilter, UpdateProductInput},
        Pagination,
    },
};

/// Flat query struct; query-string deserialization does not cope with
/// nested/flattened numeric fields.
#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

pub async fn list_products(
    State(state): State<AppState>,
    Path(store_id): Path<Uuid>,
    Query(query): Query<ProductListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let filter = ProductFilter {
        category_id: query.category_id,
        search: query.search,
    };
    let default = Pagination::default();
    let page = Pagination {
        page: query.page.unwrap_or(default.page),
        per_page: query.per_page.unwrap_or(default.per_page),
    };
    let (products, total) = state.catalog.list_products(store_id, filter, page).await?;
    Ok(common::paginated(products, total, page))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.catalog.get_product(product_id).await?;
    state.catalog.record_view(product_id).await;
    Ok(common::success(product))
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<CreateProductInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.catalog.create_product(input).await?;
    Ok(common::created(product))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.catalog.update_product(product_id, input).await?;
    Ok(common::success(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.catalog.delete_product(product_id).await?;
    Ok(common::success_message("Product deleted"))
}

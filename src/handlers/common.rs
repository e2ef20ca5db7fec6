//! Response envelope helpers shared by all handlers.
//!
//! Success bodies are `{"success": true, "data": ...}`; failures come from
//! [`crate::errors::ServiceError::into_response`] and carry
//! `{"success": false, "message", "error"}`. Handlers build responses only
//! through these helpers so the envelope stays uniform.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::json;

use crate::services::Pagination;

pub fn success<T: Serialize>(data: T) -> impl IntoResponse {
    Json(json!({ "success": true, "data": data }))
}

pub fn created<T: Serialize>(data: T) -> impl IntoResponse {
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": data })),
    )
}

pub fn success_message(message: &str) -> impl IntoResponse {
    Json(json!({ "success": true, "message": message }))
}

/// List envelope with paging metadata alongside the data.
pub fn paginated<T: Serialize>(items: Vec<T>, total: u64, page: Pagination) -> impl IntoResponse {
    let page = page.normalize();
    Json(json!({
        "success": true,
        "data": items,
        "pagination": {
            "page": page.page,
            "per_page": page.per_page,
            "total": total,
        },
    }))
}

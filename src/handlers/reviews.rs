//! Review endpoints. Reading a product's reviews and rating summary is
//! public; writing requires an authenticated user.

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
    services::{reviews::CreateReviewInput, Pagination},
};

pub async fn list_reviews(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(page): Query<Pagination>,
) -> Result<impl IntoResponse, ServiceError> {
    let (reviews, total) = state.reviews.list_reviews(product_id, page).await?;
    Ok(common::paginated(reviews, total, page))
}

pub async fn rating_summary(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let summary = state.reviews.rating_summary(product_id).await?;
    Ok(common::success(summary))
}

pub async fn create_review(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(input): Json<CreateReviewInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let review = state.reviews.create_review(auth_user.user_id, input).await?;
    Ok(common::created(review))
}

pub async fn delete_review(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(review_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .reviews
        .delete_review(auth_user.user_id, review_id)
        .await?;
    Ok(common::success_message("Review deleted"))
}

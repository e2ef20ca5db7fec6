//! Product reviews and rating aggregation.
//!
//! At most one review per (user, product); the service checks first and a
//! unique index backs it up, so a race between two inserts still yields
//! exactly one row and the loser gets the same conflict as a repeat submit.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::{review, Product, Review, ReviewModel},
    errors::ServiceError,
    events::{Event, EventSender},
    services::Pagination,
};

#[derive(Debug, Deserialize)]
pub struct CreateReviewInput {
    pub product_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
}

/// Aggregate over a product's reviews.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RatingSummary {
    pub product_id: Uuid,
    pub review_count: u64,
    /// Mean rating rounded to two decimal places; absent with no reviews.
    pub average_rating: Option<Decimal>,
}

#[derive(Clone)]
pub struct ReviewService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl ReviewService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input), fields(product_id = %input.product_id))]
    pub async fn create_review(
        &self,
        user_id: Uuid,
        input: CreateReviewInput,
    ) -> Result<ReviewModel, ServiceError> {
        if !(1..=5).contains(&input.rating) {
            return Err(ServiceError::ValidationError(
                "rating must be between 1 and 5".to_string(),
            ));
        }

        Product::find_by_id(input.product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let existing = Review::find()
            .filter(review::Column::UserId.eq(user_id))
            .filter(review::Column::ProductId.eq(input.product_id))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "user has already reviewed this product".to_string(),
            ));
        }

        let model = review::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(input.product_id),
            user_id: Set(user_id),
            rating: Set(input.rating),
            comment: Set(input.comment),
            created_at: Set(Utc::now()),
        };
        let created = match model.insert(&*self.db).await {
            Ok(created) => created,
            // Lost a race with a concurrent submit; the unique
            // (user, product) index rejected the second row.
            Err(e)
                if matches!(
                    e.sql_err(),
                    Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
                ) =>
            {
                return Err(ServiceError::Conflict(
                    "user has already reviewed this product".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        self.event_sender
            .send_or_log(Event::ReviewCreated {
                product_id: created.product_id,
                user_id,
            })
            .await;
        info!(review_id = %created.id, rating = created.rating, "review created");
        Ok(created)
    }

    pub async fn list_reviews(
        &self,
        product_id: Uuid,
        page: Pagination,
    ) -> Result<(Vec<ReviewModel>, u64), ServiceError> {
        let page = page.normalize();
        let paginator = Review::find()
            .filter(review::Column::ProductId.eq(product_id))
            .order_by_desc(review::Column::CreatedAt)
            .paginate(&*self.db, page.per_page);
        let total = paginator.num_items().await?;
        let reviews = paginator.fetch_page(page.page - 1).await?;
        Ok((reviews, total))
    }

    /// Count and mean rating over a product's reviews. Computed from the
    /// rows rather than kept as a denormalized column.
    pub async fn rating_summary(&self, product_id: Uuid) -> Result<RatingSummary, ServiceError> {
        let reviews = Review::find()
            .filter(review::Column::ProductId.eq(product_id))
            .all(&*self.db)
            .await?;

        let review_count = reviews.len() as u64;
        let average_rating = if reviews.is_empty() {
            None
        } else {
            let sum: i64 = reviews.iter().map(|r| i64::from(r.rating)).sum();
            Some((Decimal::from(sum) / Decimal::from(review_count)).round_dp(2))
        };

        Ok(RatingSummary {
            product_id,
            review_count,
            average_rating,
        })
    }

    /// Deletes the caller's own review. Someone else's review reads as
    /// absent.
    #[instrument(skip(self))]
    pub async fn delete_review(&self, user_id: Uuid, review_id: Uuid) -> Result<(), ServiceError> {
        let review = Review::find_by_id(review_id)
            .filter(review::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Review not found".to_string()))?;
        review.delete(&*self.db).await?;
        Ok(())
    }
}

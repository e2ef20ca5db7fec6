//! Per-user cart lines.
//!
//! One line per (user, product, attribute selection); a repeat add merges
//! into the existing line. Stock is a ceiling at add time: the merged
//! quantity may never exceed the product's current `stock_quantity`. The
//! authoritative stock check still happens again at order placement.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::{cart_item, CartItem, CartItemModel},
    errors::ServiceError,
    events::{Event, EventSender},
    models::AttributeSelection,
    services::CatalogService,
};

#[derive(Debug, Deserialize)]
pub struct AddItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
    #[serde(default)]
    pub attributes: AttributeSelection,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityInput {
    pub quantity: i32,
}

#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    catalog: CatalogService,
    event_sender: EventSender,
}

impl CartService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        catalog: CatalogService,
        event_sender: EventSender,
    ) -> Self {
        Self {
            db,
            catalog,
            event_sender,
        }
    }

    /// Adds a product to the user's cart, merging with an existing line when
    /// the product and attribute selection match exactly.
    #[instrument(skip(self, input), fields(product_id = %input.product_id))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        input: AddItemInput,
    ) -> Result<CartItemModel, ServiceError> {
        if input.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "quantity must be at least 1".to_string(),
            ));
        }

        let product = self.catalog.get_product(input.product_id).await?;
        let selection = input.attributes.canonical();

        let existing = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::ProductId.eq(input.product_id))
            .filter(cart_item::Column::AttributeSelection.eq(selection.clone()))
            .one(&*self.db)
            .await?;

        let merged_quantity = existing.as_ref().map_or(0, |line| line.quantity) + input.quantity;
        if merged_quantity > product.stock_quantity {
            return Err(ServiceError::InsufficientStock(product.id));
        }

        let line = match existing {
            Some(line) => {
                let mut active: cart_item::ActiveModel = line.into();
                active.quantity = Set(merged_quantity);
                active.updated_at = Set(Utc::now());
                active.update(&*self.db).await?
            }
            None => {
                let now = Utc::now();
                let model = cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    store_id: Set(product.store_id),
                    product_id: Set(product.id),
                    quantity: Set(input.quantity),
                    attribute_selection: Set(selection.clone()),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                match model.insert(&*self.db).await {
                    Ok(line) => line,
                    // A concurrent identical add won the insert; the unique
                    // (user, product, selection) index keeps the line count
                    // at one, so merge into the winner's row instead.
                    Err(e)
                        if matches!(
                            e.sql_err(),
                            Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
                        ) =>
                    {
                        let winner = CartItem::find()
                            .filter(cart_item::Column::UserId.eq(user_id))
                            .filter(cart_item::Column::ProductId.eq(input.product_id))
                            .filter(cart_item::Column::AttributeSelection.eq(selection))
                            .one(&*self.db)
                            .await?
                            .ok_or_else(|| {
                                ServiceError::InternalError(
                                    "cart line vanished after unique-key conflict".to_string(),
                                )
                            })?;
                        let merged = winner.quantity + input.quantity;
                        if merged > product.stock_quantity {
                            return Err(ServiceError::InsufficientStock(product.id));
                        }
                        let mut active: cart_item::ActiveModel = winner.into();
                        active.quantity = Set(merged);
                        active.updated_at = Set(Utc::now());
                        active.update(&*self.db).await?
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                user_id,
                product_id: product.id,
            })
            .await;
        info!(cart_item_id = %line.id, quantity = line.quantity, "cart line upserted");
        Ok(line)
    }

    /// Sets the quantity on one of the caller's cart lines. A line belonging
    /// to another user reads as absent, never as forbidden.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        user_id: Uuid,
        cart_item_id: Uuid,
        input: UpdateQuantityInput,
    ) -> Result<CartItemModel, ServiceError> {
        if input.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "quantity must be at least 1".to_string(),
            ));
        }

        let line = self.find_owned(user_id, cart_item_id).await?;
        let product = self.catalog.get_product(line.product_id).await?;
        if input.quantity > product.stock_quantity {
            return Err(ServiceError::InsufficientStock(product.id));
        }

        let mut active: cart_item::ActiveModel = line.into();
        active.quantity = Set(input.quantity);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: Uuid, cart_item_id: Uuid) -> Result<(), ServiceError> {
        let line = self.find_owned(user_id, cart_item_id).await?;
        line.delete(&*self.db).await?;
        Ok(())
    }

    /// All of the caller's cart lines, oldest first.
    pub async fn get_cart(&self, user_id: Uuid) -> Result<Vec<CartItemModel>, ServiceError> {
        Ok(CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// The caller's cart lines in one store, as consumed by order placement.
    pub async fn get_cart_for_store(
        &self,
        user_id: Uuid,
        store_id: Uuid,
    ) -> Result<Vec<CartItemModel>, ServiceError> {
        Ok(CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::StoreId.eq(store_id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    async fn find_owned(
        &self,
        user_id: Uuid,
        cart_item_id: Uuid,
    ) -> Result<CartItemModel, ServiceError> {
        CartItem::find_by_id(cart_item_id)
            .filter(cart_item::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart item not found".to_string()))
    }
}

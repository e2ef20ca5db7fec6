//! Order placement, cancellation and status transitions.
//!
//! `place_order` is the one workflow with a hard consistency requirement:
//! order row, item snapshots, stock decrements and cart clearing commit as
//! one transaction. The stock check-and-decrement is a single conditional
//! UPDATE guarded by `stock_quantity >= quantity`, so two orders racing for
//! the last unit cannot both succeed and stock can never go negative.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::{
        cart_item, order, order_item, product, CartItem, Order, OrderItem, OrderItemModel,
        OrderModel, OrderStatus, Product,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::Pagination,
};

#[derive(Debug, Deserialize)]
pub struct PlaceOrderInput {
    pub store_id: Uuid,
    pub shipping_address: String,
    pub payment_method: String,
    pub shipping_cost: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusInput {
    pub status: OrderStatus,
}

/// Order plus its immutable item snapshots, as returned to clients.
#[derive(Debug, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Converts the caller's cart in one store into an order.
    ///
    /// Everything between the cart read and the cart clear runs inside one
    /// transaction. Any failure, including a stock shortfall on the last
    /// line, rolls the whole thing back: no order, no item rows, no stock
    /// movement, cart untouched.
    #[instrument(skip(self, input), fields(store_id = %input.store_id))]
    pub async fn place_order(
        &self,
        user_id: Uuid,
        input: PlaceOrderInput,
    ) -> Result<OrderWithItems, ServiceError> {
        if input.shipping_address.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "shipping_address must not be empty".to_string(),
            ));
        }
        if input.payment_method.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "payment_method must not be empty".to_string(),
            ));
        }
        if input.shipping_cost < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "shipping_cost must not be negative".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let lines = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::StoreId.eq(input.store_id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(&txn)
            .await?;
        if lines.is_empty() {
            return Err(ServiceError::EmptyCart);
        }

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let mut total = input.shipping_cost;
        let mut item_models = Vec::with_capacity(lines.len());

        for line in &lines {
            let prod = Product::find_by_id(line.product_id)
                .one(&txn)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

            // Conditional decrement; zero rows affected means another order
            // got there first or stock was already short.
            let decrement = Product::update_many()
                .col_expr(
                    product::Column::StockQuantity,
                    Expr::col(product::Column::StockQuantity).sub(line.quantity),
                )
                .col_expr(product::Column::UpdatedAt, Expr::value(now))
                .filter(product::Column::Id.eq(line.product_id))
                .filter(product::Column::StockQuantity.gte(line.quantity))
                .exec(&txn)
                .await?;
            if decrement.rows_affected != 1 {
                return Err(ServiceError::InsufficientStock(line.product_id));
            }

            total += prod.price * Decimal::from(line.quantity);
            item_models.push(order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(line.product_id),
                quantity: Set(line.quantity),
                // Live price captured here; never recomputed afterwards.
                unit_price: Set(prod.price),
                attribute_selection: Set(line.attribute_selection.clone()),
                created_at: Set(now),
            });
        }

        let order_model = order::ActiveModel {
            id: Set(order_id),
            store_id: Set(input.store_id),
            user_id: Set(user_id),
            status: Set(OrderStatus::Pending),
            total_amount: Set(total),
            shipping_cost: Set(input.shipping_cost),
            shipping_address: Set(input.shipping_address),
            payment_method: Set(input.payment_method),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = order_model.insert(&txn).await?;
        OrderItem::insert_many(item_models).exec(&txn).await?;

        CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::StoreId.eq(input.store_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderPlaced {
                order_id,
                user_id,
                store_id: created.store_id,
                total_amount: created.total_amount,
            })
            .await;
        info!(order_id = %order_id, total = %created.total_amount, "order placed");

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?;
        Ok(OrderWithItems {
            order: created,
            items,
        })
    }

    /// Cancels one of the caller's orders, restoring each item's quantity
    /// onto its product. Only legal while the order is still cancellable;
    /// the restore and the status flip commit together.
    #[instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderModel, ServiceError> {
        let txn = self.db.begin().await?;

        let existing = Order::find_by_id(order_id)
            .filter(order::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        if !existing.status.is_cancellable() {
            return Err(ServiceError::InvalidTransition {
                from: existing.status.to_string(),
                to: OrderStatus::Cancelled.to_string(),
            });
        }

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?;
        let now = Utc::now();
        for item in &items {
            Product::update_many()
                .col_expr(
                    product::Column::StockQuantity,
                    Expr::col(product::Column::StockQuantity).add(item.quantity),
                )
                .col_expr(product::Column::UpdatedAt, Expr::value(now))
                .filter(product::Column::Id.eq(item.product_id))
                .exec(&txn)
                .await?;
        }

        let old_status = existing.status;
        let mut active: order::ActiveModel = existing.into();
        active.status = Set(OrderStatus::Cancelled);
        active.updated_at = Set(now);
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCancelled(order_id))
            .await;
        info!(order_id = %order_id, from = %old_status, "order cancelled");
        Ok(updated)
    }

    /// Admin-side status advance, validated against the transition table.
    /// Moving to `cancelled` goes through the stock-restoring path.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        input: UpdateStatusInput,
    ) -> Result<OrderModel, ServiceError> {
        let existing = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        if input.status == OrderStatus::Cancelled {
            return self.cancel_order(existing.user_id, order_id).await;
        }

        let old_status = existing.status;
        if !old_status.can_transition_to(input.status) {
            return Err(ServiceError::InvalidTransition {
                from: old_status.to_string(),
                to: input.status.to_string(),
            });
        }

        let mut active: order::ActiveModel = existing.into();
        active.status = Set(input.status);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status: updated.status,
            })
            .await;
        Ok(updated)
    }

    /// One of the caller's orders with its items. Another user's order reads
    /// as absent.
    pub async fn get_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderWithItems, ServiceError> {
        let order = Order::find_by_id(order_id)
            .filter(order::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;
        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?;
        Ok(OrderWithItems { order, items })
    }

    pub async fn list_orders(
        &self,
        user_id: Uuid,
        page: Pagination,
    ) -> Result<(Vec<OrderModel>, u64), ServiceError> {
        let page = page.normalize();
        let paginator = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, page.per_page);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.page - 1).await?;
        Ok((orders, total))
    }

    /// All orders in a store, for the admin side.
    pub async fn list_store_orders(
        &self,
        store_id: Uuid,
        page: Pagination,
    ) -> Result<(Vec<OrderModel>, u64), ServiceError> {
        let page = page.normalize();
        let paginator = Order::find()
            .filter(order::Column::StoreId.eq(store_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, page.per_page);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.page - 1).await?;
        Ok((orders, total))
    }
}

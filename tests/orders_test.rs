//! Order workflow: placement atomicity, stock movement, snapshots,
//! cancellation and the status machine.

mod common;

use rust_decimal_macros::dec;
use uuid::Uuid;

use common::{insert_product, insert_store, insert_user, setup};
use storefront_api::{
    entities::{OrderStatus, UserRole},
    errors::ServiceError,
    models::AttributeSelection,
    services::{
        cart::AddItemInput,
        catalog::UpdateProductInput,
        orders::{PlaceOrderInput, UpdateStatusInput},
    },
};

fn add_input(product_id: Uuid, quantity: i32) -> AddItemInput {
    AddItemInput {
        product_id,
        quantity,
        attributes: AttributeSelection::new(),
    }
}

fn place_input(store_id: Uuid) -> PlaceOrderInput {
    PlaceOrderInput {
        store_id,
        shipping_address: "1 Main St".to_string(),
        payment_method: "card".to_string(),
        shipping_cost: dec!(3),
    }
}

#[tokio::test]
async fn placing_an_order_totals_items_plus_shipping_and_clears_the_cart() {
    let ctx = setup().await;
    let user = insert_user(&ctx.db, UserRole::Customer).await;
    let store = insert_store(&ctx.db, user.id).await;
    let product_a = insert_product(&ctx.db, store.id, dec!(10), 10).await;
    let product_b = insert_product(&ctx.db, store.id, dec!(5), 5).await;

    ctx.cart.add_item(user.id, add_input(product_a.id, 2)).await.unwrap();
    ctx.cart.add_item(user.id, add_input(product_b.id, 1)).await.unwrap();

    let placed = ctx.orders.place_order(user.id, place_input(store.id)).await.unwrap();

    // 2 x 10 + 1 x 5 + 3 shipping
    assert_eq!(placed.order.total_amount, dec!(28));
    assert_eq!(placed.order.status, OrderStatus::Pending);
    assert_eq!(placed.items.len(), 2);

    let a = ctx.catalog.get_product(product_a.id).await.unwrap();
    let b = ctx.catalog.get_product(product_b.id).await.unwrap();
    assert_eq!(a.stock_quantity, 8);
    assert_eq!(b.stock_quantity, 4);

    assert!(ctx.cart.get_cart(user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn over_stock_order_fails_entirely_and_leaves_everything_untouched() {
    let ctx = setup().await;
    let user = insert_user(&ctx.db, UserRole::Customer).await;
    let store = insert_store(&ctx.db, user.id).await;
    let plenty = insert_product(&ctx.db, store.id, dec!(10), 10).await;
    let scarce = insert_product(&ctx.db, store.id, dec!(5), 5).await;

    ctx.cart.add_item(user.id, add_input(plenty.id, 2)).await.unwrap();
    ctx.cart.add_item(user.id, add_input(scarce.id, 5)).await.unwrap();

    // Stock drops under the cart line after it was added.
    ctx.catalog
        .update_product(
            scarce.id,
            UpdateProductInput {
                category_id: None,
                name: None,
                description: None,
                price: None,
                stock_quantity: Some(3),
            },
        )
        .await
        .unwrap();

    let err = ctx.orders.place_order(user.id, place_input(store.id)).await.unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(id) if id == scarce.id));

    // Whole transaction rolled back: no stock moved, cart intact, no order.
    assert_eq!(ctx.catalog.get_product(plenty.id).await.unwrap().stock_quantity, 10);
    assert_eq!(ctx.catalog.get_product(scarce.id).await.unwrap().stock_quantity, 3);
    assert_eq!(ctx.cart.get_cart(user.id).await.unwrap().len(), 2);
    let (orders, total) = ctx.orders.list_orders(user.id, Default::default()).await.unwrap();
    assert!(orders.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn cancel_restores_stock_exactly() {
    let ctx = setup().await;
    let user = insert_user(&ctx.db, UserRole::Customer).await;
    let store = insert_store(&ctx.db, user.id).await;
    let product = insert_product(&ctx.db, store.id, dec!(7), 9).await;

    ctx.cart.add_item(user.id, add_input(product.id, 4)).await.unwrap();
    let placed = ctx.orders.place_order(user.id, place_input(store.id)).await.unwrap();
    assert_eq!(ctx.catalog.get_product(product.id).await.unwrap().stock_quantity, 5);

    let cancelled = ctx.orders.cancel_order(user.id, placed.order.id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(ctx.catalog.get_product(product.id).await.unwrap().stock_quantity, 9);
}

#[tokio::test]
async fn item_price_snapshot_survives_later_price_changes() {
    let ctx = setup().await;
    let user = insert_user(&ctx.db, UserRole::Customer).await;
    let store = insert_store(&ctx.db, user.id).await;
    let product = insert_product(&ctx.db, store.id, dec!(10), 10).await;

    ctx.cart.add_item(user.id, add_input(product.id, 1)).await.unwrap();
    let placed = ctx.orders.place_order(user.id, place_input(store.id)).await.unwrap();

    ctx.catalog
        .update_product(
            product.id,
            UpdateProductInput {
                category_id: None,
                name: None,
                description: None,
                price: Some(dec!(99)),
                stock_quantity: None,
            },
        )
        .await
        .unwrap();

    let refetched = ctx.orders.get_order(user.id, placed.order.id).await.unwrap();
    assert_eq!(refetched.items[0].unit_price, dec!(10));
    assert_eq!(refetched.order.total_amount, placed.order.total_amount);
}

#[tokio::test]
async fn empty_cart_cannot_be_ordered() {
    let ctx = setup().await;
    let user = insert_user(&ctx.db, UserRole::Customer).await;
    let store = insert_store(&ctx.db, user.id).await;

    let err = ctx.orders.place_order(user.id, place_input(store.id)).await.unwrap_err();
    assert!(matches!(err, ServiceError::EmptyCart));
}

#[tokio::test]
async fn delivered_orders_cannot_be_cancelled() {
    let ctx = setup().await;
    let user = insert_user(&ctx.db, UserRole::Customer).await;
    let store = insert_store(&ctx.db, user.id).await;
    let product = insert_product(&ctx.db, store.id, dec!(10), 10).await;

    ctx.cart.add_item(user.id, add_input(product.id, 1)).await.unwrap();
    let placed = ctx.orders.place_order(user.id, place_input(store.id)).await.unwrap();
    let order_id = placed.order.id;

    for status in [
        OrderStatus::Paid,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ] {
        ctx.orders
            .update_status(order_id, UpdateStatusInput { status })
            .await
            .unwrap();
    }

    let err = ctx.orders.cancel_order(user.id, order_id).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition { .. }));
    // Stock stays decremented.
    assert_eq!(ctx.catalog.get_product(product.id).await.unwrap().stock_quantity, 9);
}

#[tokio::test]
async fn status_cannot_skip_ahead() {
    let ctx = setup().await;
    let user = insert_user(&ctx.db, UserRole::Customer).await;
    let store = insert_store(&ctx.db, user.id).await;
    let product = insert_product(&ctx.db, store.id, dec!(10), 10).await;

    ctx.cart.add_item(user.id, add_input(product.id, 1)).await.unwrap();
    let placed = ctx.orders.place_order(user.id, place_input(store.id)).await.unwrap();

    let err = ctx
        .orders
        .update_status(placed.order.id, UpdateStatusInput { status: OrderStatus::Shipped })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition { .. }));
}

#[tokio::test]
async fn another_users_order_reads_as_absent() {
    let ctx = setup().await;
    let owner = insert_user(&ctx.db, UserRole::Customer).await;
    let other = insert_user(&ctx.db, UserRole::Customer).await;
    let store = insert_store(&ctx.db, owner.id).await;
    let product = insert_product(&ctx.db, store.id, dec!(10), 10).await;

    ctx.cart.add_item(owner.id, add_input(product.id, 1)).await.unwrap();
    let placed = ctx.orders.place_order(owner.id, place_input(store.id)).await.unwrap();

    let err = ctx.orders.get_order(other.id, placed.order.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    let err = ctx.orders.cancel_order(other.id, placed.order.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn racing_orders_for_the_last_unit_cannot_both_succeed() {
    let ctx = setup().await;
    let first = insert_user(&ctx.db, UserRole::Customer).await;
    let second = insert_user(&ctx.db, UserRole::Customer).await;
    let store = insert_store(&ctx.db, first.id).await;
    let product = insert_product(&ctx.db, store.id, dec!(10), 1).await;

    ctx.cart.add_item(first.id, add_input(product.id, 1)).await.unwrap();
    ctx.cart.add_item(second.id, add_input(product.id, 1)).await.unwrap();

    let (a, b) = tokio::join!(
        ctx.orders.place_order(first.id, place_input(store.id)),
        ctx.orders.place_order(second.id, place_input(store.id)),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|&&ok| ok).count();
    assert_eq!(successes, 1);
    let stock = ctx.catalog.get_product(product.id).await.unwrap().stock_quantity;
    assert_eq!(stock, 0);
}

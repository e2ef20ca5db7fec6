//! Cart semantics: line merging by attribute selection, stock ceiling,
//! ownership scoping.

mod common;

use rust_decimal_macros::dec;
use uuid::Uuid;

use common::{insert_product, insert_store, insert_user, setup};
use storefront_api::{
    entities::UserRole,
    errors::ServiceError,
    models::AttributeSelection,
    services::cart::{AddItemInput, UpdateQuantityInput},
};

fn selection(pairs: &[(Uuid, Uuid)]) -> AttributeSelection {
    pairs.iter().copied().collect()
}

#[tokio::test]
async fn repeat_adds_merge_into_one_line() {
    let ctx = setup().await;
    let user = insert_user(&ctx.db, UserRole::Customer).await;
    let store = insert_store(&ctx.db, user.id).await;
    let product = insert_product(&ctx.db, store.id, dec!(10), 10).await;

    let attr = Uuid::new_v4();
    let option = Uuid::new_v4();

    ctx.cart
        .add_item(
            user.id,
            AddItemInput {
                product_id: product.id,
                quantity: 2,
                attributes: selection(&[(attr, option)]),
            },
        )
        .await
        .unwrap();
    ctx.cart
        .add_item(
            user.id,
            AddItemInput {
                product_id: product.id,
                quantity: 3,
                attributes: selection(&[(attr, option)]),
            },
        )
        .await
        .unwrap();

    let cart = ctx.cart.get_cart(user.id).await.unwrap();
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0].quantity, 5);
}

#[tokio::test]
async fn different_attribute_selections_stay_separate_lines() {
    let ctx = setup().await;
    let user = insert_user(&ctx.db, UserRole::Customer).await;
    let store = insert_store(&ctx.db, user.id).await;
    let product = insert_product(&ctx.db, store.id, dec!(10), 10).await;

    let attr = Uuid::new_v4();

    for _ in 0..2 {
        // Same attribute, different chosen option each time.
        ctx.cart
            .add_item(
                user.id,
                AddItemInput {
                    product_id: product.id,
                    quantity: 1,
                    attributes: selection(&[(attr, Uuid::new_v4())]),
                },
            )
            .await
            .unwrap();
    }

    assert_eq!(ctx.cart.get_cart(user.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn merged_quantity_is_capped_by_stock() {
    let ctx = setup().await;
    let user = insert_user(&ctx.db, UserRole::Customer).await;
    let store = insert_store(&ctx.db, user.id).await;
    let product = insert_product(&ctx.db, store.id, dec!(10), 4).await;

    ctx.cart
        .add_item(
            user.id,
            AddItemInput {
                product_id: product.id,
                quantity: 3,
                attributes: AttributeSelection::new(),
            },
        )
        .await
        .unwrap();

    let err = ctx
        .cart
        .add_item(
            user.id,
            AddItemInput {
                product_id: product.id,
                quantity: 2,
                attributes: AttributeSelection::new(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(id) if id == product.id));

    // The existing line is unchanged.
    let cart = ctx.cart.get_cart(user.id).await.unwrap();
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0].quantity, 3);
}

#[tokio::test]
async fn quantity_update_and_removal() {
    let ctx = setup().await;
    let user = insert_user(&ctx.db, UserRole::Customer).await;
    let store = insert_store(&ctx.db, user.id).await;
    let product = insert_product(&ctx.db, store.id, dec!(10), 10).await;

    let line = ctx
        .cart
        .add_item(
            user.id,
            AddItemInput {
                product_id: product.id,
                quantity: 1,
                attributes: AttributeSelection::new(),
            },
        )
        .await
        .unwrap();

    let updated = ctx
        .cart
        .update_quantity(user.id, line.id, UpdateQuantityInput { quantity: 7 })
        .await
        .unwrap();
    assert_eq!(updated.quantity, 7);

    let err = ctx
        .cart
        .update_quantity(user.id, line.id, UpdateQuantityInput { quantity: 11 })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    ctx.cart.remove_item(user.id, line.id).await.unwrap();
    assert!(ctx.cart.get_cart(user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn another_users_cart_line_reads_as_absent() {
    let ctx = setup().await;
    let owner = insert_user(&ctx.db, UserRole::Customer).await;
    let other = insert_user(&ctx.db, UserRole::Customer).await;
    let store = insert_store(&ctx.db, owner.id).await;
    let product = insert_product(&ctx.db, store.id, dec!(10), 10).await;

    let line = ctx
        .cart
        .add_item(
            owner.id,
            AddItemInput {
                product_id: product.id,
                quantity: 1,
                attributes: AttributeSelection::new(),
            },
        )
        .await
        .unwrap();

    let err = ctx
        .cart
        .update_quantity(other.id, line.id, UpdateQuantityInput { quantity: 2 })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    let err = ctx.cart.remove_item(other.id, line.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn concurrent_identical_adds_merge_into_one_line() {
    let ctx = setup().await;
    let user = insert_user(&ctx.db, UserRole::Customer).await;
    let store = insert_store(&ctx.db, user.id).await;
    let product = insert_product(&ctx.db, store.id, dec!(10), 10).await;

    let input = || AddItemInput {
        product_id: product.id,
        quantity: 2,
        attributes: AttributeSelection::new(),
    };
    let (a, b) = tokio::join!(
        ctx.cart.add_item(user.id, input()),
        ctx.cart.add_item(user.id, input()),
    );
    a.unwrap();
    b.unwrap();

    let cart = ctx.cart.get_cart(user.id).await.unwrap();
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0].quantity, 4);
}

#[tokio::test]
async fn zero_quantity_is_rejected() {
    let ctx = setup().await;
    let user = insert_user(&ctx.db, UserRole::Customer).await;
    let store = insert_store(&ctx.db, user.id).await;
    let product = insert_product(&ctx.db, store.id, dec!(10), 10).await;

    let err = ctx
        .cart
        .add_item(
            user.id,
            AddItemInput {
                product_id: product.id,
                quantity: 0,
                attributes: AttributeSelection::new(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

//! Catalog invariants: price/stock validation, store scoping, view counter.

mod common;

use rust_decimal_macros::dec;

use common::{insert_product, insert_store, insert_user, setup};
use storefront_api::{
    entities::UserRole,
    errors::ServiceError,
    services::{
        catalog::{CreateCategoryInput, CreateProductInput, UpdateProductInput},
        Pagination,
    },
};

#[tokio::test]
async fn product_price_and_stock_are_validated() {
    let ctx = setup().await;
    let admin = insert_user(&ctx.db, UserRole::Admin).await;
    let store = insert_store(&ctx.db, admin.id).await;

    let base = |price, stock| CreateProductInput {
        store_id: store.id,
        category_id: None,
        name: "Widget".to_string(),
        description: "A widget".to_string(),
        price,
        stock_quantity: stock,
    };

    let err = ctx.catalog.create_product(base(dec!(0), 1)).await.unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
    let err = ctx.catalog.create_product(base(dec!(10), -1)).await.unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let product = ctx.catalog.create_product(base(dec!(10), 0)).await.unwrap();
    let err = ctx
        .catalog
        .update_product(
            product.id,
            UpdateProductInput {
                category_id: None,
                name: None,
                description: None,
                price: Some(dec!(-5)),
                stock_quantity: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn prices_keep_full_precision_through_storage() {
    let ctx = setup().await;
    let admin = insert_user(&ctx.db, UserRole::Admin).await;
    let store = insert_store(&ctx.db, admin.id).await;

    // Widest value the money columns hold: 12 integer + 4 fractional digits.
    let price = dec!(999999999999.9999);
    let product = ctx
        .catalog
        .create_product(CreateProductInput {
            store_id: store.id,
            category_id: None,
            name: "Bullion".to_string(),
            description: "Priced to the limit".to_string(),
            price,
            stock_quantity: 1,
        })
        .await
        .unwrap();

    let refetched = ctx.catalog.get_product(product.id).await.unwrap();
    assert_eq!(refetched.price, price);
}

#[tokio::test]
async fn category_must_belong_to_the_products_store() {
    let ctx = setup().await;
    let admin = insert_user(&ctx.db, UserRole::Admin).await;
    let store = insert_store(&ctx.db, admin.id).await;
    let other_store = insert_store(&ctx.db, admin.id).await;

    let category = ctx
        .catalog
        .create_category(CreateCategoryInput {
            store_id: other_store.id,
            name: "Gadgets".to_string(),
            description: None,
        })
        .await
        .unwrap();

    let err = ctx
        .catalog
        .create_product(CreateProductInput {
            store_id: store.id,
            category_id: Some(category.id),
            name: "Widget".to_string(),
            description: "A widget".to_string(),
            price: dec!(10),
            stock_quantity: 1,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn view_counter_increments_per_view() {
    let ctx = setup().await;
    let admin = insert_user(&ctx.db, UserRole::Admin).await;
    let store = insert_store(&ctx.db, admin.id).await;
    let product = insert_product(&ctx.db, store.id, dec!(10), 1).await;

    for _ in 0..3 {
        ctx.catalog.record_view(product.id).await;
    }
    assert_eq!(ctx.catalog.get_product(product.id).await.unwrap().seen_count, 3);

    // Unknown product: still no error.
    ctx.catalog.record_view(uuid::Uuid::new_v4()).await;
}

#[tokio::test]
async fn listing_is_scoped_to_the_store_and_paginated() {
    let ctx = setup().await;
    let admin = insert_user(&ctx.db, UserRole::Admin).await;
    let store = insert_store(&ctx.db, admin.id).await;
    let other_store = insert_store(&ctx.db, admin.id).await;

    for _ in 0..3 {
        insert_product(&ctx.db, store.id, dec!(10), 1).await;
    }
    insert_product(&ctx.db, other_store.id, dec!(10), 1).await;

    let (products, total) = ctx
        .catalog
        .list_products(
            store.id,
            Default::default(),
            Pagination { page: 1, per_page: 2 },
        )
        .await
        .unwrap();
    assert_eq!(total, 3);
    assert_eq!(products.len(), 2);
}

#[tokio::test]
async fn deleted_product_reads_as_absent() {
    let ctx = setup().await;
    let admin = insert_user(&ctx.db, UserRole::Admin).await;
    let store = insert_store(&ctx.db, admin.id).await;
    let product = insert_product(&ctx.db, store.id, dec!(10), 1).await;

    ctx.catalog.delete_product(product.id).await.unwrap();
    let err = ctx.catalog.get_product(product.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    let err = ctx.catalog.delete_product(product.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

//! Shared fixture for the integration tests: an in-memory SQLite database
//! with the full schema applied, plus ready-to-use services.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use tokio::sync::mpsc;
use uuid::Uuid;

use storefront_api::{
    auth::{AuthConfig, AuthService},
    entities::{product, store, user, ProductModel, StoreModel, UserModel, UserRole},
    events::{Event, EventSender},
    migrator::Migrator,
    services::{CartService, CatalogService, OfferService, OrderService, ReviewService},
};

pub struct TestCtx {
    pub db: Arc<DatabaseConnection>,
    pub catalog: CatalogService,
    pub cart: CartService,
    pub orders: OrderService,
    pub offers: OfferService,
    pub reviews: ReviewService,
    pub auth: AuthService,
    /// Receiver end of the event channel, for asserting on emitted events.
    pub events: mpsc::Receiver<Event>,
}

pub async fn setup() -> TestCtx {
    // A single connection keeps every query on the same in-memory database.
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options
        .max_connections(1)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(5))
        .sqlx_logging(false);
    let db = Arc::new(
        Database::connect(options)
            .await
            .expect("in-memory database should connect"),
    );
    Migrator::up(&*db, None)
        .await
        .expect("migrations should apply");

    let (tx, events) = mpsc::channel(64);
    let event_sender = EventSender::new(tx);

    let catalog = CatalogService::new(db.clone());
    let cart = CartService::new(db.clone(), catalog.clone(), event_sender.clone());
    let orders = OrderService::new(db.clone(), event_sender.clone());
    let offers = OfferService::new(db.clone());
    let reviews = ReviewService::new(db.clone(), event_sender.clone());
    let auth = AuthService::new(
        AuthConfig::new(
            "integration_test_secret_key_long_enough_for_validation".to_string(),
            Duration::from_secs(3600),
            Duration::from_secs(300),
        ),
        db.clone(),
        event_sender,
    );

    TestCtx {
        db,
        catalog,
        cart,
        orders,
        offers,
        reviews,
        auth,
        events,
    }
}

pub async fn insert_user(db: &DatabaseConnection, role: UserRole) -> UserModel {
    let now = Utc::now();
    user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(format!("{}@example.com", Uuid::new_v4())),
        password_hash: Set(String::new()),
        role: Set(role),
        otp_hash: Set(None),
        otp_expires_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("user insert")
}

pub async fn insert_store(db: &DatabaseConnection, owner_id: Uuid) -> StoreModel {
    let now = Utc::now();
    store::ActiveModel {
        id: Set(Uuid::new_v4()),
        owner_id: Set(owner_id),
        name: Set("Test Store".to_string()),
        description: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("store insert")
}

pub async fn insert_product(
    db: &DatabaseConnection,
    store_id: Uuid,
    price: Decimal,
    stock: i32,
) -> ProductModel {
    let now = Utc::now();
    product::ActiveModel {
        id: Set(Uuid::new_v4()),
        store_id: Set(store_id),
        category_id: Set(None),
        name: Set("Widget".to_string()),
        description: Set("A widget".to_string()),
        price: Set(price),
        stock_quantity: Set(stock),
        seen_count: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("product insert")
}

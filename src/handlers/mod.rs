//! HTTP handlers and route composition.
//!
//! Three surfaces share one [`AppState`]: public catalog reads, the
//! authenticated customer surface (cart, orders, reviews), and the
//! admin surface under `/admin` for store management. Authentication and
//! the admin role gate are middleware; handlers only see an already
//! verified [`crate::auth::AuthUser`].

pub mod carts;
pub mod categories;
pub mod common;
pub mod offers;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod stores;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Extension, Router,
};
use std::sync::Arc;

use crate::{
    auth::{auth_middleware, require_admin, auth_routes, AuthService},
    services::{CartService, CatalogService, OfferService, OrderService, ReviewService},
};

/// Shared handler state: one clone-able bundle of services.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<sea_orm::DatabaseConnection>,
    pub catalog: CatalogService,
    pub cart: CartService,
    pub orders: OrderService,
    pub offers: OfferService,
    pub reviews: ReviewService,
    pub auth: Arc<AuthService>,
}

/// Everything mounted under `/api/v1`.
pub fn api_routes(state: AppState) -> Router {
    let public = Router::new()
        .route("/stores", get(stores::list_stores))
        .route("/stores/:id", get(stores::get_store))
        .route("/stores/:id/categories", get(categories::list_categories))
        .route("/stores/:id/products", get(products::list_products))
        .route("/stores/:id/offers", get(offers::list_offers))
        .route("/products/:id", get(products::get_product))
        .route("/products/:id/reviews", get(reviews::list_reviews))
        .route("/products/:id/rating", get(reviews::rating_summary))
        .route("/offers/:id", get(offers::get_offer));

    let customer = Router::new()
        .route("/cart", get(carts::get_cart))
        .route("/cart/items", post(carts::add_item))
        .route("/cart/items/:id", patch(carts::update_quantity))
        .route("/cart/items/:id", delete(carts::remove_item))
        .route("/orders", post(orders::place_order))
        .route("/orders", get(orders::list_orders))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/cancel", post(orders::cancel_order))
        .route("/reviews", post(reviews::create_review))
        .route("/reviews/:id", delete(reviews::delete_review))
        .layer(middleware::from_fn(auth_middleware))
        .layer(Extension(state.auth.clone()));

    let admin = Router::new()
        .route("/stores", post(stores::create_store))
        .route("/stores/:id", patch(stores::update_store))
        .route("/stores/:id", delete(stores::delete_store))
        .route("/stores/:id/orders", get(orders::list_store_orders))
        .route("/categories", post(categories::create_category))
        .route("/categories/:id", patch(categories::update_category))
        .route("/categories/:id", delete(categories::delete_category))
        .route("/products", post(products::create_product))
        .route("/products/:id", patch(products::update_product))
        .route("/products/:id", delete(products::delete_product))
        .route("/offers", post(offers::create_offer))
        .route("/offers/:id", patch(offers::update_offer))
        .route("/offers/:id", delete(offers::delete_offer))
        .route("/orders/:id/status", patch(orders::update_status))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn(auth_middleware))
        .layer(Extension(state.auth.clone()));

    Router::new()
        .merge(public)
        .nest("/admin", admin)
        .merge(customer)
        .nest_service("/auth", auth_routes().with_state(state.auth.clone()))
        .with_state(state)
}

/// Convenience constructor wiring every service off one connection and
/// event channel.
pub fn build_state(
    db: Arc<sea_orm::DatabaseConnection>,
    auth: Arc<AuthService>,
    event_sender: crate::events::EventSender,
) -> AppState {
    let catalog = CatalogService::new(db.clone());
    AppState {
        cart: CartService::new(db.clone(), catalog.clone(), event_sender.clone()),
        orders: OrderService::new(db.clone(), event_sender.clone()),
        offers: OfferService::new(db.clone()),
        reviews: ReviewService::new(db.clone(), event_sender),
        db,
        catalog,
        auth,
    }
}

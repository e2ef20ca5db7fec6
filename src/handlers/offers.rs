//! Offer endpoints. Reads are public; mutations are admin-only.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    handlers::{common, AppState},
    services::offers::{CreateOfferInput, UpdateOfferInput},
};

#[derive(Debug, Default, Deserialize)]
pub struct OfferListQuery {
    #[serde(default)]
    pub active: bool,
}

pub async fn list_offers(
    State(state): State<AppState>,
    Path(store_id): Path<Uuid>,
    Query(query): Query<OfferListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let offers = state.offers.list_offers(store_id, query.active).await?;
    Ok(common::success(offers))
}

pub async fn get_offer(
    State(state): State<AppState>,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let offer = state.offers.get_offer(offer_id).await?;
    Ok(common::success(offer))
}

pub async fn create_offer(
    State(state): State<AppState>,
    Json(input): Json<CreateOfferInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let offer = state.offers.create_offer(input).await?;
    Ok(common::created(offer))
}

pub async fn update_offer(
    State(state): State<AppState>,
    Path(offer_id): Path<Uuid>,
    Json(input): Json<UpdateOfferInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let offer = state.offers.update_offer(offer_id, input).await?;
    Ok(common::success(offer))
}

pub async fn delete_offer(
    State(state): State<AppState>,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.offers.delete_offer(offer_id).await?;
    Ok(common::success_message("Offer deleted"))
}

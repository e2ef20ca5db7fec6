//! Offer management and offer-product association reconciliation.
//!
//! An offer's product list is maintained by set difference: compute what
//! the target set adds and removes against the stored associations, and
//! apply only the difference. A target product outside the offer's store
//! rejects the whole update; associations are never partially applied.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::{
        offer, offer_product, product, Offer, OfferModel, OfferProduct, Product, Store,
    },
    errors::ServiceError,
};

#[derive(Debug, Deserialize)]
pub struct CreateOfferInput {
    pub store_id: Uuid,
    pub name: String,
    pub discount_percent: Decimal,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub product_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOfferInput {
    pub name: Option<String>,
    pub discount_percent: Option<Decimal>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    /// Full target set; when present, associations are reconciled to it.
    pub product_ids: Option<Vec<Uuid>>,
}

/// Offer plus its associated product ids and current activity.
#[derive(Debug, Serialize)]
pub struct OfferWithProducts {
    #[serde(flatten)]
    pub offer: OfferModel,
    pub product_ids: Vec<Uuid>,
    pub active: bool,
}

fn check_discount(percent: Decimal) -> Result<(), ServiceError> {
    if percent <= Decimal::ZERO || percent > Decimal::from(100) {
        return Err(ServiceError::ValidationError(
            "discount_percent must be in (0, 100]".to_string(),
        ));
    }
    Ok(())
}

fn check_window(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Result<(), ServiceError> {
    if ends_at < starts_at {
        return Err(ServiceError::ValidationError(
            "ends_at must not precede starts_at".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct OfferService {
    db: Arc<DatabaseConnection>,
}

impl OfferService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(store_id = %input.store_id))]
    pub async fn create_offer(
        &self,
        input: CreateOfferInput,
    ) -> Result<OfferWithProducts, ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "name must not be empty".to_string(),
            ));
        }
        check_discount(input.discount_percent)?;
        check_window(input.starts_at, input.ends_at)?;

        let txn = self.db.begin().await?;

        Store::find_by_id(input.store_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Store not found".to_string()))?;

        let target: BTreeSet<Uuid> = input.product_ids.into_iter().collect();
        Self::check_products_in_store(&txn, input.store_id, &target).await?;

        let now = Utc::now();
        let offer_id = Uuid::new_v4();
        let model = offer::ActiveModel {
            id: Set(offer_id),
            store_id: Set(input.store_id),
            name: Set(input.name),
            discount_percent: Set(input.discount_percent),
            starts_at: Set(input.starts_at),
            ends_at: Set(input.ends_at),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(&txn).await?;

        if !target.is_empty() {
            let rows: Vec<offer_product::ActiveModel> = target
                .iter()
                .map(|&product_id| offer_product::ActiveModel {
                    offer_id: Set(offer_id),
                    product_id: Set(product_id),
                })
                .collect();
            OfferProduct::insert_many(rows).exec(&txn).await?;
        }

        txn.commit().await?;
        info!(offer_id = %offer_id, products = target.len(), "offer created");
        Ok(OfferWithProducts {
            active: created.is_active_at(Utc::now()),
            offer: created,
            product_ids: target.into_iter().collect(),
        })
    }

    /// Updates offer fields and, when `product_ids` is present, reconciles
    /// the association set: inserts only the additions, deletes only the
    /// removals, all inside one transaction.
    #[instrument(skip(self, input))]
    pub async fn update_offer(
        &self,
        offer_id: Uuid,
        input: UpdateOfferInput,
    ) -> Result<OfferWithProducts, ServiceError> {
        if let Some(percent) = input.discount_percent {
            check_discount(percent)?;
        }

        let txn = self.db.begin().await?;

        let existing = Offer::find_by_id(offer_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Offer not found".to_string()))?;

        let starts_at = input.starts_at.unwrap_or(existing.starts_at);
        let ends_at = input.ends_at.unwrap_or(existing.ends_at);
        check_window(starts_at, ends_at)?;

        let store_id = existing.store_id;
        let mut active: offer::ActiveModel = existing.into();
        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "name must not be empty".to_string(),
                ));
            }
            active.name = Set(name);
        }
        if let Some(percent) = input.discount_percent {
            active.discount_percent = Set(percent);
        }
        active.starts_at = Set(starts_at);
        active.ends_at = Set(ends_at);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        let product_ids = if let Some(target) = input.product_ids {
            let target: BTreeSet<Uuid> = target.into_iter().collect();
            Self::check_products_in_store(&txn, store_id, &target).await?;

            let current: BTreeSet<Uuid> = OfferProduct::find()
                .filter(offer_product::Column::OfferId.eq(offer_id))
                .all(&txn)
                .await?
                .into_iter()
                .map(|row| row.product_id)
                .collect();

            let additions: Vec<offer_product::ActiveModel> = target
                .difference(&current)
                .map(|&product_id| offer_product::ActiveModel {
                    offer_id: Set(offer_id),
                    product_id: Set(product_id),
                })
                .collect();
            let removals: Vec<Uuid> = current.difference(&target).copied().collect();

            if !additions.is_empty() {
                OfferProduct::insert_many(additions).exec(&txn).await?;
            }
            if !removals.is_empty() {
                OfferProduct::delete_many()
                    .filter(offer_product::Column::OfferId.eq(offer_id))
                    .filter(offer_product::Column::ProductId.is_in(removals))
                    .exec(&txn)
                    .await?;
            }
            target.into_iter().collect()
        } else {
            OfferProduct::find()
                .filter(offer_product::Column::OfferId.eq(offer_id))
                .all(&txn)
                .await?
                .into_iter()
                .map(|row| row.product_id)
                .collect()
        };

        txn.commit().await?;
        Ok(OfferWithProducts {
            active: updated.is_active_at(Utc::now()),
            offer: updated,
            product_ids,
        })
    }

    pub async fn get_offer(&self, offer_id: Uuid) -> Result<OfferWithProducts, ServiceError> {
        let offer = Offer::find_by_id(offer_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Offer not found".to_string()))?;
        let product_ids = OfferProduct::find()
            .filter(offer_product::Column::OfferId.eq(offer_id))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|row| row.product_id)
            .collect();
        Ok(OfferWithProducts {
            active: offer.is_active_at(Utc::now()),
            offer,
            product_ids,
        })
    }

    /// Offers in a store; `active_only` narrows to those whose window
    /// contains the current instant.
    pub async fn list_offers(
        &self,
        store_id: Uuid,
        active_only: bool,
    ) -> Result<Vec<OfferWithProducts>, ServiceError> {
        let now = Utc::now();
        let mut query = Offer::find().filter(offer::Column::StoreId.eq(store_id));
        if active_only {
            query = query
                .filter(offer::Column::StartsAt.lte(now))
                .filter(offer::Column::EndsAt.gte(now));
        }
        let offers = query.order_by_asc(offer::Column::StartsAt).all(&*self.db).await?;

        let mut result = Vec::with_capacity(offers.len());
        for offer in offers {
            let product_ids = OfferProduct::find()
                .filter(offer_product::Column::OfferId.eq(offer.id))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|row| row.product_id)
                .collect();
            result.push(OfferWithProducts {
                active: offer.is_active_at(now),
                offer,
                product_ids,
            });
        }
        Ok(result)
    }

    #[instrument(skip(self))]
    pub async fn delete_offer(&self, offer_id: Uuid) -> Result<(), ServiceError> {
        let result = Offer::delete_by_id(offer_id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound("Offer not found".to_string()));
        }
        info!(offer_id = %offer_id, "offer deleted");
        Ok(())
    }

    /// Rejects the update when any target product is missing or belongs to
    /// a different store.
    async fn check_products_in_store(
        txn: &sea_orm::DatabaseTransaction,
        store_id: Uuid,
        target: &BTreeSet<Uuid>,
    ) -> Result<(), ServiceError> {
        if target.is_empty() {
            return Ok(());
        }
        let owned: BTreeSet<Uuid> = Product::find()
            .filter(product::Column::StoreId.eq(store_id))
            .filter(product::Column::Id.is_in(target.iter().copied()))
            .all(txn)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();
        if let Some(missing) = target.difference(&owned).next() {
            return Err(ServiceError::ValidationError(format!(
                "product {missing} does not belong to the offer's store"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn discount_bounds() {
        assert!(check_discount(dec!(0.5)).is_ok());
        assert!(check_discount(dec!(100)).is_ok());
        assert!(check_discount(Decimal::ZERO).is_err());
        assert!(check_discount(dec!(100.01)).is_err());
    }

    #[test]
    fn window_must_be_ordered() {
        let now = Utc::now();
        assert!(check_window(now, now).is_ok());
        assert!(check_window(now, now - chrono::Duration::seconds(1)).is_err());
    }
}

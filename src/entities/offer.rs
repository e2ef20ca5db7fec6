use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Time-bounded percentage discount applicable to a set of products.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "offers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub store_id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub discount_percent: Decimal,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// An offer is active iff `now` falls within [starts_at, ends_at].
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now && now <= self.ends_at
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::store::Entity",
        from = "Column::StoreId",
        to = "super::store::Column::Id"
    )]
    Store,
    #[sea_orm(has_many = "super::offer_product::Entity")]
    OfferProducts,
}

impl Related<super::store::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Store.def()
    }
}

impl Related<super::offer_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OfferProducts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn offer(starts: DateTime<Utc>, ends: DateTime<Utc>) -> Model {
        Model {
            id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            name: "Spring sale".to_string(),
            discount_percent: dec!(15.00),
            starts_at: starts,
            ends_at: ends,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn active_inside_window() {
        let now = Utc::now();
        let o = offer(now - Duration::days(1), now + Duration::days(1));
        assert!(o.is_active_at(now));
    }

    #[test]
    fn inactive_outside_window() {
        let now = Utc::now();
        let past = offer(now - Duration::days(10), now - Duration::days(5));
        let future = offer(now + Duration::days(5), now + Duration::days(10));
        assert!(!past.is_active_at(now));
        assert!(!future.is_active_at(now));
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let now = Utc::now();
        let o = offer(now, now + Duration::days(1));
        assert!(o.is_active_at(now));
        assert!(o.is_active_at(now + Duration::days(1)));
    }
}

//! Store, category and product management.
//!
//! Numeric invariants live here: `price > 0` and `stock_quantity >= 0` are
//! checked on every create and update. The view counter is bumped with an
//! atomic increment but carries no consistency guarantee.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        category, product, store, Category, CategoryModel, Product, ProductModel, Store,
        StoreModel,
    },
    errors::ServiceError,
    services::Pagination,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateStoreInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStoreInput {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryInput {
    pub store_id: Uuid,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryInput {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductInput {
    pub store_id: Uuid,
    pub category_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 5000))]
    pub description: String,
    pub price: Decimal,
    pub stock_quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductInput {
    pub category_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock_quantity: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    /// Case-insensitive substring match on the product name.
    pub search: Option<String>,
}

fn check_price(price: Decimal) -> Result<(), ServiceError> {
    if price <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "price must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn check_stock(stock: i32) -> Result<(), ServiceError> {
    if stock < 0 {
        return Err(ServiceError::ValidationError(
            "stock_quantity must not be negative".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    // Stores

    #[instrument(skip(self, input))]
    pub async fn create_store(
        &self,
        owner_id: Uuid,
        input: CreateStoreInput,
    ) -> Result<StoreModel, ServiceError> {
        input.validate()?;
        let now = Utc::now();
        let model = store::ActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(owner_id),
            name: Set(input.name),
            description: Set(input.description),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(&*self.db).await?;
        info!(store_id = %created.id, "store created");
        Ok(created)
    }

    pub async fn get_store(&self, store_id: Uuid) -> Result<StoreModel, ServiceError> {
        Store::find_by_id(store_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Store not found".to_string()))
    }

    pub async fn list_stores(&self, page: Pagination) -> Result<(Vec<StoreModel>, u64), ServiceError> {
        let page = page.normalize();
        let paginator = Store::find()
            .order_by_asc(store::Column::Name)
            .paginate(&*self.db, page.per_page);
        let total = paginator.num_items().await?;
        let stores = paginator.fetch_page(page.page - 1).await?;
        Ok((stores, total))
    }

    #[instrument(skip(self, input))]
    pub async fn update_store(
        &self,
        store_id: Uuid,
        input: UpdateStoreInput,
    ) -> Result<StoreModel, ServiceError> {
        input.validate()?;
        let existing = self.get_store(store_id).await?;
        let mut active: store::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    /// Deletes a store. Owned products, categories, offers and orders go
    /// with it via foreign-key cascade.
    #[instrument(skip(self))]
    pub async fn delete_store(&self, store_id: Uuid) -> Result<(), ServiceError> {
        let result = Store::delete_by_id(store_id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound("Store not found".to_string()));
        }
        info!(store_id = %store_id, "store deleted");
        Ok(())
    }

    // Categories

    #[instrument(skip(self, input))]
    pub async fn create_category(
        &self,
        input: CreateCategoryInput,
    ) -> Result<CategoryModel, ServiceError> {
        input.validate()?;
        // The owning store must exist before we attach anything to it.
        self.get_store(input.store_id).await?;

        let now = Utc::now();
        let model = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(input.store_id),
            name: Set(input.name),
            description: Set(input.description),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(model.insert(&*self.db).await?)
    }

    pub async fn get_category(&self, category_id: Uuid) -> Result<CategoryModel, ServiceError> {
        Category::find_by_id(category_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Category not found".to_string()))
    }

    pub async fn list_categories(&self, store_id: Uuid) -> Result<Vec<CategoryModel>, ServiceError> {
        Ok(Category::find()
            .filter(category::Column::StoreId.eq(store_id))
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self, input))]
    pub async fn update_category(
        &self,
        category_id: Uuid,
        input: UpdateCategoryInput,
    ) -> Result<CategoryModel, ServiceError> {
        input.validate()?;
        let existing = self.get_category(category_id).await?;
        let mut active: category::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    /// Deletes a category; products keep existing with `category_id` nulled
    /// by the foreign key.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, category_id: Uuid) -> Result<(), ServiceError> {
        let result = Category::delete_by_id(category_id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound("Category not found".to_string()));
        }
        Ok(())
    }

    // Products

    #[instrument(skip(self, input), fields(store_id = %input.store_id))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        input.validate()?;
        check_price(input.price)?;
        check_stock(input.stock_quantity)?;

        self.get_store(input.store_id).await?;
        if let Some(category_id) = input.category_id {
            let category = self.get_category(category_id).await?;
            if category.store_id != input.store_id {
                return Err(ServiceError::ValidationError(
                    "category belongs to a different store".to_string(),
                ));
            }
        }

        let now = Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(input.store_id),
            category_id: Set(input.category_id),
            name: Set(input.name),
            description: Set(input.description),
            price: Set(input.price),
            stock_quantity: Set(input.stock_quantity),
            seen_count: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(&*self.db).await?;
        info!(product_id = %created.id, "product created");
        Ok(created)
    }

    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductModel, ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))
    }

    pub async fn list_products(
        &self,
        store_id: Uuid,
        filter: ProductFilter,
        page: Pagination,
    ) -> Result<(Vec<ProductModel>, u64), ServiceError> {
        let page = page.normalize();
        let mut query = Product::find().filter(product::Column::StoreId.eq(store_id));
        if let Some(category_id) = filter.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(search) = filter.search.filter(|s| !s.is_empty()) {
            query = query.filter(product::Column::Name.contains(&search));
        }
        let paginator = query
            .order_by_asc(product::Column::Name)
            .paginate(&*self.db, page.per_page);
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.page - 1).await?;
        Ok((products, total))
    }

    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        input.validate()?;
        if let Some(price) = input.price {
            check_price(price)?;
        }
        if let Some(stock) = input.stock_quantity {
            check_stock(stock)?;
        }

        let existing = self.get_product(product_id).await?;
        if let Some(category_id) = input.category_id {
            let category = self.get_category(category_id).await?;
            if category.store_id != existing.store_id {
                return Err(ServiceError::ValidationError(
                    "category belongs to a different store".to_string(),
                ));
            }
        }

        let mut active: product::ActiveModel = existing.into();
        if let Some(category_id) = input.category_id {
            active.category_id = Set(Some(category_id));
        }
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(price) = input.price {
            active.price = Set(price);
        }
        if let Some(stock) = input.stock_quantity {
            active.stock_quantity = Set(stock);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let result = Product::delete_by_id(product_id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound("Product not found".to_string()));
        }
        info!(product_id = %product_id, "product deleted");
        Ok(())
    }

    /// Best-effort view counter. The increment is atomic at the database but
    /// a failure is only logged; a product page must never 500 because the
    /// counter write lost a race.
    pub async fn record_view(&self, product_id: Uuid) {
        let result = Product::update_many()
            .col_expr(
                product::Column::SeenCount,
                Expr::col(product::Column::SeenCount).add(1),
            )
            .filter(product::Column::Id.eq(product_id))
            .exec(&*self.db)
            .await;
        if let Err(e) = result {
            warn!(product_id = %product_id, error = %e, "view counter update failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn price_must_be_positive() {
        assert!(check_price(dec!(0.01)).is_ok());
        assert!(check_price(Decimal::ZERO).is_err());
        assert!(check_price(dec!(-1)).is_err());
    }

    #[test]
    fn stock_must_be_non_negative() {
        assert!(check_stock(0).is_ok());
        assert!(check_stock(5).is_ok());
        assert!(check_stock(-1).is_err());
    }
}

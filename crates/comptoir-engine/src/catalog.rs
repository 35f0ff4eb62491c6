//! # Product Catalog
//!
//! Validated product management for the POS grid. Catalog edits touch
//! name, category, prices, and promotion fields only; stock moves
//! exclusively through the [`crate::StockLedger`] so every change stays
//! audited.

use chrono::Utc;
use tracing::{info, instrument};

use comptoir_core::{validation, CoreError, Product};
use comptoir_db::repository::product::generate_product_id;
use comptoir_db::Database;

use crate::error::EngineResult;

/// Catalog fields accepted from the caller when creating or updating a
/// product. Stock is deliberately absent.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub category: String,
    pub price_cents: i64,
    pub promo_qty: Option<i64>,
    pub promo_price_cents: Option<i64>,
    pub image_path: Option<String>,
}

/// Product catalog operations.
#[derive(Clone)]
pub struct CatalogService {
    db: Database,
}

impl CatalogService {
    /// Creates a new catalog service.
    pub fn new(db: Database) -> Self {
        CatalogService { db }
    }

    /// Adds a product to the catalog with the given opening stock.
    ///
    /// The opening stock is set directly rather than through the ledger: a
    /// product that never existed has no history to audit yet.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        input: ProductInput,
        initial_stock: i64,
    ) -> EngineResult<Product> {
        validation::validate_product_name(&input.name).map_err(CoreError::from)?;
        if initial_stock < 0 {
            return Err(CoreError::InvalidQuantity {
                quantity: initial_stock,
            }
            .into());
        }

        let now = Utc::now();
        let product = Product {
            id: generate_product_id(),
            name: input.name.trim().to_string(),
            category: input.category,
            price_cents: input.price_cents,
            stock: initial_stock,
            promo_qty: input.promo_qty,
            promo_price_cents: input.promo_price_cents,
            image_path: input.image_path,
            created_at: now,
            updated_at: now,
        };
        self.db.products().insert(&product).await?;

        info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Updates a product's catalog fields. Stock is left untouched.
    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        product_id: &str,
        input: ProductInput,
    ) -> EngineResult<Product> {
        validation::validate_product_name(&input.name).map_err(CoreError::from)?;

        let mut product = self
            .db
            .products()
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        product.name = input.name.trim().to_string();
        product.category = input.category;
        product.price_cents = input.price_cents;
        product.promo_qty = input.promo_qty;
        product.promo_price_cents = input.promo_price_cents;
        product.image_path = input.image_path;
        product.updated_at = Utc::now();
        self.db.products().update(&product).await?;

        Ok(product)
    }

    /// Fetches a product by id.
    pub async fn get_product(&self, product_id: &str) -> EngineResult<Product> {
        Ok(self
            .db
            .products()
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?)
    }

    /// All products, grouped by category then name.
    pub async fn list_products(&self) -> EngineResult<Vec<Product>> {
        Ok(self.db.products().list().await?)
    }

    /// Products in one category, for the POS grid.
    pub async fn list_by_category(&self, category: &str) -> EngineResult<Vec<Product>> {
        Ok(self.db.products().list_by_category(category).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::db_with_products;
    use crate::EngineError;

    fn input(name: &str, category: &str, price_cents: i64) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            category: category.to_string(),
            price_cents,
            promo_qty: None,
            promo_price_cents: None,
            image_path: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_list_by_category() {
        let db = db_with_products(vec![]).await;
        let catalog = CatalogService::new(db);

        catalog
            .create_product(input("Thé à la menthe", "Boissons", 1000), 30)
            .await
            .unwrap();
        catalog
            .create_product(input("Tajine poulet", "Plats", 4500), 10)
            .await
            .unwrap();

        let drinks = catalog.list_by_category("Boissons").await.unwrap();
        assert_eq!(drinks.len(), 1);
        assert_eq!(drinks[0].name, "Thé à la menthe");
        assert_eq!(drinks[0].stock, 30);
        assert_eq!(catalog.list_products().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let db = db_with_products(vec![]).await;
        let catalog = CatalogService::new(db);

        let err = catalog
            .create_product(input("   ", "Plats", 1000), 0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_changes_catalog_fields_only() {
        let db = db_with_products(vec![]).await;
        let catalog = CatalogService::new(db.clone());

        let created = catalog
            .create_product(input("Brochettes", "Plats", 1000), 12)
            .await
            .unwrap();

        let mut changed = input("Brochettes d'agneau", "Plats", 1200);
        changed.promo_qty = Some(3);
        changed.promo_price_cents = Some(3000);
        let updated = catalog.update_product(&created.id, changed).await.unwrap();

        assert_eq!(updated.name, "Brochettes d'agneau");
        assert_eq!(updated.price_cents, 1200);
        assert_eq!(updated.promo_qty, Some(3));

        let stored = db.products().get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 12);
    }
}

//! # Product Repository
//!
//! Database operations for products, including the guarded stock updates
//! the stock ledger is built on.
//!
//! ## Guarded Stock Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Two terminals sell the last 3 portions at once:                    │
//! │                                                                     │
//! │  ❌ check-then-write: both read stock=3, both pass, stock = -2      │
//! │                                                                     │
//! │  ✅ compare-and-swap in one statement:                              │
//! │     UPDATE products SET stock = stock - ?2                          │
//! │     WHERE id = ?1 AND stock >= ?2                                   │
//! │                                                                     │
//! │  rows_affected = 0 means the stock check failed atomically; the     │
//! │  caller reports InsufficientStock and nothing was written.          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use comptoir_core::Product;

const PRODUCT_COLUMNS: &str = "id, name, category, price_cents, stock, \
     promo_qty, promo_price_cents, image_path, created_at, updated_at";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product inside an ongoing transaction.
    ///
    /// Used by the engine so price/promo/stock reads and the subsequent
    /// decrement observe the same transactional state.
    pub async fn get_in_tx(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(product)
    }

    /// Lists all products ordered by category, then name (the POS grid order).
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY category, name");
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Lists products in one category, ordered by name.
    pub async fn list_by_category(&self, category: &str) -> DbResult<Vec<Product>> {
        let sql =
            format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE category = ?1 ORDER BY name");
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(category)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Inserts a new product.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, category, price_cents, stock,
                promo_qty, promo_price_cents, image_path,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(product.promo_qty)
        .bind(product.promo_price_cents)
        .bind(&product.image_path)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates a product's catalog fields (name, category, price, promo,
    /// image). Stock is deliberately excluded: it only moves through the
    /// guarded increment/decrement below so every change is audited.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                category = ?3,
                price_cents = ?4,
                promo_qty = ?5,
                promo_price_cents = ?6,
                image_path = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price_cents)
        .bind(product.promo_qty)
        .bind(product.promo_price_cents)
        .bind(&product.image_path)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Atomically decrements stock iff enough is available.
    ///
    /// Returns `true` when the decrement applied, `false` when the guard
    /// rejected it (insufficient stock or unknown id); in the `false` case
    /// nothing was written.
    pub async fn try_decrement_stock(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        quantity: i64,
    ) -> DbResult<bool> {
        debug!(id = %id, quantity = %quantity, "Guarded stock decrement");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - ?2, updated_at = ?3
            WHERE id = ?1 AND stock >= ?2
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Increments stock (restock path).
    pub async fn increment_stock(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        quantity: i64,
    ) -> DbResult<()> {
        debug!(id = %id, quantity = %quantity, "Incrementing stock");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Reads the current stock level inside an ongoing transaction.
    ///
    /// The ledger uses this after an increment/decrement to stamp the
    /// resulting level onto the audit entry.
    pub async fn stock_in_tx(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<i64> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        stock.ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Counts products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn seeded_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        db.products()
            .insert(&Product {
                id: "p-tajine".to_string(),
                name: "Tajine poulet".to_string(),
                category: "Plats".to_string(),
                price_cents: 4500,
                stock: 3,
                promo_qty: None,
                promo_price_cents: None,
                image_path: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_decrement_applies_when_stock_suffices() {
        let db = seeded_db().await;
        let repo = db.products();

        let mut tx = db.begin().await.unwrap();
        assert!(repo.try_decrement_stock(&mut tx, "p-tajine", 2).await.unwrap());
        assert_eq!(repo.stock_in_tx(&mut tx, "p-tajine").await.unwrap(), 1);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_decrement_rejected_leaves_stock_unchanged() {
        let db = seeded_db().await;
        let repo = db.products();

        let mut tx = db.begin().await.unwrap();
        assert!(!repo.try_decrement_stock(&mut tx, "p-tajine", 5).await.unwrap());
        assert_eq!(repo.stock_in_tx(&mut tx, "p-tajine").await.unwrap(), 3);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_decrement_unknown_product_is_rejected() {
        let db = seeded_db().await;
        let repo = db.products();

        let mut tx = db.begin().await.unwrap();
        assert!(!repo.try_decrement_stock(&mut tx, "nope", 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_does_not_touch_stock() {
        let db = seeded_db().await;
        let repo = db.products();

        let mut product = repo.get_by_id("p-tajine").await.unwrap().unwrap();
        product.price_cents = 4800;
        product.stock = 999; // must be ignored by update()
        repo.update(&product).await.unwrap();

        let reloaded = repo.get_by_id("p-tajine").await.unwrap().unwrap();
        assert_eq!(reloaded.price_cents, 4800);
        assert_eq!(reloaded.stock, 3);
    }
}

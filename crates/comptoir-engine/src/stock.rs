//! # Stock Ledger
//!
//! Inventory mutations with an append-only audit trail. Every stock change
//! goes through this module, so `products.stock` and `stock_history` can
//! never drift apart.
//!
//! ## Decrement Path
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │  decrease(product, qty)          (inside caller's transaction) │
//! │                                                                │
//! │  1. guarded UPDATE .. WHERE stock >= qty                       │
//! │     └─ 0 rows ──▶ InsufficientStock, nothing written           │
//! │  2. read stock_after inside the same transaction               │
//! │  3. append SALE entry (delta = -qty, stock_after)              │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use comptoir_core::{
    validation::validate_restock_reason, CoreError, Product, StockChangeType, StockHistoryEntry,
    LOW_STOCK_THRESHOLD,
};
use comptoir_db::repository::stock_history::generate_entry_id;
use comptoir_db::Database;

use crate::error::EngineResult;

/// Audit reason recorded for every sale-driven decrement.
const SALE_REASON: &str = "Sale through POS";

/// Audited inventory operations.
#[derive(Clone)]
pub struct StockLedger {
    db: Database,
}

impl StockLedger {
    /// Creates a new ledger over the given database.
    pub fn new(db: Database) -> Self {
        StockLedger { db }
    }

    /// Decreases stock for a sale, inside the caller's transaction.
    ///
    /// The decrement is a single guarded UPDATE, so two concurrent sales of
    /// the last units cannot both succeed. On success an audit entry with
    /// the post-change stock level is appended in the same transaction.
    pub async fn decrease(
        &self,
        conn: &mut SqliteConnection,
        product: &Product,
        quantity: i64,
    ) -> EngineResult<()> {
        if quantity <= 0 {
            return Err(CoreError::InvalidQuantity { quantity }.into());
        }

        let applied = self
            .db
            .products()
            .try_decrement_stock(conn, &product.id, quantity)
            .await?;
        if !applied {
            let available = self.db.products().stock_in_tx(conn, &product.id).await?;
            warn!(
                product_id = %product.id,
                available,
                requested = quantity,
                "sale rejected, insufficient stock"
            );
            return Err(CoreError::InsufficientStock {
                product: product.name.clone(),
                available,
                requested: quantity,
            }
            .into());
        }

        let stock_after = self.db.products().stock_in_tx(conn, &product.id).await?;
        self.db
            .stock_history()
            .append(
                conn,
                &StockHistoryEntry {
                    id: generate_entry_id(),
                    product_id: product.id.clone(),
                    quantity_delta: -quantity,
                    stock_after,
                    change_type: StockChangeType::Sale,
                    reason: SALE_REASON.to_string(),
                    created_at: Utc::now(),
                },
            )
            .await?;

        debug!(product_id = %product.id, quantity, stock_after, "stock decreased");
        if stock_after <= LOW_STOCK_THRESHOLD {
            info!(product_id = %product.id, stock = stock_after, "low stock");
        }
        Ok(())
    }

    /// Increases stock for a restock, in its own transaction.
    ///
    /// `reason` is mandatory and stored on the audit entry ("delivery",
    /// "inventory correction", ...).
    pub async fn increase(
        &self,
        product_id: &str,
        quantity: i64,
        reason: &str,
    ) -> EngineResult<StockHistoryEntry> {
        if quantity <= 0 {
            return Err(CoreError::InvalidQuantity { quantity }.into());
        }
        validate_restock_reason(reason).map_err(CoreError::from)?;

        let mut tx = self.db.begin().await?;

        let product = self
            .db
            .products()
            .get_in_tx(&mut tx, product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        self.db
            .products()
            .increment_stock(&mut tx, &product.id, quantity)
            .await?;
        let stock_after = self.db.products().stock_in_tx(&mut tx, &product.id).await?;

        let entry = StockHistoryEntry {
            id: generate_entry_id(),
            product_id: product.id.clone(),
            quantity_delta: quantity,
            stock_after,
            change_type: StockChangeType::Restock,
            reason: reason.trim().to_string(),
            created_at: Utc::now(),
        };
        self.db.stock_history().append(&mut tx, &entry).await?;

        tx.commit().await?;

        info!(product_id = %product.id, quantity, stock_after, "stock increased");
        Ok(entry)
    }

    /// Whether the product's stock is at or below the low-stock threshold.
    pub async fn is_low(&self, product_id: &str) -> EngineResult<bool> {
        let product = self
            .db
            .products()
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
        Ok(product.is_low_stock())
    }

    /// Audit trail for a product, most recent first.
    pub async fn history(&self, product_id: &str) -> EngineResult<Vec<StockHistoryEntry>> {
        Ok(self.db.stock_history().list_for_product(product_id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{db_with_products, product};

    #[tokio::test]
    async fn test_increase_appends_restock_entry() {
        let db = db_with_products(vec![product("p1", "Couscous", 3500, 5)]).await;
        let ledger = StockLedger::new(db.clone());

        let entry = ledger.increase("p1", 12, "delivery").await.unwrap();

        assert_eq!(entry.quantity_delta, 12);
        assert_eq!(entry.stock_after, 17);
        assert_eq!(entry.change_type, StockChangeType::Restock);
        assert_eq!(entry.reason, "delivery");

        let stored = db.products().get_by_id("p1").await.unwrap().unwrap();
        assert_eq!(stored.stock, 17);
        assert_eq!(db.stock_history().count_for_product("p1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_increase_rejects_non_positive_quantity() {
        let db = db_with_products(vec![product("p1", "Couscous", 3500, 5)]).await;
        let ledger = StockLedger::new(db.clone());

        let err = ledger.increase("p1", 0, "delivery").await.unwrap_err();
        assert!(matches!(
            err,
            crate::EngineError::Core(CoreError::InvalidQuantity { quantity: 0 })
        ));
        // nothing written
        assert_eq!(db.stock_history().count_for_product("p1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_decrease_rejected_writes_nothing() {
        let db = db_with_products(vec![product("p1", "Couscous", 3500, 2)]).await;
        let ledger = StockLedger::new(db.clone());
        let prod = db.products().get_by_id("p1").await.unwrap().unwrap();

        let mut tx = db.begin().await.unwrap();
        let err = ledger.decrease(&mut tx, &prod, 3).await.unwrap_err();
        tx.commit().await.unwrap();

        assert!(matches!(
            err,
            crate::EngineError::Core(CoreError::InsufficientStock {
                available: 2,
                requested: 3,
                ..
            })
        ));
        let stored = db.products().get_by_id("p1").await.unwrap().unwrap();
        assert_eq!(stored.stock, 2);
        assert_eq!(db.stock_history().count_for_product("p1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_decrease_appends_sale_entry() {
        let db = db_with_products(vec![product("p1", "Couscous", 3500, 5)]).await;
        let ledger = StockLedger::new(db.clone());
        let prod = db.products().get_by_id("p1").await.unwrap().unwrap();

        let mut tx = db.begin().await.unwrap();
        ledger.decrease(&mut tx, &prod, 2).await.unwrap();
        tx.commit().await.unwrap();

        let history = ledger.history("p1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].quantity_delta, -2);
        assert_eq!(history[0].stock_after, 3);
        assert_eq!(history[0].change_type, StockChangeType::Sale);
        assert_eq!(history[0].reason, SALE_REASON);
    }

    #[tokio::test]
    async fn test_is_low_at_threshold() {
        let db = db_with_products(vec![
            product("low", "Thé", 800, LOW_STOCK_THRESHOLD),
            product("ok", "Café", 900, LOW_STOCK_THRESHOLD + 1),
        ])
        .await;
        let ledger = StockLedger::new(db);

        assert!(ledger.is_low("low").await.unwrap());
        assert!(!ledger.is_low("ok").await.unwrap());
    }
}

//! # Stock History Repository
//!
//! Append-only audit trail of stock adjustments. Entries are written in the
//! same transaction as the stock change itself: if the audit write fails the
//! whole adjustment rolls back, because an unaudited stock change is worse
//! than a rejected request. There is no update or delete here on purpose.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use comptoir_core::StockHistoryEntry;

const ENTRY_COLUMNS: &str =
    "id, product_id, quantity_delta, stock_after, change_type, reason, created_at";

/// Repository for the stock audit ledger.
#[derive(Debug, Clone)]
pub struct StockHistoryRepository {
    pool: SqlitePool,
}

impl StockHistoryRepository {
    /// Creates a new StockHistoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockHistoryRepository { pool }
    }

    /// Appends one audit entry within the caller's transaction.
    ///
    /// Exactly one entry per successful ledger call; never merged or
    /// batched across calls.
    pub async fn append(
        &self,
        conn: &mut SqliteConnection,
        entry: &StockHistoryEntry,
    ) -> DbResult<()> {
        debug!(
            product_id = %entry.product_id,
            delta = %entry.quantity_delta,
            stock_after = %entry.stock_after,
            "Appending stock history entry"
        );

        sqlx::query(
            r#"
            INSERT INTO stock_history (
                id, product_id, quantity_delta, stock_after,
                change_type, reason, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.product_id)
        .bind(entry.quantity_delta)
        .bind(entry.stock_after)
        .bind(entry.change_type)
        .bind(&entry.reason)
        .bind(entry.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Lists the audit trail for one product, newest first.
    pub async fn list_for_product(&self, product_id: &str) -> DbResult<Vec<StockHistoryEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM stock_history \
             WHERE product_id = ?1 ORDER BY created_at DESC, id DESC"
        );
        let entries = sqlx::query_as::<_, StockHistoryEntry>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// Counts audit entries for one product (used by tests and diagnostics).
    pub async fn count_for_product(&self, product_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stock_history WHERE product_id = ?1")
                .bind(product_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

/// Generates a new stock history entry ID.
pub fn generate_entry_id() -> String {
    Uuid::new_v4().to_string()
}

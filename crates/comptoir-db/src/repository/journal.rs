//! # Journal Repository
//!
//! Immutable snapshots of finalized carts.
//!
//! ## Snapshot Pattern
//! Journal lines copy product name, unit price, and subtotal **by value** at
//! payment time. Products can be renamed or repriced afterwards without
//! touching history; that is why journal_lines carries no foreign key to
//! products. Like stock_history, this repository has no update or delete.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use comptoir_core::{Journal, JournalLine};

const JOURNAL_COLUMNS: &str = "id, cart_id, table_number, total_cents, \
     cash_received_cents, change_cents, paid_at";

const LINE_COLUMNS: &str = "id, journal_id, product_name, quantity, \
     unit_price_cents, subtotal_cents";

/// Repository for journal snapshots.
#[derive(Debug, Clone)]
pub struct JournalRepository {
    pool: SqlitePool,
}

impl JournalRepository {
    /// Creates a new JournalRepository.
    pub fn new(pool: SqlitePool) -> Self {
        JournalRepository { pool }
    }

    /// Inserts a journal with its flattened lines within the checkout
    /// transaction.
    pub async fn insert(
        &self,
        conn: &mut SqliteConnection,
        journal: &Journal,
        lines: &[JournalLine],
    ) -> DbResult<()> {
        debug!(
            cart_id = %journal.cart_id,
            table = %journal.table_number,
            lines = lines.len(),
            "Writing journal snapshot"
        );

        sqlx::query(
            r#"
            INSERT INTO journal (
                id, cart_id, table_number, total_cents,
                cash_received_cents, change_cents, paid_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&journal.id)
        .bind(&journal.cart_id)
        .bind(journal.table_number)
        .bind(journal.total_cents)
        .bind(journal.cash_received_cents)
        .bind(journal.change_cents)
        .bind(journal.paid_at)
        .execute(&mut *conn)
        .await?;

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO journal_lines (
                    id, journal_id, product_name, quantity,
                    unit_price_cents, subtotal_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&line.id)
            .bind(&line.journal_id)
            .bind(&line.product_name)
            .bind(line.quantity)
            .bind(line.unit_price_cents)
            .bind(line.subtotal_cents)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Gets a journal by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Journal>> {
        let sql = format!("SELECT {JOURNAL_COLUMNS} FROM journal WHERE id = ?1");
        let journal = sqlx::query_as::<_, Journal>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(journal)
    }

    /// Gets the journal written for a cart at finalization.
    pub async fn get_by_cart(&self, cart_id: &str) -> DbResult<Option<Journal>> {
        let sql = format!("SELECT {JOURNAL_COLUMNS} FROM journal WHERE cart_id = ?1");
        let journal = sqlx::query_as::<_, Journal>(&sql)
            .bind(cart_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(journal)
    }

    /// Gets the flattened lines of a journal, in snapshot order.
    pub async fn get_lines(&self, journal_id: &str) -> DbResult<Vec<JournalLine>> {
        // rowid preserves insertion order, which is the receipt order
        let sql = format!(
            "SELECT {LINE_COLUMNS} FROM journal_lines WHERE journal_id = ?1 ORDER BY rowid"
        );
        let lines = sqlx::query_as::<_, JournalLine>(&sql)
            .bind(journal_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(lines)
    }
}

/// Generates a new journal ID.
pub fn generate_journal_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new journal line ID.
pub fn generate_journal_line_id() -> String {
    Uuid::new_v4().to_string()
}

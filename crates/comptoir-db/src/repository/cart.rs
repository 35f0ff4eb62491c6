//! # Cart Repository
//!
//! Database operations for carts and their lines.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  1. CREATE                                                          │
//! │     └── insert() → Cart { state: Open }   (open-table index guards  │
//! │                                            table uniqueness)       │
//! │  2. MUTATE LINES (engine-owned transaction)                         │
//! │     └── insert_line() / update_line() / delete_lines()              │
//! │     └── update_total() after every batch of line changes            │
//! │                                                                     │
//! │  3. FINALIZE                                                        │
//! │     └── mark_paid() → Cart { state: Paid }, read-only from here     │
//! │                                                                     │
//! │  Carts are never deleted; the journal keeps the paid snapshot.      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use comptoir_core::{Cart, LineItem};

const CART_COLUMNS: &str = "id, table_number, state, user_id, total_cents, created_at, updated_at";

const LINE_COLUMNS: &str =
    "id, cart_id, product_id, quantity, unit_price_cents, subtotal_cents, created_at";

/// Repository for cart database operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    // =========================================================================
    // Cart reads
    // =========================================================================

    /// Gets a cart by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Cart>> {
        let sql = format!("SELECT {CART_COLUMNS} FROM carts WHERE id = ?1");
        let cart = sqlx::query_as::<_, Cart>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(cart)
    }

    /// Gets a cart inside an ongoing transaction, so the state check and the
    /// mutation that follows observe the same row version.
    pub async fn get_in_tx(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<Cart>> {
        let sql = format!("SELECT {CART_COLUMNS} FROM carts WHERE id = ?1");
        let cart = sqlx::query_as::<_, Cart>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(cart)
    }

    /// Lists all open carts, oldest first (the POS floor view).
    pub async fn list_open(&self) -> DbResult<Vec<Cart>> {
        let sql =
            format!("SELECT {CART_COLUMNS} FROM carts WHERE state = 'open' ORDER BY created_at");
        let carts = sqlx::query_as::<_, Cart>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(carts)
    }

    /// Returns the table numbers currently held by open carts.
    pub async fn occupied_tables(&self) -> DbResult<Vec<i64>> {
        let tables: Vec<i64> = sqlx::query_scalar(
            "SELECT table_number FROM carts WHERE state = 'open' ORDER BY table_number",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(tables)
    }

    /// True iff an open cart already holds this table.
    ///
    /// Called inside the creation transaction; the partial unique index is
    /// the backstop for the race this check alone could not close.
    pub async fn table_occupied(
        &self,
        conn: &mut SqliteConnection,
        table_number: i64,
    ) -> DbResult<bool> {
        let occupied: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM carts WHERE table_number = ?1 AND state = 'open')",
        )
        .bind(table_number)
        .fetch_one(&mut *conn)
        .await?;

        Ok(occupied)
    }

    // =========================================================================
    // Cart mutations (conn-bound, engine owns the transaction)
    // =========================================================================

    /// Inserts a new cart.
    pub async fn insert(&self, conn: &mut SqliteConnection, cart: &Cart) -> DbResult<()> {
        debug!(id = %cart.id, table = %cart.table_number, "Inserting cart");

        sqlx::query(
            r#"
            INSERT INTO carts (
                id, table_number, state, user_id, total_cents,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&cart.id)
        .bind(cart.table_number)
        .bind(cart.state)
        .bind(&cart.user_id)
        .bind(cart.total_cents)
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Persists a recomputed cart total.
    pub async fn update_total(
        &self,
        conn: &mut SqliteConnection,
        cart_id: &str,
        total_cents: i64,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE carts SET total_cents = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(cart_id)
        .bind(total_cents)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cart", cart_id));
        }

        Ok(())
    }

    /// Flips a cart to PAID. The `state = 'open'` guard makes the terminal
    /// transition single-shot even under concurrent checkouts.
    pub async fn mark_paid(&self, conn: &mut SqliteConnection, cart_id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE carts SET state = 'paid', updated_at = ?2 WHERE id = ?1 AND state = 'open'",
        )
        .bind(cart_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cart (open)", cart_id));
        }

        Ok(())
    }

    // =========================================================================
    // Line reads
    // =========================================================================

    /// Gets all lines for a cart, in insertion order (receipt display order).
    pub async fn get_lines(&self, cart_id: &str) -> DbResult<Vec<LineItem>> {
        let sql = format!(
            "SELECT {LINE_COLUMNS} FROM cart_lines WHERE cart_id = ?1 ORDER BY created_at, id"
        );
        let lines = sqlx::query_as::<_, LineItem>(&sql)
            .bind(cart_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(lines)
    }

    /// Gets all lines for a cart inside an ongoing transaction.
    pub async fn get_lines_in_tx(
        &self,
        conn: &mut SqliteConnection,
        cart_id: &str,
    ) -> DbResult<Vec<LineItem>> {
        let sql = format!(
            "SELECT {LINE_COLUMNS} FROM cart_lines WHERE cart_id = ?1 ORDER BY created_at, id"
        );
        let lines = sqlx::query_as::<_, LineItem>(&sql)
            .bind(cart_id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(lines)
    }

    /// Finds the line holding a given product, if the cart has one.
    /// At most one exists per (cart, product) thanks to the unique index.
    pub async fn find_line(
        &self,
        conn: &mut SqliteConnection,
        cart_id: &str,
        product_id: &str,
    ) -> DbResult<Option<LineItem>> {
        let sql = format!(
            "SELECT {LINE_COLUMNS} FROM cart_lines WHERE cart_id = ?1 AND product_id = ?2"
        );
        let line = sqlx::query_as::<_, LineItem>(&sql)
            .bind(cart_id)
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(line)
    }

    /// Sums line subtotals for a cart within the transaction.
    ///
    /// This is the source for the cart's derived total; an empty cart
    /// sums to zero.
    pub async fn sum_subtotals(
        &self,
        conn: &mut SqliteConnection,
        cart_id: &str,
    ) -> DbResult<i64> {
        let sum: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(subtotal_cents) FROM cart_lines WHERE cart_id = ?1",
        )
        .bind(cart_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(sum.unwrap_or(0))
    }

    // =========================================================================
    // Line mutations
    // =========================================================================

    /// Inserts a new cart line.
    pub async fn insert_line(&self, conn: &mut SqliteConnection, line: &LineItem) -> DbResult<()> {
        debug!(cart_id = %line.cart_id, product_id = %line.product_id, "Inserting cart line");

        sqlx::query(
            r#"
            INSERT INTO cart_lines (
                id, cart_id, product_id, quantity,
                unit_price_cents, subtotal_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&line.id)
        .bind(&line.cart_id)
        .bind(&line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .bind(line.subtotal_cents)
        .bind(line.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Rewrites a line's quantity, captured unit price, and derived subtotal
    /// in one statement (the engine computes all three together).
    pub async fn update_line(
        &self,
        conn: &mut SqliteConnection,
        line_id: &str,
        quantity: i64,
        unit_price_cents: Option<i64>,
        subtotal_cents: i64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE cart_lines
            SET quantity = ?2, unit_price_cents = ?3, subtotal_cents = ?4
            WHERE id = ?1
            "#,
        )
        .bind(line_id)
        .bind(quantity)
        .bind(unit_price_cents)
        .bind(subtotal_cents)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("LineItem", line_id));
        }

        Ok(())
    }

    /// Deletes every line of a cart. Returns the number removed.
    pub async fn delete_lines(
        &self,
        conn: &mut SqliteConnection,
        cart_id: &str,
    ) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE cart_id = ?1")
            .bind(cart_id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected())
    }
}

/// Generates a new cart ID.
pub fn generate_cart_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new cart line ID.
pub fn generate_line_id() -> String {
    Uuid::new_v4().to_string()
}

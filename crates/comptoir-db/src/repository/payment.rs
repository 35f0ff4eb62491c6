//! # Payment Repository
//!
//! One payment per finalized cart (enforced by the UNIQUE cart_id column).
//! The insert always happens inside the checkout transaction, together with
//! the journal snapshot and the cart's state flip.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use comptoir_core::Payment;

const PAYMENT_COLUMNS: &str = "id, cart_id, table_number, amount_due_cents, \
     cash_received_cents, change_cents, user_id, created_at";

/// Repository for payment records.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    /// Creates a new PaymentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Inserts a payment within the checkout transaction.
    pub async fn insert(&self, conn: &mut SqliteConnection, payment: &Payment) -> DbResult<()> {
        debug!(
            cart_id = %payment.cart_id,
            amount_due = %payment.amount_due_cents,
            "Recording payment"
        );

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, cart_id, table_number, amount_due_cents,
                cash_received_cents, change_cents, user_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.cart_id)
        .bind(payment.table_number)
        .bind(payment.amount_due_cents)
        .bind(payment.cash_received_cents)
        .bind(payment.change_cents)
        .bind(&payment.user_id)
        .bind(payment.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Gets the payment for a cart (used for receipt re-print).
    pub async fn get_by_cart(&self, cart_id: &str) -> DbResult<Option<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE cart_id = ?1");
        let payment = sqlx::query_as::<_, Payment>(&sql)
            .bind(cart_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(payment)
    }
}

/// Generates a new payment ID.
pub fn generate_payment_id() -> String {
    Uuid::new_v4().to_string()
}

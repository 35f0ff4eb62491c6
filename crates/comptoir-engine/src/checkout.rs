//! # Checkout
//!
//! Atomic finalization of an open cart into a payment and a journal
//! snapshot.
//!
//! ## Finalization
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  validate_and_pay(cart_id, cash, user)      — one transaction —   │
//! │                                                                   │
//! │  1. cart exists and is OPEN        (CartNotFound / InvalidState)  │
//! │  2. cart has lines                 (EmptyCart)                    │
//! │  3. re-price every line from current product data; the repriced   │
//! │     total is what the customer owes, never a stale column         │
//! │  4. cash >= total                  (InsufficientPayment)          │
//! │  5. write Payment, Journal (+lines by value), cart → PAID         │
//! │                                                                   │
//! │  commit ── then print client bill (failure only logged)           │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any failure before commit leaves the cart OPEN with nothing written.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument};

use comptoir_core::{
    price_for, validation, CoreError, Journal, JournalLine, Money, Payment,
};
use comptoir_db::repository::journal::{generate_journal_id, generate_journal_line_id};
use comptoir_db::repository::payment::generate_payment_id;
use comptoir_db::Database;

use crate::error::{EngineError, EngineResult};
use crate::printer::{Printer, ReceiptLine};

/// Everything produced by a successful checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub payment: Payment,
    pub journal: Journal,
    pub lines: Vec<JournalLine>,
}

impl CheckoutReceipt {
    #[inline]
    pub fn change(&self) -> Money {
        self.payment.change()
    }
}

/// The finalization workflow.
#[derive(Clone)]
pub struct Checkout {
    db: Database,
    printer: Arc<dyn Printer>,
}

impl Checkout {
    /// Creates a new checkout workflow.
    pub fn new(db: Database, printer: Arc<dyn Printer>) -> Self {
        Checkout { db, printer }
    }

    /// Validates and pays an open cart.
    ///
    /// Re-prices the cart inside the transaction, so what the customer is
    /// charged always matches current product prices and promotions, then
    /// writes the payment, the by-value journal snapshot, and the PAID
    /// transition atomically. The client bill is printed after commit.
    #[instrument(skip(self))]
    pub async fn validate_and_pay(
        &self,
        cart_id: &str,
        cash_received: Money,
        user_id: &str,
    ) -> EngineResult<CheckoutReceipt> {
        validation::validate_cash_received(cash_received.cents()).map_err(CoreError::from)?;

        let mut tx = self.db.begin().await?;

        let cart = self
            .db
            .carts()
            .get_in_tx(&mut tx, cart_id)
            .await?
            .ok_or_else(|| CoreError::CartNotFound(cart_id.to_string()))?;
        if !cart.is_open() {
            return Err(CoreError::InvalidState {
                cart_id: cart.id,
                state: cart.state,
            }
            .into());
        }

        let lines = self.db.carts().get_lines_in_tx(&mut tx, &cart.id).await?;
        if lines.is_empty() {
            return Err(CoreError::EmptyCart { cart_id: cart.id }.into());
        }

        // Re-price and snapshot in the same pass. The journal copies names
        // and prices by value so later product edits cannot alter it.
        let journal_id = generate_journal_id();
        let mut journal_lines = Vec::with_capacity(lines.len());
        let mut total = Money::zero();
        for line in &lines {
            let product = self
                .db
                .products()
                .get_in_tx(&mut tx, &line.product_id)
                .await?
                .ok_or_else(|| {
                    EngineError::from(CoreError::ProductNotFound(line.product_id.clone()))
                })?;
            let unit = line.unit_price().unwrap_or_else(|| product.price());
            let subtotal = price_for(unit, line.quantity, product.promotion());
            total += subtotal;
            // Persist the repriced subtotal too: the cart goes terminal
            // below, so its stored lines must already sum to the total.
            if subtotal.cents() != line.subtotal_cents {
                self.db
                    .carts()
                    .update_line(
                        &mut tx,
                        &line.id,
                        line.quantity,
                        Some(unit.cents()),
                        subtotal.cents(),
                    )
                    .await?;
            }
            journal_lines.push(JournalLine {
                id: generate_journal_line_id(),
                journal_id: journal_id.clone(),
                product_name: product.name,
                quantity: line.quantity,
                unit_price_cents: unit.cents(),
                subtotal_cents: subtotal.cents(),
            });
        }

        if cash_received < total {
            return Err(CoreError::InsufficientPayment {
                due: total,
                received: cash_received,
            }
            .into());
        }
        let change = cash_received - total;

        let now = Utc::now();
        let payment = Payment {
            id: generate_payment_id(),
            cart_id: cart.id.clone(),
            table_number: cart.table_number,
            amount_due_cents: total.cents(),
            cash_received_cents: cash_received.cents(),
            change_cents: change.cents(),
            user_id: user_id.to_string(),
            created_at: now,
        };
        let journal = Journal {
            id: journal_id,
            cart_id: cart.id.clone(),
            table_number: cart.table_number,
            total_cents: total.cents(),
            cash_received_cents: cash_received.cents(),
            change_cents: change.cents(),
            paid_at: now,
        };

        // The state = 'open' guard on this UPDATE makes the transition
        // single-shot even if two checkouts race past the read above.
        self.db.carts().mark_paid(&mut tx, &cart.id).await?;
        self.db
            .carts()
            .update_total(&mut tx, &cart.id, total.cents())
            .await?;
        self.db.payments().insert(&mut tx, &payment).await?;
        self.db.journal().insert(&mut tx, &journal, &journal_lines).await?;

        tx.commit().await?;

        info!(
            cart_id = %cart.id,
            table = cart.table_number,
            total = %total,
            change = %change,
            "cart paid"
        );

        let receipt: Vec<ReceiptLine> = journal_lines.iter().map(ReceiptLine::from).collect();
        self.printer.print_client_bill(&payment, &receipt);

        Ok(CheckoutReceipt {
            payment,
            journal,
            lines: journal_lines,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartService;
    use crate::printer::test_support::RecordingPrinter;
    use crate::test_util::{db_with_products, product};

    async fn setup() -> (Database, CartService, Checkout, Arc<RecordingPrinter>) {
        let db = db_with_products(vec![
            product("p-plat", "Tajine poulet", 1500, 20),
            product("p-the", "Thé à la menthe", 1000, 10),
        ])
        .await;
        let printer = Arc::new(RecordingPrinter::default());
        let carts = CartService::new(db.clone(), printer.clone());
        let checkout = Checkout::new(db.clone(), printer.clone());
        (db, carts, checkout, printer)
    }

    #[tokio::test]
    async fn test_short_payment_leaves_cart_open() {
        let (db, carts, checkout, printer) = setup().await;
        let cart = carts
            .create(4, &[("p-plat".to_string(), 3)], "user-1")
            .await
            .unwrap();

        // 45.00 due, only 40.00 tendered
        let err = checkout
            .validate_and_pay(&cart.id, Money::from_cents(4000), "user-1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::InsufficientPayment { .. })
        ));

        // cart untouched: still open, no payment, no journal, no bill
        let stored = db.carts().get_by_id(&cart.id).await.unwrap().unwrap();
        assert!(stored.is_open());
        assert!(db.payments().get_by_cart(&cart.id).await.unwrap().is_none());
        assert!(db.journal().get_by_cart(&cart.id).await.unwrap().is_none());
        assert!(printer.client_bills.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_successful_payment_writes_everything_atomically() {
        let (db, carts, checkout, printer) = setup().await;
        let cart = carts
            .create(4, &[("p-plat".to_string(), 3)], "user-1")
            .await
            .unwrap();

        let receipt = checkout
            .validate_and_pay(&cart.id, Money::from_cents(5000), "user-2")
            .await
            .unwrap();

        assert_eq!(receipt.payment.amount_due_cents, 4500);
        assert_eq!(receipt.change(), Money::from_cents(500));
        assert_eq!(receipt.payment.user_id, "user-2");
        assert_eq!(receipt.journal.total_cents, 4500);
        assert_eq!(receipt.lines.len(), 1);
        assert_eq!(receipt.lines[0].product_name, "Tajine poulet");
        assert_eq!(receipt.lines[0].quantity, 3);

        let stored = db.carts().get_by_id(&cart.id).await.unwrap().unwrap();
        assert!(!stored.is_open());
        assert!(db.payments().get_by_cart(&cart.id).await.unwrap().is_some());

        let bills = printer.client_bills.lock().unwrap();
        assert_eq!(bills.as_slice(), &[(receipt.payment.id.clone(), 500)]);
    }

    #[tokio::test]
    async fn test_exact_cash_gives_zero_change() {
        let (_db, carts, checkout, _) = setup().await;
        let cart = carts
            .create(4, &[("p-the".to_string(), 2)], "user-1")
            .await
            .unwrap();

        let receipt = checkout
            .validate_and_pay(&cart.id, Money::from_cents(2000), "user-1")
            .await
            .unwrap();
        assert!(receipt.change().is_zero());
    }

    #[tokio::test]
    async fn test_paid_cart_cannot_be_paid_or_mutated_again() {
        let (_db, carts, checkout, _) = setup().await;
        let cart = carts
            .create(4, &[("p-plat".to_string(), 1)], "user-1")
            .await
            .unwrap();
        checkout
            .validate_and_pay(&cart.id, Money::from_cents(1500), "user-1")
            .await
            .unwrap();

        let err = checkout
            .validate_and_pay(&cart.id, Money::from_cents(1500), "user-1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::InvalidState { .. })
        ));

        let err = carts.add_line(&cart.id, "p-the", 1).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_paying_frees_the_table() {
        let (_db, carts, checkout, _) = setup().await;
        let cart = carts
            .create(4, &[("p-the".to_string(), 1)], "user-1")
            .await
            .unwrap();
        checkout
            .validate_and_pay(&cart.id, Money::from_cents(1000), "user-1")
            .await
            .unwrap();

        // same table can host a new open cart now
        carts.create(4, &[], "user-2").await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_cart_cannot_be_paid() {
        let (_db, carts, checkout, _) = setup().await;
        let cart = carts.create(4, &[], "user-1").await.unwrap();

        let err = checkout
            .validate_and_pay(&cart.id, Money::from_cents(1000), "user-1")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::EmptyCart { .. })));
    }

    #[tokio::test]
    async fn test_journal_snapshot_survives_product_edits() {
        let (db, carts, checkout, _) = setup().await;
        let cart = carts
            .create(4, &[("p-plat".to_string(), 2)], "user-1")
            .await
            .unwrap();
        let receipt = checkout
            .validate_and_pay(&cart.id, Money::from_cents(3000), "user-1")
            .await
            .unwrap();

        // rename and reprice the product after the sale
        let mut product = db.products().get_by_id("p-plat").await.unwrap().unwrap();
        product.name = "Tajine agneau".to_string();
        product.price_cents = 1800;
        db.products().update(&product).await.unwrap();

        let lines = db.journal().get_lines(&receipt.journal.id).await.unwrap();
        assert_eq!(lines[0].product_name, "Tajine poulet");
        assert_eq!(lines[0].unit_price_cents, 1500);
    }

    #[tokio::test]
    async fn test_repricing_at_payment_rewrites_stored_line_subtotals() {
        let (db, carts, checkout, _) = setup().await;
        let cart = carts
            .create(4, &[("p-the".to_string(), 2)], "user-1")
            .await
            .unwrap();
        assert_eq!(carts.get_total(&cart.id).await.unwrap(), Money::from_cents(2000));

        // a bundle deal lands between ordering and payment: 2 for 15.00
        let mut product = db.products().get_by_id("p-the").await.unwrap().unwrap();
        product.promo_qty = Some(2);
        product.promo_price_cents = Some(1500);
        db.products().update(&product).await.unwrap();

        let receipt = checkout
            .validate_and_pay(&cart.id, Money::from_cents(1500), "user-1")
            .await
            .unwrap();
        assert_eq!(receipt.payment.amount_due_cents, 1500);

        // the terminal cart still satisfies total == sum of line subtotals
        let stored = db.carts().get_by_id(&cart.id).await.unwrap().unwrap();
        let lines = db.carts().get_lines(&cart.id).await.unwrap();
        let line_sum: i64 = lines.iter().map(|l| l.subtotal_cents).sum();
        assert_eq!(stored.total_cents, 1500);
        assert_eq!(line_sum, stored.total_cents);
    }

    #[tokio::test]
    async fn test_negative_cash_is_rejected() {
        let (_db, carts, checkout, _) = setup().await;
        let cart = carts
            .create(4, &[("p-the".to_string(), 1)], "user-1")
            .await
            .unwrap();

        let err = checkout
            .validate_and_pay(&cart.id, Money::from_cents(-100), "user-1")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::Validation(_))));
    }
}

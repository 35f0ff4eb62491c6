//! # Cart Lifecycle
//!
//! Cart creation and mutation. Every operation runs in one transaction so
//! the cart, its lines, the stock decrements, and the audit entries commit
//! or roll back together.
//!
//! ## Lifecycle
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  create(table, items, user)                                       │
//! │     │  table must be free among OPEN carts                        │
//! │     ▼                                                             │
//! │  ┌──────┐  add_line / clear_lines / recalculate_total  ┌──────┐   │
//! │  │ OPEN │ ───────────────────────────────────────────▶ │ OPEN │   │
//! │  └──┬───┘                                              └──────┘   │
//! │     │ validate_and_pay (checkout module)                          │
//! │     ▼                                                             │
//! │  ┌──────┐                                                         │
//! │  │ PAID │  terminal: every mutation returns InvalidState          │
//! │  └──────┘                                                         │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Adding a product already present in the cart merges into the existing
//! line: quantities accumulate and the whole line is re-priced, so bundle
//! promotions apply across the merged quantity.
//!
//! Clearing lines does NOT restore stock. The decrement happened when the
//! kitchen ticket was cut, and the food may already be cooking; returns go
//! through an explicit restock with a reason instead.

use std::sync::Arc;

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{info, instrument, warn};

use comptoir_core::{
    price_for, validation, Cart, CartState, CoreError, LineItem, Money, Product, MAX_CART_LINES,
};
use comptoir_db::repository::cart::{generate_cart_id, generate_line_id};
use comptoir_db::{Database, DbError};

use crate::error::{EngineError, EngineResult};
use crate::printer::{Printer, ReceiptLine};
use crate::stock::StockLedger;

/// Cart lifecycle operations.
#[derive(Clone)]
pub struct CartService {
    db: Database,
    ledger: StockLedger,
    printer: Arc<dyn Printer>,
}

impl CartService {
    /// Creates a new cart service.
    pub fn new(db: Database, printer: Arc<dyn Printer>) -> Self {
        let ledger = StockLedger::new(db.clone());
        CartService {
            db,
            ledger,
            printer,
        }
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Opens a cart for a table and sells the initial items.
    ///
    /// Fails with `TableOccupied` if the table already has an open cart,
    /// with `InsufficientStock` if any item cannot be covered, and in both
    /// cases nothing is persisted. On success the kitchen ticket is printed
    /// (after commit).
    #[instrument(skip(self, items))]
    pub async fn create(
        &self,
        table_number: i64,
        items: &[(String, i64)],
        user_id: &str,
    ) -> EngineResult<Cart> {
        validation::validate_table_number(table_number).map_err(CoreError::from)?;
        for (_, quantity) in items {
            validation::validate_quantity(*quantity).map_err(CoreError::from)?;
        }

        let mut tx = self.db.begin().await?;

        if self.db.carts().table_occupied(&mut tx, table_number).await? {
            return Err(CoreError::TableOccupied { table_number }.into());
        }

        let now = Utc::now();
        let mut cart = Cart {
            id: generate_cart_id(),
            table_number,
            state: CartState::Open,
            user_id: user_id.to_string(),
            total_cents: 0,
            created_at: now,
            updated_at: now,
        };
        // The partial unique index on open tables backstops the check above
        // when two terminals race on the same table.
        match self.db.carts().insert(&mut tx, &cart).await {
            Err(DbError::UniqueViolation { .. }) => {
                return Err(CoreError::TableOccupied { table_number }.into());
            }
            other => other?,
        }

        let mut ticket = Vec::with_capacity(items.len());
        for (product_id, quantity) in items {
            let product = self.sell_into_cart(&mut tx, &cart.id, product_id, *quantity).await?;
            ticket.push((product, *quantity));
        }

        cart.total_cents = self.db.carts().sum_subtotals(&mut tx, &cart.id).await?;
        self.db
            .carts()
            .update_total(&mut tx, &cart.id, cart.total_cents)
            .await?;

        tx.commit().await?;

        info!(
            cart_id = %cart.id,
            table = table_number,
            total = %cart.total(),
            "cart created"
        );

        let receipt: Vec<ReceiptLine> = ticket
            .iter()
            .map(|(product, quantity)| ReceiptLine {
                product_name: product.name.clone(),
                quantity: *quantity,
                unit_price_cents: product.price_cents,
                subtotal_cents: price_for(product.price(), *quantity, product.promotion()).cents(),
            })
            .collect();
        self.printer.print_kitchen_ticket(&cart, &receipt);

        Ok(cart)
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Adds (or merges) a line to an open cart, selling `quantity` units.
    ///
    /// The unit price is refreshed from the product's current price, and
    /// the merged line is re-priced as a whole so bundle promotions apply
    /// across the accumulated quantity.
    #[instrument(skip(self))]
    pub async fn add_line(
        &self,
        cart_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> EngineResult<Cart> {
        validation::validate_quantity(quantity).map_err(CoreError::from)?;

        let mut tx = self.db.begin().await?;

        let cart = self.require_open(&mut tx, cart_id).await?;
        self.sell_into_cart(&mut tx, &cart.id, product_id, quantity).await?;

        let total_cents = self.db.carts().sum_subtotals(&mut tx, &cart.id).await?;
        self.db
            .carts()
            .update_total(&mut tx, &cart.id, total_cents)
            .await?;

        // Re-read before commit so the caller gets the row as persisted,
        // updated_at included.
        let cart = self
            .db
            .carts()
            .get_in_tx(&mut tx, &cart.id)
            .await?
            .ok_or_else(|| DbError::not_found("Cart", &cart.id))?;

        tx.commit().await?;

        Ok(cart)
    }

    /// Empties an open cart.
    ///
    /// Stock is deliberately NOT restored; see the module docs. Returns the
    /// number of lines removed.
    #[instrument(skip(self))]
    pub async fn clear_lines(&self, cart_id: &str) -> EngineResult<u64> {
        let mut tx = self.db.begin().await?;

        let cart = self.require_open(&mut tx, cart_id).await?;
        let removed = self.db.carts().delete_lines(&mut tx, &cart.id).await?;
        self.db.carts().update_total(&mut tx, &cart.id, 0).await?;

        tx.commit().await?;

        if removed > 0 {
            warn!(cart_id, removed, "cart cleared, stock not restored");
        }
        Ok(removed)
    }

    /// Recomputes every line subtotal and the cart total from current
    /// product data, persists them, and returns the new total.
    ///
    /// Idempotent: running it twice in a row yields the same result.
    #[instrument(skip(self))]
    pub async fn recalculate_total(&self, cart_id: &str) -> EngineResult<Money> {
        let mut tx = self.db.begin().await?;

        let cart = self.require_open(&mut tx, cart_id).await?;
        let lines = self.db.carts().get_lines_in_tx(&mut tx, &cart.id).await?;

        for line in &lines {
            let product = self.require_product(&mut tx, &line.product_id).await?;
            // A captured unit price wins; a line without one falls back to
            // the product's current price.
            let unit = line.unit_price().unwrap_or_else(|| product.price());
            let subtotal = price_for(unit, line.quantity, product.promotion());
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

        let total_cents = self.db.carts().sum_subtotals(&mut tx, &cart.id).await?;
        self.db
            .carts()
            .update_total(&mut tx, &cart.id, total_cents)
            .await?;

        tx.commit().await?;

        Ok(Money::from_cents(total_cents))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Returns the persisted total of a cart.
    pub async fn get_total(&self, cart_id: &str) -> EngineResult<Money> {
        let cart = self
            .db
            .carts()
            .get_by_id(cart_id)
            .await?
            .ok_or_else(|| CoreError::CartNotFound(cart_id.to_string()))?;
        Ok(cart.total())
    }

    /// Returns the lines of a cart, in insertion order.
    pub async fn lines(&self, cart_id: &str) -> EngineResult<Vec<LineItem>> {
        Ok(self.db.carts().get_lines(cart_id).await?)
    }

    /// Table numbers currently holding an open cart.
    pub async fn occupied_tables(&self) -> EngineResult<Vec<i64>> {
        Ok(self.db.carts().occupied_tables().await?)
    }

    /// All open carts with their lines, oldest cart first. Feeds the
    /// floor view.
    pub async fn find_open_carts(&self) -> EngineResult<Vec<(Cart, Vec<LineItem>)>> {
        let carts = self.db.carts().list_open().await?;
        let mut result = Vec::with_capacity(carts.len());
        for cart in carts {
            let lines = self.db.carts().get_lines(&cart.id).await?;
            result.push((cart, lines));
        }
        Ok(result)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Loads a cart inside the transaction and requires it to be OPEN.
    async fn require_open(
        &self,
        conn: &mut SqliteConnection,
        cart_id: &str,
    ) -> EngineResult<Cart> {
        let cart = self
            .db
            .carts()
            .get_in_tx(conn, cart_id)
            .await?
            .ok_or_else(|| CoreError::CartNotFound(cart_id.to_string()))?;
        if !cart.is_open() {
            return Err(CoreError::InvalidState {
                cart_id: cart.id,
                state: cart.state,
            }
            .into());
        }
        Ok(cart)
    }

    async fn require_product(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
    ) -> EngineResult<Product> {
        self.db
            .products()
            .get_in_tx(conn, product_id)
            .await?
            .ok_or_else(|| EngineError::from(CoreError::ProductNotFound(product_id.to_string())))
    }

    /// Sells `quantity` units of a product into a cart: merges with an
    /// existing line if present, re-prices the merged quantity, and runs
    /// the stock decrement through the ledger. All inside the caller's
    /// transaction.
    async fn sell_into_cart(
        &self,
        conn: &mut SqliteConnection,
        cart_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> EngineResult<Product> {
        let product = self.require_product(conn, product_id).await?;

        let existing = self.db.carts().find_line(conn, cart_id, product_id).await?;
        let merged_quantity = existing.as_ref().map_or(0, |l| l.quantity) + quantity;
        validation::validate_quantity(merged_quantity).map_err(CoreError::from)?;

        // Stock is decremented by the amount newly sold, not the merged
        // line quantity.
        self.ledger.decrease(conn, &product, quantity).await?;

        let subtotal = price_for(product.price(), merged_quantity, product.promotion());
        match existing {
            Some(line) => {
                self.db
                    .carts()
                    .update_line(
                        conn,
                        &line.id,
                        merged_quantity,
                        Some(product.price_cents),
                        subtotal.cents(),
                    )
                    .await?;
            }
            None => {
                let count = self.db.carts().get_lines_in_tx(conn, cart_id).await?.len();
                if count >= MAX_CART_LINES {
                    return Err(CoreError::Validation(
                        comptoir_core::ValidationError::OutOfRange {
                            field: "lines".to_string(),
                            min: 1,
                            max: MAX_CART_LINES as i64,
                        },
                    )
                    .into());
                }
                self.db
                    .carts()
                    .insert_line(
                        conn,
                        &LineItem {
                            id: generate_line_id(),
                            cart_id: cart_id.to_string(),
                            product_id: product.id.clone(),
                            quantity: merged_quantity,
                            unit_price_cents: Some(product.price_cents),
                            subtotal_cents: subtotal.cents(),
                            created_at: Utc::now(),
                        },
                    )
                    .await?;
            }
        }

        Ok(product)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::test_support::RecordingPrinter;
    use crate::test_util::{db_with_products, product, promo_product};

    fn service(db: &Database) -> (CartService, Arc<RecordingPrinter>) {
        let printer = Arc::new(RecordingPrinter::default());
        (CartService::new(db.clone(), printer.clone()), printer)
    }

    async fn seeded() -> Database {
        db_with_products(vec![
            product("p-plat", "Tajine poulet", 1500, 20),
            product("p-the", "Thé à la menthe", 1000, 5),
            promo_product("p-promo", "Brochettes", 1000, 50, 3, 2500),
        ])
        .await
    }

    #[tokio::test]
    async fn test_create_totals_decrements_and_audits() {
        let db = seeded().await;
        let (service, printer) = service(&db);

        let cart = service
            .create(4, &[("p-plat".to_string(), 2)], "user-1")
            .await
            .unwrap();

        // two units at 15.00 each
        assert_eq!(cart.total(), Money::from_cents(3000));
        assert_eq!(
            db.products().get_by_id("p-plat").await.unwrap().unwrap().stock,
            18
        );
        // exactly one SALE audit entry for the one decrement
        let history = db.stock_history().list_for_product("p-plat").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].quantity_delta, -2);

        // kitchen ticket printed once, after commit
        let tickets = printer.kitchen_tickets.lock().unwrap();
        assert_eq!(tickets.as_slice(), &[(cart.id.clone(), 1)]);
    }

    #[tokio::test]
    async fn test_create_rejects_occupied_table() {
        let db = seeded().await;
        let (service, _) = service(&db);

        service.create(4, &[], "user-1").await.unwrap();
        let err = service.create(4, &[], "user-2").await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::TableOccupied { table_number: 4 })
        ));

        // a different table is fine
        service.create(5, &[], "user-2").await.unwrap();
        assert_eq!(service.occupied_tables().await.unwrap(), vec![4, 5]);
    }

    #[tokio::test]
    async fn test_add_line_returns_the_stored_row() {
        let db = seeded().await;
        let (service, _) = service(&db);

        let cart = service.create(4, &[], "user-1").await.unwrap();
        let returned = service.add_line(&cart.id, "p-plat", 2).await.unwrap();

        let stored = db.carts().get_by_id(&cart.id).await.unwrap().unwrap();
        assert_eq!(returned.total_cents, stored.total_cents);
        assert_eq!(returned.updated_at, stored.updated_at);
    }

    #[tokio::test]
    async fn test_create_insufficient_stock_rolls_back_everything() {
        let db = seeded().await;
        let (service, printer) = service(&db);

        // p-the has 5 in stock
        let err = service
            .create(
                4,
                &[("p-plat".to_string(), 1), ("p-the".to_string(), 6)],
                "user-1",
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::InsufficientStock { .. })
        ));

        // nothing persisted: no cart, no stock change, no audit, no ticket
        assert!(service.find_open_carts().await.unwrap().is_empty());
        assert_eq!(
            db.products().get_by_id("p-plat").await.unwrap().unwrap().stock,
            20
        );
        assert_eq!(db.stock_history().count_for_product("p-plat").await.unwrap(), 0);
        assert!(printer.kitchen_tickets.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_line_merges_and_reprices() {
        let db = seeded().await;
        let (service, _) = service(&db);

        let cart = service
            .create(4, &[("p-plat".to_string(), 2)], "user-1")
            .await
            .unwrap();
        let cart = service.add_line(&cart.id, "p-plat", 1).await.unwrap();

        let lines = service.lines(&cart.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 3);
        assert_eq!(cart.total(), Money::from_cents(4500));
        assert_eq!(
            db.products().get_by_id("p-plat").await.unwrap().unwrap().stock,
            17
        );
    }

    #[tokio::test]
    async fn test_merged_line_prices_bundle_across_quantities() {
        let db = seeded().await;
        let (service, _) = service(&db);

        // 2 then 1 more: merged quantity 3 hits the 3-for-25.00 bundle
        let cart = service
            .create(4, &[("p-promo".to_string(), 2)], "user-1")
            .await
            .unwrap();
        assert_eq!(cart.total(), Money::from_cents(2000));

        let cart = service.add_line(&cart.id, "p-promo", 1).await.unwrap();
        assert_eq!(cart.total(), Money::from_cents(2500));
    }

    #[tokio::test]
    async fn test_add_line_unknown_product() {
        let db = seeded().await;
        let (service, _) = service(&db);
        let cart = service.create(4, &[], "user-1").await.unwrap();

        let err = service.add_line(&cart.id, "nope", 1).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_clear_lines_keeps_stock_decremented() {
        let db = seeded().await;
        let (service, _) = service(&db);
        let cart = service
            .create(4, &[("p-plat".to_string(), 2)], "user-1")
            .await
            .unwrap();

        let removed = service.clear_lines(&cart.id).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(service.get_total(&cart.id).await.unwrap(), Money::zero());
        assert!(service.lines(&cart.id).await.unwrap().is_empty());
        // stock stays sold, audit trail untouched
        assert_eq!(
            db.products().get_by_id("p-plat").await.unwrap().unwrap().stock,
            18
        );
        assert_eq!(db.stock_history().count_for_product("p-plat").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_recalculate_total_is_idempotent() {
        let db = seeded().await;
        let (service, _) = service(&db);
        let cart = service
            .create(
                4,
                &[("p-plat".to_string(), 2), ("p-promo".to_string(), 4)],
                "user-1",
            )
            .await
            .unwrap();

        let first = service.recalculate_total(&cart.id).await.unwrap();
        let second = service.recalculate_total(&cart.id).await.unwrap();
        assert_eq!(first, second);
        // 2 x 15.00 + bundle(25.00) + 1 x 10.00
        assert_eq!(first, Money::from_cents(3000 + 2500 + 1000));
        assert_eq!(service.get_total(&cart.id).await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_total_always_equals_sum_of_subtotals() {
        let db = seeded().await;
        let (service, _) = service(&db);
        let cart = service
            .create(
                4,
                &[("p-plat".to_string(), 1), ("p-the".to_string(), 2)],
                "user-1",
            )
            .await
            .unwrap();
        let cart = service.add_line(&cart.id, "p-promo", 5).await.unwrap();

        let lines = service.lines(&cart.id).await.unwrap();
        let sum: i64 = lines.iter().map(|l| l.subtotal_cents).sum();
        assert_eq!(cart.total_cents, sum);
    }

    #[tokio::test]
    async fn test_mutations_require_open_state() {
        let db = seeded().await;
        let (service, _) = service(&db);
        let cart = service.create(4, &[], "user-1").await.unwrap();

        // flip to paid directly, bypassing checkout
        let mut tx = db.begin().await.unwrap();
        db.carts().mark_paid(&mut tx, &cart.id).await.unwrap();
        tx.commit().await.unwrap();

        for err in [
            service.add_line(&cart.id, "p-plat", 1).await.unwrap_err(),
            service.clear_lines(&cart.id).await.unwrap_err(),
            service.recalculate_total(&cart.id).await.unwrap_err(),
        ] {
            assert!(matches!(
                err,
                EngineError::Core(CoreError::InvalidState { .. })
            ));
        }
    }
}

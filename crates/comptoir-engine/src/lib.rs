//! # Comptoir Engine
//!
//! Transactional workflows for the Comptoir POS backend. This crate sits
//! between the pure domain logic in `comptoir-core` and the storage layer
//! in `comptoir-db`, and owns every transaction boundary.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        comptoir-engine                          │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │ CartService  │   │ StockLedger  │   │   Checkout   │         │
//! │  │              │──▶│              │   │              │         │
//! │  │ create       │   │ decrease     │   │ validate_    │         │
//! │  │ add_line     │   │ increase     │   │   and_pay    │         │
//! │  │ clear_lines  │   │ is_low       │   │              │         │
//! │  └──────┬───────┘   └──────┬───────┘   └──────┬───────┘         │
//! │         │                  │                  │                 │
//! │         └────────── one transaction ──────────┘                 │
//! │                            │                         ┌────────┐ │
//! │                            ▼                         │Printer │ │
//! │                      comptoir-db                     │ (seam) │ │
//! │                                                      └────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutation runs inside a single SQLite transaction obtained from
//! [`comptoir_db::Database::begin`], so a cart, its lines, the stock
//! decrement, and the audit entry commit or roll back together. Printing
//! happens strictly after commit and never affects the outcome.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod error;
pub mod printer;
pub mod stock;

pub use cart::CartService;
pub use catalog::{CatalogService, ProductInput};
pub use checkout::{Checkout, CheckoutReceipt};
pub use error::{EngineError, EngineResult};
pub use printer::{LogPrinter, Printer, ReceiptLine};
pub use stock::StockLedger;

#[cfg(test)]
pub(crate) mod test_util {
    use chrono::Utc;
    use comptoir_core::Product;
    use comptoir_db::{Database, DbConfig};

    /// Fresh in-memory database seeded with the given products.
    pub async fn db_with_products(products: Vec<Product>) -> Database {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let db = Database::new(DbConfig::in_memory())
            .await
            .expect("in-memory database");
        for p in &products {
            db.products().insert(p).await.expect("seed product");
        }
        db
    }

    /// A plain product with no promotion.
    pub fn product(id: &str, name: &str, price_cents: i64, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            name: name.to_string(),
            category: "Plats".to_string(),
            price_cents,
            stock,
            promo_qty: None,
            promo_price_cents: None,
            image_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A product carrying a bundle promotion (`promo_qty` units for
    /// `promo_price_cents` total).
    pub fn promo_product(
        id: &str,
        name: &str,
        price_cents: i64,
        stock: i64,
        promo_qty: i64,
        promo_price_cents: i64,
    ) -> Product {
        let mut p = product(id, name, price_cents, stock);
        p.promo_qty = Some(promo_qty);
        p.promo_price_cents = Some(promo_price_cents);
        p
    }
}

//! # Domain Types
//!
//! Core domain types used throughout Comptoir POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                │
//! │                                                                     │
//! │  ┌───────────────┐    ┌───────────────┐    ┌───────────────────┐   │
//! │  │    Product    │    │     Cart      │    │     Payment       │   │
//! │  │  ───────────  │    │  ───────────  │    │  ───────────────  │   │
//! │  │  id (UUID)    │◄───│  id (UUID)    │◄───│  id (UUID)        │   │
//! │  │  price_cents  │    │  table_number │    │  cart_id (1:1)    │   │
//! │  │  stock        │    │  state        │    │  amount_due_cents │   │
//! │  │  promo_*      │    │  total_cents  │    │  change_cents     │   │
//! │  └───────┬───────┘    └───────┬───────┘    └───────────────────┘   │
//! │          │                    │                                     │
//! │  ┌───────▼────────────┐  ┌────▼─────────┐   ┌──────────────────┐   │
//! │  │ StockHistoryEntry  │  │   LineItem   │   │ Journal (+lines) │   │
//! │  │ append-only audit  │  │ qty/subtotal │   │ by-value snapshot│   │
//! │  └────────────────────┘  └──────────────┘   └──────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership Model
//! A Cart owns its LineItems by id: lines carry a `cart_id` lookup reference
//! but never a live back-pointer, and all mutation authority lives in the
//! engine's cart operations. Journal lines copy product data by value so
//! later product edits cannot alter history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::pricing::Promotion;
use crate::LOW_STOCK_THRESHOLD;

// =============================================================================
// Product
// =============================================================================

/// A product on the menu.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown on the POS grid and on receipts.
    pub name: String,

    /// Menu category (e.g. "Boissons", "Plats").
    pub category: String,

    /// Unit price in cents.
    pub price_cents: i64,

    /// Current stock level. Never negative; the stock ledger enforces this.
    pub stock: i64,

    /// Bundle size for the promotion, if any ("every N units...").
    pub promo_qty: Option<i64>,

    /// Total price in cents for one full bundle ("...cost P total").
    pub promo_price_cents: Option<i64>,

    /// Path to the product image (upload/storage handled elsewhere).
    pub image_path: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the bundle promotion, if both fields are set.
    ///
    /// Validity (positive bundle size, non-negative price) is judged by the
    /// pricing engine, not here.
    pub fn promotion(&self) -> Option<Promotion> {
        match (self.promo_qty, self.promo_price_cents) {
            (Some(qty), Some(price)) => Some(Promotion::new(qty, Money::from_cents(price))),
            _ => None,
        }
    }

    /// True iff stock is at or below the low-stock threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock <= LOW_STOCK_THRESHOLD
    }
}

// =============================================================================
// Cart State
// =============================================================================

/// Lifecycle state of a cart: OPEN → PAID, terminal.
///
/// Every mutating operation requires OPEN; a PAID cart is read-only and
/// retained forever for audit (the journal holds its snapshot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum CartState {
    /// Order in progress; lines may be added, cleared, recalculated.
    Open,
    /// Finalized by payment; immutable from here on.
    Paid,
}

impl Default for CartState {
    fn default() -> Self {
        CartState::Open
    }
}

// =============================================================================
// Cart
// =============================================================================

/// An open order for one table visit ("panier" in the source domain).
///
/// `total_cents` is derived: it must always equal the sum of line subtotals
/// after save. The engine recomputes it through named functions; it is never
/// accepted from a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Cart {
    pub id: String,

    /// Table number; unique among OPEN carts.
    pub table_number: i64,

    pub state: CartState,

    /// The user who opened the cart (passed explicitly by the caller,
    /// never pulled from ambient context).
    pub user_id: String,

    /// Derived total in cents: sum of line subtotals.
    pub total_cents: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.state == CartState::Open
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// One product-quantity-subtotal tuple within a cart.
///
/// Owned exclusively by its cart (removed when the cart's lines are cleared);
/// references its product by id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LineItem {
    pub id: String,
    pub cart_id: String,
    pub product_id: String,

    /// Quantity ordered (always positive).
    pub quantity: i64,

    /// Unit price in cents captured when the line was last touched.
    /// When unset, recalculation re-derives it from the product's
    /// current price.
    pub unit_price_cents: Option<i64>,

    /// Derived subtotal in cents; always recomputed through the pricing
    /// engine, never independently assigned.
    pub subtotal_cents: i64,

    pub created_at: DateTime<Utc>,
}

impl LineItem {
    #[inline]
    pub fn unit_price(&self) -> Option<Money> {
        self.unit_price_cents.map(Money::from_cents)
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

// =============================================================================
// Stock History
// =============================================================================

/// Kind of stock adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum StockChangeType {
    /// Stock decreased by a sale (cart creation or add-line).
    Sale,
    /// Stock increased by a restock.
    Restock,
}

/// Immutable audit record of one stock adjustment.
///
/// Exactly one entry is written per successful ledger call; entries are
/// never mutated, merged, or deleted. This table is the only source of
/// truth for stock-change history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockHistoryEntry {
    pub id: String,
    pub product_id: String,

    /// Signed delta: negative for sales, positive for restocks.
    pub quantity_delta: i64,

    /// Stock level after the adjustment was applied.
    pub stock_after: i64,

    pub change_type: StockChangeType,

    /// Free-text reason ("Sale through POS", restock note, ...).
    pub reason: String,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Payment
// =============================================================================

/// The payment that finalized a cart. One-to-one with the cart.
///
/// `amount_due_cents` is copied from the cart total at finalization time on
/// the server side; it is never client-supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: String,
    pub cart_id: String,
    pub table_number: i64,
    pub amount_due_cents: i64,
    pub cash_received_cents: i64,
    pub change_cents: i64,

    /// The user who took the payment.
    pub user_id: String,

    pub created_at: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn amount_due(&self) -> Money {
        Money::from_cents(self.amount_due_cents)
    }

    #[inline]
    pub fn change(&self) -> Money {
        Money::from_cents(self.change_cents)
    }
}

// =============================================================================
// Journal
// =============================================================================

/// Immutable snapshot of a finalized cart.
///
/// Holds the cart id for traceability but no live foreign key: the journal
/// must stay readable and unchanged even if products are edited later.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Journal {
    pub id: String,
    pub cart_id: String,
    pub table_number: i64,
    pub total_cents: i64,
    pub cash_received_cents: i64,
    pub change_cents: i64,
    pub paid_at: DateTime<Utc>,
}

/// One flattened line of a journal snapshot, copied by value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct JournalLine {
    pub id: String,
    pub journal_id: String,

    /// Product name at payment time (frozen).
    pub product_name: String,

    pub quantity: i64,

    /// Unit price in cents at payment time (frozen).
    pub unit_price_cents: i64,

    /// Subtotal in cents at payment time (frozen).
    pub subtotal_cents: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64, promo: Option<(i64, i64)>) -> Product {
        Product {
            id: "p-1".to_string(),
            name: "Thé à la menthe".to_string(),
            category: "Boissons".to_string(),
            price_cents: 1000,
            stock,
            promo_qty: promo.map(|(q, _)| q),
            promo_price_cents: promo.map(|(_, p)| p),
            image_path: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_promotion_requires_both_fields() {
        assert!(product(5, None).promotion().is_none());
        assert!(product(5, Some((3, 2500))).promotion().is_some());

        let mut half = product(5, Some((3, 2500)));
        half.promo_price_cents = None;
        assert!(half.promotion().is_none());
    }

    #[test]
    fn test_low_stock() {
        assert!(product(10, None).is_low_stock());
        assert!(product(0, None).is_low_stock());
        assert!(!product(11, None).is_low_stock());
    }

    #[test]
    fn test_cart_state_default() {
        assert_eq!(CartState::default(), CartState::Open);
    }
}

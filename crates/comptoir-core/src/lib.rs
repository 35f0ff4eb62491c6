//! # comptoir-core: Pure Business Logic for Comptoir POS
//!
//! This crate is the **heart** of Comptoir POS. It contains all business
//! logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Comptoir POS Architecture                        │
//! │                                                                     │
//! │  ┌───────────────────────────────────────────────────────────────┐ │
//! │  │                  comptoir-engine                              │ │
//! │  │   cart lifecycle ── stock ledger ── checkout ── printer seam  │ │
//! │  └──────────────────────────────┬────────────────────────────────┘ │
//! │                                 │                                   │
//! │  ┌──────────────────────────────▼────────────────────────────────┐ │
//! │  │              ★ comptoir-core (THIS CRATE) ★                   │ │
//! │  │                                                               │ │
//! │  │   ┌─────────┐  ┌─────────┐  ┌─────────┐  ┌────────────┐      │ │
//! │  │   │  money  │  │ pricing │  │  types  │  │ validation │      │ │
//! │  │   │  Money  │  │ bundles │  │ Product │  │   rules    │      │ │
//! │  │   └─────────┘  └─────────┘  │  Cart   │  └────────────┘      │ │
//! │  │                             └─────────┘                      │ │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS          │ │
//! │  └──────────────────────────────┬────────────────────────────────┘ │
//! │                                 │                                   │
//! │  ┌──────────────────────────────▼────────────────────────────────┐ │
//! │  │                  comptoir-db (SQLite layer)                   │ │
//! │  └───────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Cart, LineItem, Payment, Journal)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`pricing`] - Bundle-promotion pricing engine
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//! 5. **Explicit Recomputation**: subtotals and totals are recomputed by named
//!    functions called from the engine, never as hidden setter side effects

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{price_for, Promotion};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Stock level at or below which a product counts as "low stock".
///
/// ## Business Reason
/// Drives the low-stock warning on the product grid so the kitchen can
/// reorder before running out mid-service. Configurable per restaurant in a
/// later version; fixed here.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// Maximum number of distinct lines allowed in a single cart.
///
/// ## Business Reason
/// Prevents runaway carts and keeps receipts printable on one ticket.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line in a cart.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g. typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

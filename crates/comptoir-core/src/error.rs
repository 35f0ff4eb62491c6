//! # Error Types
//!
//! Domain-specific error types for comptoir-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                 │
//! │                                                                     │
//! │  comptoir-core errors (this file)                                   │
//! │  ├── CoreError        - Business rule violations                    │
//! │  └── ValidationError  - Input validation failures                   │
//! │                                                                     │
//! │  comptoir-db errors (separate crate)                                │
//! │  └── DbError          - Database operation failures                 │
//! │                                                                     │
//! │  comptoir-engine errors                                             │
//! │  └── EngineError      - Core | Db, what callers of the engine see   │
//! │                                                                     │
//! │  Flow: ValidationError → CoreError → EngineError → caller           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All of these are recoverable, request-scoped failures: they abort the
//! current transaction (no partial writes) and carry enough context for the
//! caller to retry or correct input. None should crash the process.

use thiserror::Error;

use crate::money::Money;
use crate::types::CartState;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations in the order/inventory engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product id unknown.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Cart id unknown.
    #[error("Cart not found: {0}")]
    CartNotFound(String),

    /// A mutating operation hit a cart that is no longer OPEN.
    ///
    /// ## When This Occurs
    /// - Adding a line to a paid cart
    /// - Clearing or recalculating a paid cart
    /// - Paying a cart twice
    #[error("Cart {cart_id} is {state:?}, cannot perform operation")]
    InvalidState { cart_id: String, state: CartState },

    /// Another OPEN cart already holds this table.
    #[error("Table {table_number} is already occupied by an open cart")]
    TableOccupied { table_number: i64 },

    /// A stock decrement would exceed availability.
    ///
    /// ## When This Occurs
    /// ```text
    /// addLine(qty: 5)
    ///      │
    ///      ▼
    /// guarded decrement: available = 3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Thé à la menthe", available: 3, requested: 5 }
    /// ```
    /// Stock is unchanged when this is returned.
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Cash tendered is below the cart total.
    #[error("Insufficient payment: due {due}, received {received}")]
    InsufficientPayment { due: Money, received: Money },

    /// Checkout attempted on a cart with no lines.
    #[error("Cart {cart_id} has no lines, nothing to pay")]
    EmptyCart { cart_id: String },

    /// Non-positive quantity where a positive one is required
    /// (e.g. restock amount).
    #[error("Invalid quantity: {quantity} (must be positive)")]
    InvalidQuantity { quantity: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustBeNonNegative { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

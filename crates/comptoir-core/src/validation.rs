//! # Validation Module
//!
//! Input validation utilities for Comptoir POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                              │
//! │                                                                     │
//! │  Layer 1: Engine entry points (this module)                         │
//! │  └── Business-rule checks before any transaction starts            │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 2: Database (SQLite)                                         │
//! │  ├── CHECK (stock >= 0), CHECK (quantity > 0)                       │
//! │  └── UNIQUE open-table index                                        │
//! │                                                                     │
//! │  Multiple layers catch different errors.                            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::MAX_LINE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product name: non-empty, at most 200 characters.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a restock reason: non-empty, at most 500 characters.
///
/// An unexplained stock adjustment defeats the point of the audit ledger,
/// so the reason is mandatory.
pub fn validate_restock_reason(reason: &str) -> ValidationResult<()> {
    let reason = reason.trim();

    if reason.is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        });
    }

    if reason.len() > 500 {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: 500,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity: positive, at most [`MAX_LINE_QUANTITY`].
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if quantity > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a table number: positive.
pub fn validate_table_number(table_number: i64) -> ValidationResult<()> {
    if table_number <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "table_number".to_string(),
        });
    }

    Ok(())
}

/// Validates cash tendered at checkout: non-negative cents.
///
/// Whether the amount covers the cart total is the finalization workflow's
/// decision, not a validation concern.
pub fn validate_cash_received(cash_cents: i64) -> ValidationResult<()> {
    if cash_cents < 0 {
        return Err(ValidationError::MustBeNonNegative {
            field: "cash_received".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

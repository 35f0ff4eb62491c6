//! # Pricing Engine
//!
//! Pure subtotal computation for cart lines, including bundle promotions.
//!
//! ## Bundle Promotions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  "k items for price P"                                              │
//! │                                                                     │
//! │  Product: Mint tea, unit price 10.00, promo (3 for 25.00)           │
//! │  Quantity ordered: 7                                                │
//! │                                                                     │
//! │  bundles   = 7 div 3 = 2   →  2 × 25.00 = 50.00                     │
//! │  remainder = 7 mod 3 = 1   →  1 × 10.00 = 10.00                     │
//! │                               ─────────────────                     │
//! │  subtotal                              = 60.00                      │
//! │                                                                     │
//! │  A malformed promotion (qty ≤ 0 or negative price) is ignored and   │
//! │  the line falls back to plain unit pricing.                         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This module is deliberately free of any cart or product plumbing: the
//! engine calls [`price_for`] with plain values so the promotion rules stay
//! independently testable.

use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Promotion
// =============================================================================

/// A bundle promotion: every `qty` units cost `price` total, remainder at
/// the unit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    /// Bundle size (must be > 0 to take effect).
    pub qty: i64,
    /// Total price for one full bundle (must be >= 0 to take effect).
    pub price: Money,
}

impl Promotion {
    pub const fn new(qty: i64, price: Money) -> Self {
        Promotion { qty, price }
    }

    /// A promotion only applies when the bundle size is positive and the
    /// bundle price non-negative. Anything else is treated as "no promo".
    #[inline]
    pub const fn is_applicable(&self) -> bool {
        self.qty > 0 && !self.price.is_negative()
    }
}

// =============================================================================
// price_for
// =============================================================================

/// Computes a line subtotal for `quantity` units at `unit_price`, applying
/// an optional bundle promotion.
///
/// ## Rules
/// - No promotion, or a malformed one (`qty <= 0`, negative bundle price),
///   or `quantity <= 0`: plain `unit_price * quantity`.
/// - Otherwise: `promo.price * (quantity div promo.qty)
///   + unit_price * (quantity mod promo.qty)`.
/// - A negative unit price is clamped to zero before pricing.
/// - The result is never negative.
///
/// Pure and deterministic; no side effects.
///
/// ## Example
/// ```rust
/// use comptoir_core::money::Money;
/// use comptoir_core::pricing::{price_for, Promotion};
///
/// let unit = Money::from_cents(1000); // 10.00
/// let promo = Promotion::new(3, Money::from_cents(2500)); // 3 for 25.00
///
/// assert_eq!(price_for(unit, 7, Some(promo)).cents(), 6000); // 60.00
/// assert_eq!(price_for(unit, 7, None).cents(), 7000);
/// ```
pub fn price_for(unit_price: Money, quantity: i64, promo: Option<Promotion>) -> Money {
    // Missing prices arrive here as zero; a negative one is equally bogus.
    let unit_price = unit_price.clamp_non_negative();

    if quantity <= 0 {
        return Money::zero();
    }

    let subtotal = match promo {
        Some(p) if p.is_applicable() => {
            let bundles = quantity / p.qty;
            let remainder = quantity % p.qty;
            p.price * bundles + unit_price * remainder
        }
        _ => unit_price * quantity,
    };

    subtotal.clamp_non_negative()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_pricing() {
        // For all q > 0, p >= 0: price_for(p, q, none) == p * q
        let unit = Money::from_cents(1500);
        assert_eq!(price_for(unit, 1, None).cents(), 1500);
        assert_eq!(price_for(unit, 2, None).cents(), 3000);
        assert_eq!(price_for(Money::zero(), 5, None).cents(), 0);
    }

    #[test]
    fn test_bundle_promotion() {
        // Unit 10.00, promo (3 for 25.00), quantity 7 → 25*2 + 10*1 = 60.00
        let unit = Money::from_cents(1000);
        let promo = Promotion::new(3, Money::from_cents(2500));

        assert_eq!(price_for(unit, 7, Some(promo)).cents(), 6000);
        // Exact bundles: no remainder priced at unit
        assert_eq!(price_for(unit, 6, Some(promo)).cents(), 5000);
        // Below one bundle: pure unit pricing via the remainder
        assert_eq!(price_for(unit, 2, Some(promo)).cents(), 2000);
    }

    #[test]
    fn test_malformed_promotion_falls_back_to_unit_price() {
        let unit = Money::from_cents(1000);

        let zero_qty = Promotion::new(0, Money::from_cents(2500));
        assert_eq!(price_for(unit, 4, Some(zero_qty)).cents(), 4000);

        let negative_qty = Promotion::new(-3, Money::from_cents(2500));
        assert_eq!(price_for(unit, 4, Some(negative_qty)).cents(), 4000);

        let negative_price = Promotion::new(3, Money::from_cents(-1));
        assert_eq!(price_for(unit, 4, Some(negative_price)).cents(), 4000);
    }

    #[test]
    fn test_non_positive_quantity_prices_to_zero() {
        let unit = Money::from_cents(1000);
        let promo = Promotion::new(3, Money::from_cents(2500));

        assert_eq!(price_for(unit, 0, None).cents(), 0);
        assert_eq!(price_for(unit, -2, None).cents(), 0);
        assert_eq!(price_for(unit, 0, Some(promo)).cents(), 0);
    }

    #[test]
    fn test_negative_unit_price_clamped() {
        assert_eq!(price_for(Money::from_cents(-500), 3, None).cents(), 0);

        // Bundles still price normally with a clamped unit remainder
        let promo = Promotion::new(2, Money::from_cents(900));
        assert_eq!(
            price_for(Money::from_cents(-500), 5, Some(promo)).cents(),
            1800
        );
    }

    #[test]
    fn test_never_negative() {
        // No combination of inputs may produce a negative subtotal
        let cases = [
            (Money::from_cents(-1000), 7, None),
            (Money::from_cents(0), -1, None),
            (
                Money::from_cents(-10),
                3,
                Some(Promotion::new(3, Money::from_cents(-10))),
            ),
        ];
        for (unit, qty, promo) in cases {
            assert!(!price_for(unit, qty, promo).is_negative());
        }
    }

    #[test]
    fn test_promotion_applicability() {
        assert!(Promotion::new(3, Money::from_cents(2500)).is_applicable());
        assert!(Promotion::new(1, Money::zero()).is_applicable());
        assert!(!Promotion::new(0, Money::from_cents(2500)).is_applicable());
        assert!(!Promotion::new(3, Money::from_cents(-1)).is_applicable());
    }
}

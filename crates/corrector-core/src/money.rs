//! # Money Module
//!
//! Provides the `Money` type for monetary values on fiscal receipts.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  A receipt total is written once, then every payment component is      │
//! │  written separately. With floats, 0.1 + 0.2 != 0.3, and the device     │
//! │  rejects the receipt as "not fully paid" (code 66).                    │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Kopecks                                          │
//! │    Totals and payments are summed as i64 and converted exactly once,   │
//! │    at the transport boundary.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use corrector_core::money::Money;
//!
//! let price = Money::from_kopecks(9_990); // 99.90
//! let total = price + Money::from_kopecks(10); // 100.00
//! assert_eq!(total.rubles(), 100);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// Monetary value in the smallest currency unit (kopecks).
///
/// ## Design Decisions
/// - **i64 (signed)**: refunds and corrections can carry negative deltas
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **serde transparent**: the OFD feed already reports sums in kopecks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from kopecks (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use corrector_core::money::Money;
    ///
    /// let price = Money::from_kopecks(1099);
    /// assert_eq!(price.kopecks(), 1099);
    /// ```
    #[inline]
    pub const fn from_kopecks(kopecks: i64) -> Self {
        Money(kopecks)
    }

    /// Returns the value in kopecks.
    #[inline]
    pub const fn kopecks(&self) -> i64 {
        self.0
    }

    /// Returns the whole-ruble portion.
    #[inline]
    pub const fn rubles(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the kopeck portion (always 0-99).
    #[inline]
    pub const fn kopecks_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is strictly greater than zero.
    ///
    /// Payment components are only applied on the device when this holds.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a (possibly fractional) quantity.
    ///
    /// Rounds half away from zero, which is how fiscal registers round
    /// position sums.
    ///
    /// ## Example
    /// ```rust
    /// use corrector_core::money::Money;
    ///
    /// // 0.333 kg at 99.99 per kg = 33.29667 → 33.30
    /// let sum = Money::from_kopecks(9_999).times_quantity(0.333);
    /// assert_eq!(sum.kopecks(), 3_330);
    /// ```
    pub fn times_quantity(&self, quantity: f64) -> Money {
        Money((self.0 as f64 * quantity).round() as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.rubles().abs(), self.kopecks_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_kopecks() {
        let money = Money::from_kopecks(1099);
        assert_eq!(money.kopecks(), 1099);
        assert_eq!(money.rubles(), 10);
        assert_eq!(money.kopecks_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_kopecks(1099).to_string(), "10.99");
        assert_eq!(Money::from_kopecks(500).to_string(), "5.00");
        assert_eq!(Money::from_kopecks(-550).to_string(), "-5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_sign_checks() {
        assert!(!Money::zero().is_positive());
        assert!(Money::from_kopecks(1).is_positive());
        assert!(Money::from_kopecks(-1).is_negative());
        assert!(Money::zero().is_zero());
    }

    #[test]
    fn test_times_quantity_rounds_half_away_from_zero() {
        assert_eq!(Money::from_kopecks(299).times_quantity(3.0).kopecks(), 897);
        assert_eq!(Money::from_kopecks(5).times_quantity(0.5).kopecks(), 3);
        assert_eq!(Money::from_kopecks(-5).times_quantity(0.5).kopecks(), -3);
    }

    #[test]
    fn test_sum_of_payments_is_exact() {
        // Ten payments of 0.10 must equal exactly 1.00
        let total: Money = std::iter::repeat(Money::from_kopecks(10)).take(10).sum();
        assert_eq!(total, Money::from_kopecks(100));
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&Money::from_kopecks(12_345)).unwrap();
        assert_eq!(json, "12345");
    }
}

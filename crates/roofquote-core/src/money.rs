//! # Money Module
//!
//! Provides the `Money` type for invoice amounts.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Catalog prices arrive as floats (36.5, 0.1, 18.99).                    │
//! │  Summing float line totals drifts:                                      │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌                                   │
//! │                                                                         │
//! │  OUR SOLUTION: round each line ONCE into integer cents                  │
//! │    line_total = round_cents(quantity × unit_price)                      │
//! │    invoice total = Σ line totals (exact integer sum)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! On the wire amounts are dollars (`"Total_Price": 2810.5`); the
//! [`as_dollars`] serde adapter converts at the boundary.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

use crate::types::TaxRate;

/// `i64::MAX` as a float rounds up to 2^63, the first out-of-range value.
const MAX_CENTS_F64: f64 = 9_223_372_036_854_775_808.0;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in cents.
///
/// ## Where Money is Used
/// ```text
/// ProductRecord.unit_price (f64) ──► InvoiceLine.total_price ──► Summary.total
///                                                                   │
///                                   OrderReview: + other charges + tax
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use roofquote_core::money::Money;
    ///
    /// let price = Money::from_cents(3650); // $36.50
    /// assert_eq!(price.cents(), 3650);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from a dollar amount, rounding half away from
    /// zero to the nearest cent.
    ///
    /// ## Example
    /// ```rust
    /// use roofquote_core::money::Money;
    ///
    /// assert_eq!(Money::from_dollars(36.5).cents(), 3650);
    /// assert_eq!(Money::from_dollars(0.125).cents(), 13);
    /// assert_eq!(Money::from_dollars(-2.5).cents(), -250);
    /// ```
    pub fn from_dollars(amount: f64) -> Self {
        // Nudge by a tiny epsilon so 0.125 (stored as 0.12499999...) still
        // rounds up like a human would.
        let scaled = amount * 100.0;
        let nudged = scaled + scaled.signum() * 1e-7;
        Money(nudged.round() as i64)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-dollar portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns the amount as a float dollar value (wire format only).
    #[inline]
    pub fn to_dollars(&self) -> f64 {
        self.0 as f64 / 100.0
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

    /// Checks if the value is negative (a line with a non-positive quantity).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Prices `quantity` units at a float unit price, rounded once to cents.
    ///
    /// ## Returns
    /// `None` when the total is not finite or does not fit in `i64` cents.
    ///
    /// ## Example
    /// ```rust
    /// use roofquote_core::money::Money;
    ///
    /// // 77 bundles at $36.50
    /// assert_eq!(Money::line_total(77, 36.5).map(|m| m.cents()), Some(281_050));
    /// // Non-positive quantities are priced too
    /// assert_eq!(Money::line_total(-1, 12.0).map(|m| m.cents()), Some(-1_200));
    /// // Out of range
    /// assert_eq!(Money::line_total(i64::MAX, 50.0), None);
    /// ```
    pub fn line_total(quantity: i64, unit_price: f64) -> Option<Self> {
        let dollars = quantity as f64 * unit_price;
        // 2^63 itself is already out of range for i64
        if !dollars.is_finite() || (dollars * 100.0).abs() >= MAX_CENTS_F64 {
            return None;
        }
        Some(Money::from_dollars(dollars))
    }

    /// Adds two amounts, returning `None` on overflow.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Sums amounts, returning `None` if any partial sum overflows.
    ///
    /// ## Example
    /// ```rust
    /// use roofquote_core::money::Money;
    ///
    /// let lines = [Money::from_cents(30), Money::from_cents(60)];
    /// assert_eq!(Money::checked_sum(lines), Some(Money::from_cents(90)));
    /// assert_eq!(Money::checked_sum([Money::from_cents(i64::MAX), Money::from_cents(1)]), None);
    /// ```
    pub fn checked_sum<I>(amounts: I) -> Option<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }

    /// Calculates tax on this amount, rounding half up.
    ///
    /// ## Implementation
    /// Integer math: `(amount * rate + 5000) / 10000`
    ///
    /// ## Example
    /// ```rust
    /// use roofquote_core::money::Money;
    /// use roofquote_core::types::TaxRate;
    ///
    /// let subtotal = Money::from_cents(1000); // $10.00
    /// let tax = subtotal.calculate_tax(TaxRate::from_bps(825)); // 8.25%
    /// assert_eq!(tax.cents(), 83);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 keeps large invoices from overflowing
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows money as `$2810.50` (debugging and log lines).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
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

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Serde Adapter
// =============================================================================

/// Serializes [`Money`] as a float dollar amount and back.
///
/// ## Usage
/// ```rust,ignore
/// #[serde(rename = "Total_Price", with = "crate::money::as_dollars")]
/// pub total_price: Money,
/// ```
pub mod as_dollars {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Money;

    pub fn serialize<S: Serializer>(money: &Money, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(money.to_dollars())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Money, D::Error> {
        let dollars = f64::deserialize(deserializer)?;
        Ok(Money::from_dollars(dollars))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(281_050);
        assert_eq!(money.cents(), 281_050);
        assert_eq!(money.dollars(), 2810);
        assert_eq!(money.cents_part(), 50);
    }

    #[test]
    fn test_from_dollars_rounds_to_nearest_cent() {
        assert_eq!(Money::from_dollars(18.99).cents(), 1899);
        assert_eq!(Money::from_dollars(0.1 + 0.2).cents(), 30);
        assert_eq!(Money::from_dollars(2.675).cents(), 268);
        assert_eq!(Money::from_dollars(0.0).cents(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(281_050)), "$2810.50");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::zero()), "$0.00");
    }

    #[test]
    fn test_line_total() {
        assert_eq!(Money::line_total(3, 54.25).unwrap().cents(), 16_275);
        assert_eq!(Money::line_total(0, 54.25).unwrap().cents(), 0);
        assert!(Money::line_total(-2, 5.0).unwrap().is_negative());
    }

    #[test]
    fn test_line_total_out_of_range() {
        // 1e18 bundles at $50.00 is 5e21 cents
        assert_eq!(Money::line_total(1_000_000_000_000_000_000, 50.0), None);
        assert_eq!(Money::line_total(-1_000_000_000_000_000_000, 50.0), None);
        assert_eq!(Money::line_total(1, f64::INFINITY), None);
        assert_eq!(Money::line_total(1, f64::NAN), None);
        // Largest quantity that still fits at $1.00
        assert!(Money::line_total(90_000_000_000_000_000, 1.0).is_some());
    }

    #[test]
    fn test_checked_sum_overflow() {
        let near_max = Money::from_cents(i64::MAX - 10);
        assert_eq!(near_max.checked_add(Money::from_cents(10)), Some(Money::from_cents(i64::MAX)));
        assert_eq!(near_max.checked_add(Money::from_cents(11)), None);
        assert_eq!(Money::checked_sum([near_max, near_max]), None);
        assert_eq!(Money::checked_sum(Vec::new()), Some(Money::zero()));
    }

    #[test]
    fn test_sum_is_exact() {
        let lines = vec![
            Money::from_dollars(0.1),
            Money::from_dollars(0.2),
            Money::from_dollars(0.3),
        ];
        let total: Money = lines.iter().sum();
        assert_eq!(total.cents(), 60);
        assert_eq!(total.to_dollars(), 0.6);
    }

    #[test]
    fn test_tax_calculation_with_rounding() {
        // $10.00 at 8.25% = $0.825 → $0.83
        let amount = Money::from_cents(1000);
        let tax = amount.calculate_tax(TaxRate::from_bps(825));
        assert_eq!(tax.cents(), 83);

        assert!(amount.calculate_tax(TaxRate::zero()).is_zero());
    }

    #[test]
    fn test_serde_as_dollars() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Wrapper {
            #[serde(with = "as_dollars")]
            amount: Money,
        }

        let json = serde_json::to_string(&Wrapper {
            amount: Money::from_cents(16_275),
        })
        .unwrap();
        assert_eq!(json, r#"{"amount":162.75}"#);

        let back: Wrapper = serde_json::from_str(r#"{"amount":36.5}"#).unwrap();
        assert_eq!(back.amount.cents(), 3650);
    }
}

//! Money rounding.
//!
//! Every monetary value stored on a run is rounded once, at the point it is
//! produced, to two decimal places with half-away-from-zero.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places kept on monetary amounts.
pub const MONEY_SCALE: u32 = 2;

/// Rounds a monetary amount to two decimal places, half away from zero.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::round_money;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// assert_eq!(round_money(Decimal::from_str("9166.668").unwrap()).to_string(), "9166.67");
/// assert_eq!(round_money(Decimal::from_str("0.005").unwrap()).to_string(), "0.01");
/// assert_eq!(round_money(Decimal::from_str("-0.005").unwrap()).to_string(), "-0.01");
/// ```
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Returns `percent`% of `base`, unrounded.
pub fn percent_of(base: Decimal, percent: Decimal) -> Decimal {
    base * percent / Decimal::ONE_HUNDRED
}

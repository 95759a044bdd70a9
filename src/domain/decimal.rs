//! Lossless decimal numeric type backed by rust_decimal.
//!
//! Bridges chain-native integer amounts (`U256` token units) into the
//! decimal value domain used for price normalization, vesting factors,
//! and reward ratios. Serializes as a string to keep checkpoint files
//! free of float drift.

use alloy::primitives::U256;
use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Scale used when converting decimal amounts to integer units for
/// proportional reward math (matches the 18-decimal reward token).
pub const VALUE_SCALE: u32 = 18;

#[derive(Debug, Error)]
pub enum DecimalError {
    #[error("value does not fit in the decimal range: {0}")]
    OutOfRange(String),
    #[error("negative value cannot be scaled to an unsigned integer")]
    Negative,
}

/// Lossless decimal value for normalized fee amounts and ratios.
///
/// Backed by rust_decimal (28 significant digits), which covers every
/// realistic ETH-denominated fee value while avoiding floating point.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::str")] RustDecimal);

impl Decimal {
    pub fn new(value: RustDecimal) -> Self {
        Decimal(value)
    }

    /// Parse a Decimal from a string losslessly.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s).map(Decimal)
    }

    /// Format as a canonical string (no exponent notation, no trailing zeros).
    pub fn to_canonical_string(&self) -> String {
        format!("{}", self.0.normalize())
    }

    pub fn inner(&self) -> RustDecimal {
        self.0
    }

    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    pub fn one() -> Self {
        Decimal(RustDecimal::ONE)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Strip trailing fractional zeros.
    pub fn normalize(&self) -> Self {
        Decimal(self.0.normalize())
    }

    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    /// Convert a raw token amount into a decimal value by shifting the
    /// token's decimal point, e.g. `1500000` with 6 decimals -> `1.5`.
    ///
    /// Amounts whose integral part exceeds 28 significant digits are a
    /// data-integrity problem upstream and surface as `OutOfRange`.
    pub fn from_raw_units(amount: U256, decimals: u32) -> Result<Self, DecimalError> {
        let digits = amount.to_string();
        let literal = if decimals == 0 {
            digits
        } else if digits.len() <= decimals as usize {
            format!("0.{:0>width$}", digits, width = decimals as usize)
        } else {
            let split = digits.len() - decimals as usize;
            format!("{}.{}", &digits[..split], &digits[split..])
        };
        RustDecimal::from_str(&literal)
            .map(Decimal)
            .map_err(|_| DecimalError::OutOfRange(literal))
    }

    /// Scale up by `10^scale` and truncate to an unsigned integer.
    ///
    /// Used to carry decimal account values into exact `U256` reward
    /// arithmetic. Truncation (round-down) is deliberate.
    pub fn to_scaled_integer(&self, scale: u32) -> Result<U256, DecimalError> {
        if self.is_negative() {
            return Err(DecimalError::Negative);
        }
        let factor = RustDecimal::from(10u128.pow(scale));
        let scaled = self
            .0
            .checked_mul(factor)
            .ok_or_else(|| DecimalError::OutOfRange(self.to_canonical_string()))?
            .trunc();
        U256::from_str(&scaled.to_string())
            .map_err(|_| DecimalError::OutOfRange(self.to_canonical_string()))
    }

    /// Floor ratio `numerator / denominator` of two unsigned integers as a
    /// decimal with 18 fractional digits.
    ///
    /// Exact at the boundaries: returns exactly 1 when the operands are
    /// equal and exactly 0 when the numerator is 0.
    pub fn ratio(numerator: U256, denominator: U256) -> Self {
        if denominator.is_zero() {
            return Self::zero();
        }
        let unit = U256::from(10u64).pow(U256::from(VALUE_SCALE));
        let scaled = numerator.saturating_mul(unit) / denominator;
        let scaled: u128 = scaled.to::<u128>();
        Decimal(RustDecimal::from_i128_with_scale(scaled as i128, VALUE_SCALE).normalize())
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<RustDecimal> for Decimal {
    fn from(value: RustDecimal) -> Self {
        Decimal(value)
    }
}

impl From<Decimal> for RustDecimal {
    fn from(value: Decimal) -> Self {
        value.0
    }
}

impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Decimal {
    fn add_assign(&mut self, rhs: Decimal) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 - rhs.0)
    }
}

impl std::ops::Mul for Decimal {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 * rhs.0)
    }
}

impl std::ops::Div for Decimal {
    type Output = Decimal;

    fn div(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 / rhs.0)
    }
}

impl std::ops::Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        Decimal(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roundtrip() {
        for s in ["123.456", "0.0001", "1000000", "0", "999999999.999999999"] {
            let decimal = Decimal::from_str_canonical(s).expect("parse failed");
            let reparsed = Decimal::from_str_canonical(&decimal.to_canonical_string())
                .expect("reparse failed");
            assert_eq!(decimal, reparsed, "roundtrip failed for {}", s);
        }
    }

    #[test]
    fn from_raw_units_shifts_decimal_point() {
        let v = Decimal::from_raw_units(U256::from(1_500_000u64), 6).unwrap();
        assert_eq!(v.to_canonical_string(), "1.5");

        let v = Decimal::from_raw_units(U256::from(42u64), 0).unwrap();
        assert_eq!(v.to_canonical_string(), "42");

        // Amount smaller than one whole unit.
        let v = Decimal::from_raw_units(U256::from(7u64), 18).unwrap();
        assert_eq!(v.to_canonical_string(), "0.000000000000000007");
    }

    #[test]
    fn from_raw_units_rejects_oversized_integral_part() {
        // 40 integral digits cannot be represented.
        let amount = U256::from_str("9999999999999999999999999999999999999999").unwrap();
        assert!(Decimal::from_raw_units(amount, 0).is_err());
    }

    #[test]
    fn to_scaled_integer_truncates() {
        let v = Decimal::from_str_canonical("1.2345").unwrap();
        assert_eq!(v.to_scaled_integer(3).unwrap(), U256::from(1234u64));
        assert_eq!(
            v.to_scaled_integer(18).unwrap(),
            U256::from(1_234_500_000_000_000_000u128)
        );
    }

    #[test]
    fn to_scaled_integer_rejects_negative() {
        let v = Decimal::from_str_canonical("-1").unwrap();
        assert!(matches!(
            v.to_scaled_integer(18),
            Err(DecimalError::Negative)
        ));
    }

    #[test]
    fn ratio_exact_boundaries() {
        let x = U256::from(123_456u64);
        assert_eq!(Decimal::ratio(x, x), Decimal::one());
        assert_eq!(Decimal::ratio(U256::ZERO, x), Decimal::zero());
        assert_eq!(Decimal::ratio(x, U256::ZERO), Decimal::zero());
    }

    #[test]
    fn ratio_simple_fraction() {
        let r = Decimal::ratio(U256::from(1u64), U256::from(4u64));
        assert_eq!(r.to_canonical_string(), "0.25");
    }

    #[test]
    fn serializes_as_string() {
        let v = Decimal::from_str_canonical("123.456").unwrap();
        let json = serde_json::to_value(v).unwrap();
        assert_eq!(json, serde_json::json!("123.456"));
    }
}

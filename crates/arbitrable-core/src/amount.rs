//! # Monetary Amounts and Stake Multipliers
//!
//! [`Amount`] is the only representation of value in the stack. It wraps a
//! `u128` count of the host ledger's smallest unit and exposes checked
//! arithmetic only: an overflow or underflow surfaces as `None` and the
//! caller turns it into an error, so no operation can silently wrap.
//!
//! ## Security Invariant
//!
//! Amounts serialize as decimal strings. JSON numbers lose precision above
//! 2^53 in most consumers, and a truncated balance is a lost balance.
//!
//! [`Multiplier`] is a fixed-point ratio over [`MULTIPLIER_DIVISOR`]; a
//! multiplier of `10_000` means 100%.

use std::fmt;
use std::str::FromStr;

use primitive_types::U256;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// Fixed-point denominator for every stake multiplier.
pub const MULTIPLIER_DIVISOR: u64 = 10_000;

/// A non-negative amount of value in the host ledger's smallest unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u128);

impl Amount {
    /// The zero amount.
    pub const ZERO: Amount = Amount(0);

    /// Create an amount from a raw unit count.
    pub const fn new(units: u128) -> Self {
        Self(units)
    }

    /// The raw unit count.
    pub const fn units(&self) -> u128 {
        self.0
    }

    /// Whether this amount is zero.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// `self + rhs`, or `None` on overflow.
    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    /// `self - rhs`, or `None` if `rhs > self`.
    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    /// `self + rhs`, clamped at the maximum amount.
    pub fn saturating_add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }

    /// `self - rhs`, clamped at zero.
    pub fn saturating_sub(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_sub(rhs.0))
    }

    /// `self * numerator / denominator`, rounding down.
    ///
    /// The product is taken in 256 bits, so only a quotient that does not
    /// fit an amount returns `None`. A zero denominator also returns `None`.
    pub fn mul_div(self, numerator: Amount, denominator: Amount) -> Option<Amount> {
        if denominator.0 == 0 {
            return None;
        }
        let quotient = U256::from(self.0) * U256::from(numerator.0) / U256::from(denominator.0);
        (quotient.bits() <= 128).then(|| Amount(quotient.low_u128()))
    }

    /// The stake owed on top of this base amount: `self * m / DIVISOR`.
    pub fn stake(self, multiplier: Multiplier) -> Option<Amount> {
        self.mul_div(
            Amount(u128::from(multiplier.basis_points())),
            Amount(u128::from(MULTIPLIER_DIVISOR)),
        )
    }

    /// This amount plus its stake: `self * (1 + m / DIVISOR)`.
    pub fn with_stake(self, multiplier: Multiplier) -> Option<Amount> {
        self.stake(multiplier)?.checked_add(self)
    }

    /// Sum an iterator of amounts, or `None` on overflow.
    pub fn checked_sum<I: IntoIterator<Item = Amount>>(amounts: I) -> Option<Amount> {
        amounts
            .into_iter()
            .try_fold(Amount::ZERO, |acc, a| acc.checked_add(a))
    }
}

impl From<u128> for Amount {
    fn from(units: u128) -> Self {
        Self(units)
    }
}

impl From<u64> for Amount {
    fn from(units: u64) -> Self {
        Self(u128::from(units))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidAmount(s.to_string()));
        }
        s.parse::<u128>()
            .map(Amount)
            .map_err(|_| ValidationError::InvalidAmount(s.to_string()))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// A fixed-point stake multiplier in basis points of [`MULTIPLIER_DIVISOR`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Multiplier(u64);

impl Multiplier {
    /// A multiplier that adds no stake.
    pub const ZERO: Multiplier = Multiplier(0);

    /// Create a multiplier from basis points (`10_000` = 100%).
    pub const fn from_basis_points(bps: u64) -> Self {
        Self(bps)
    }

    /// The multiplier in basis points.
    pub const fn basis_points(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, MULTIPLIER_DIVISOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn checked_add_detects_overflow() {
        assert_eq!(Amount::new(u128::MAX).checked_add(Amount::new(1)), None);
        assert_eq!(
            Amount::new(2).checked_add(Amount::new(3)),
            Some(Amount::new(5))
        );
    }

    #[test]
    fn checked_sub_rejects_underflow() {
        assert_eq!(Amount::new(2).checked_sub(Amount::new(3)), None);
        assert_eq!(Amount::new(3).saturating_sub(Amount::new(5)), Amount::ZERO);
    }

    #[test]
    fn mul_div_rounds_down_and_rejects_zero_denominator() {
        let a = Amount::new(10);
        assert_eq!(a.mul_div(Amount::new(1), Amount::new(3)), Some(Amount::new(3)));
        assert_eq!(a.mul_div(Amount::new(1), Amount::ZERO), None);
    }

    #[test]
    fn mul_div_survives_wide_products() {
        // 20 and 40 tokens at 18 decimals: the product needs ~130 bits
        let stake = Amount::new(20_000_000_000_000_000_000);
        let pool = Amount::new(40_000_000_000_000_000_000);
        assert_eq!(stake.mul_div(pool, stake), Some(pool));
        assert_eq!(
            stake.mul_div(pool, Amount::new(80_000_000_000_000_000_000)),
            Some(Amount::new(10_000_000_000_000_000_000))
        );
        let max = Amount::new(u128::MAX);
        assert_eq!(max.mul_div(max, max), Some(max));
        assert_eq!(max.mul_div(max, Amount::new(u128::MAX - 1)), None);
    }

    #[test]
    fn stake_applies_basis_points() {
        let cost = Amount::new(1_000);
        assert_eq!(cost.stake(Multiplier::from_basis_points(5_000)), Some(Amount::new(500)));
        assert_eq!(
            cost.with_stake(Multiplier::from_basis_points(20_000)),
            Some(Amount::new(3_000))
        );
        assert_eq!(cost.with_stake(Multiplier::ZERO), Some(cost));
    }

    #[test]
    fn serializes_as_decimal_string() {
        let a = Amount::new(340_282_366_920_938_463_463_374_607_431_768_211_455);
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, "\"340282366920938463463374607431768211455\"");
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn rejects_non_numeric_strings() {
        assert!("".parse::<Amount>().is_err());
        assert!("-5".parse::<Amount>().is_err());
        assert!("1.5".parse::<Amount>().is_err());
        assert!(serde_json::from_str::<Amount>("\"12a\"").is_err());
    }

    #[test]
    fn multiplier_display() {
        assert_eq!(Multiplier::from_basis_points(2_500).to_string(), "2500/10000");
    }

    proptest! {
        /// `with_stake` never returns less than the base amount.
        #[test]
        fn with_stake_is_monotonic(base in 0u128..1_000_000_000_000, bps in 0u64..100_000) {
            let total = Amount::new(base).with_stake(Multiplier::from_basis_points(bps)).unwrap();
            prop_assert!(total >= Amount::new(base));
        }

        /// Splitting a pool by `mul_div` never hands out more than the pool.
        #[test]
        fn mul_div_share_never_exceeds_pool(
            pool in any::<u128>(),
            part in 0u128..u128::MAX / 2,
            extra in 0u128..u128::MAX / 2,
        ) {
            let whole = part + extra;
            prop_assume!(whole > 0);
            let share = Amount::new(pool).mul_div(Amount::new(part), Amount::new(whole)).unwrap();
            prop_assert!(share <= Amount::new(pool));
        }
    }
}

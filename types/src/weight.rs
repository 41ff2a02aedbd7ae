//! Voting weight: a wei-equivalent fixed-point quantity.
//!
//! Weights are stored as raw integers (u128) with 18 implied fractional
//! digits, so `1 unit == 10^18 wei`. Every asset contributes 1:1 in this
//! unit; there is no conversion between assets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use crate::TypesError;

/// Number of fractional digits in a weight.
pub const WEIGHT_DECIMALS: u32 = 18;

/// Raw units in one whole weight unit.
pub const WEI_PER_UNIT: u128 = 1_000_000_000_000_000_000;

/// A non-negative voting weight in wei-equivalent raw units.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Weight(u128);

impl Weight {
    pub const ZERO: Self = Self(0);

    pub const fn from_wei(raw: u128) -> Self {
        Self(raw)
    }

    /// Whole units, e.g. `Weight::from_units(32)` for one validator.
    pub const fn from_units(units: u64) -> Self {
        Self(units as u128 * WEI_PER_UNIT)
    }

    pub fn wei(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub fn checked_mul(self, factor: u128) -> Option<Self> {
        self.0.checked_mul(factor).map(Self)
    }

    /// Absolute difference between two weights.
    pub fn abs_diff(self, other: Self) -> Self {
        Self(self.0.abs_diff(other.0))
    }

    /// Signed change from `self` to `new`, saturating at the i128 range.
    pub fn delta_to(self, new: Self) -> i128 {
        if new.0 >= self.0 {
            i128::try_from(new.0 - self.0).unwrap_or(i128::MAX)
        } else {
            i128::try_from(self.0 - new.0).map(|d| -d).unwrap_or(i128::MIN)
        }
    }

    /// Lossy conversion to whole units, for display-currency arithmetic only.
    pub fn as_f64_units(&self) -> f64 {
        let whole = (self.0 / WEI_PER_UNIT) as f64;
        let frac = (self.0 % WEI_PER_UNIT) as f64 / WEI_PER_UNIT as f64;
        whole + frac
    }

    /// Parse a decimal string such as `"35.5"` or `"0.001"`.
    ///
    /// At most 18 fractional digits are accepted; signs, exponents and
    /// empty components are rejected.
    pub fn parse_decimal(s: &str) -> Result<Self, TypesError> {
        let invalid = || TypesError::InvalidWeight(s.to_string());
        let s = s.trim();
        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        if s.contains('.') && frac_part.is_empty() {
            return Err(invalid());
        }
        if frac_part.len() > WEIGHT_DECIMALS as usize {
            return Err(invalid());
        }

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| TypesError::WeightOverflow)?
        };
        let mut frac: u128 = 0;
        if !frac_part.is_empty() {
            frac = frac_part.parse().map_err(|_| invalid())?;
            frac *= 10u128.pow(WEIGHT_DECIMALS - frac_part.len() as u32);
        }

        whole
            .checked_mul(WEI_PER_UNIT)
            .and_then(|w| w.checked_add(frac))
            .map(Self)
            .ok_or(TypesError::WeightOverflow)
    }
}

/// Saturates at `u128::MAX` wei. Ledger arithmetic that must report
/// overflow uses [`Weight::checked_add`].
impl Add for Weight {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl std::iter::Sum for Weight {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, w| acc + w)
    }
}

/// Renders the shortest decimal form: `35.5`, `10`, `0.0004`.
impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / WEI_PER_UNIT;
        let frac = self.0 % WEI_PER_UNIT;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{:018}", frac);
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl FromStr for Weight {
    type Err = TypesError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_decimal(s)
    }
}

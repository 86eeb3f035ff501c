//! Exact signed token amounts
//!
//! Ledger arithmetic is carried out on signed 256-bit integers with checked
//! operations only. Any result outside the representable range is reported as
//! [`Error::Overflow`] and must stop ingestion; nothing ever wraps.
//!
//! The only lossy operation is [`ExactValue::to_scaled_magnitude`], which turns
//! a raw amount into a presentation-scale `f64` for thresholds and display.
//! Its output must never be fed back into ledger state.

use crate::{Error, Result};
use alloy_primitives::{I256, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Largest decimal scale whose divisor (10^decimals) is itself a representable
/// balance, i.e. at most `I256::MAX`. Beyond it every balance scales below one.
pub const MAX_DECIMALS: u8 = 76;

/// 2^64 as f64, for limb-wise conversion.
const LIMB_BASE: f64 = 18_446_744_073_709_551_616.0;

/// Exact signed amount of an asset in raw (unscaled) units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ExactValue(I256);

impl ExactValue {
    /// Zero
    pub const ZERO: Self = Self(I256::ZERO);

    /// Wrap a raw signed integer
    pub const fn from_raw(raw: I256) -> Self {
        Self(raw)
    }

    /// Convert an unsigned on-chain amount, rejecting values above `I256::MAX`.
    pub fn from_unsigned(value: U256) -> Result<Self> {
        I256::try_from(value)
            .map(Self)
            .map_err(|_| Error::Overflow(format!("{} exceeds the signed 256-bit range", value)))
    }

    /// Build from a 128-bit integer (always representable)
    pub fn from_i128(value: i128) -> Self {
        let magnitude = I256::from_raw(U256::from(value.unsigned_abs()));
        if value < 0 {
            Self(-magnitude)
        } else {
            Self(magnitude)
        }
    }

    /// Underlying integer
    pub fn raw(&self) -> I256 {
        self.0
    }

    /// True if exactly zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// True if strictly negative
    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    /// Checked addition
    pub fn checked_add(self, rhs: Self) -> Result<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or_else(|| Error::Overflow(format!("{} + {}", self, rhs)))
    }

    /// Checked subtraction
    pub fn checked_sub(self, rhs: Self) -> Result<Self> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or_else(|| Error::Overflow(format!("{} - {}", self, rhs)))
    }

    /// Checked negation (fails only for `I256::MIN`)
    pub fn checked_neg(self) -> Result<Self> {
        self.0
            .checked_neg()
            .map(Self)
            .ok_or_else(|| Error::Overflow(format!("-({})", self)))
    }

    /// Presentation-scale magnitude: `value / 10^decimals` as `f64`.
    ///
    /// The integer part and the remainder are converted separately, so values
    /// whose whole part fits in an `f64` mantissa keep their fractional digits.
    /// Extremely large values lose precision; callers must treat the result as
    /// a display/threshold heuristic only.
    pub fn to_scaled_magnitude(&self, decimals: u8) -> f64 {
        let abs = self.0.unsigned_abs();
        let magnitude = match pow10(decimals) {
            Some(divisor) => {
                let (whole, fraction) = abs.div_rem(divisor);
                u256_to_f64(whole) + u256_to_f64(fraction) / u256_to_f64(divisor)
            }
            // Divisor exceeds 256 bits, so the whole part is zero.
            None => u256_to_f64(abs) / 10f64.powi(i32::from(decimals)),
        };

        if self.0.is_negative() {
            -magnitude
        } else {
            magnitude
        }
    }
}

/// 10^decimals, or `None` when it does not fit in 256 bits.
pub(crate) fn pow10(decimals: u8) -> Option<U256> {
    U256::from(10u64).checked_pow(U256::from(decimals))
}

fn u256_to_f64(value: U256) -> f64 {
    value
        .as_limbs()
        .iter()
        .rev()
        .fold(0.0, |acc, &limb| acc * LIMB_BASE + limb as f64)
}

impl fmt::Display for ExactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ExactValue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        match trimmed.strip_prefix('-') {
            Some(digits) => {
                let magnitude = parse_unsigned(digits)?;
                Self::from_unsigned(magnitude)?.checked_neg()
            }
            None => Self::from_unsigned(parse_unsigned(trimmed)?),
        }
    }
}

fn parse_unsigned(digits: &str) -> Result<U256> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidEvent(format!("not a base-10 integer: '{}'", digits)));
    }
    U256::from_str_radix(digits, 10)
        .map_err(|e| Error::Overflow(format!("'{}' does not fit in 256 bits: {}", digits, e)))
}

impl From<i64> for ExactValue {
    fn from(value: i64) -> Self {
        Self::from_i128(i128::from(value))
    }
}

impl Serialize for ExactValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ExactValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

//! Count domain value.
//!
//! # Responsibility
//! - Hold the unbounded tap count without fixed-width overflow.
//! - Own the canonical decimal text encoding used by storage and FFI.
//!
//! # Invariants
//! - A `Count` is never negative.
//! - `to_decimal_string()` output always parses back to an equal `Count`.
//! - Mutation is limited to `increment()` and `reset()`.

use crate::model::locale::DisplayLocale;
use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static DECIMAL_DIGITS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+$").expect("valid decimal digits regex"));

/// Arbitrary-precision, non-negative tap count.
///
/// Serialized as a decimal string so no consumer ever sees a truncated value.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Count(BigUint);

/// Parse failure for persisted or user-supplied count text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountParseError {
    /// Input was empty after trimming.
    Empty,
    /// Input contains something other than ASCII decimal digits.
    InvalidDigits(String),
}

impl Display for CountParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "count text is empty"),
            Self::InvalidDigits(value) => {
                write!(f, "count text `{value}` is not a non-negative decimal integer")
            }
        }
    }
}

impl Error for CountParseError {}

impl Count {
    /// Returns a zero count.
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    /// Parses canonical decimal text.
    ///
    /// Surrounding whitespace is ignored and leading zeros are normalized.
    /// Signs, separators and non-ASCII digits are rejected.
    pub fn parse_decimal(text: &str) -> Result<Self, CountParseError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(CountParseError::Empty);
        }
        if !DECIMAL_DIGITS_RE.is_match(trimmed) {
            return Err(CountParseError::InvalidDigits(trimmed.to_string()));
        }

        BigUint::parse_bytes(trimmed.as_bytes(), 10)
            .map(Self)
            .ok_or_else(|| CountParseError::InvalidDigits(trimmed.to_string()))
    }

    /// Adds exactly one.
    pub fn increment(&mut self) {
        self.0 += 1u32;
    }

    /// Sets the count back to zero.
    pub fn reset(&mut self) {
        self.0.set_zero();
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Canonical decimal encoding (no sign, no separators).
    pub fn to_decimal_string(&self) -> String {
        self.0.to_str_radix(10)
    }

    /// Renders the count with digit grouping for the given display locale.
    pub fn grouped(&self, locale: DisplayLocale) -> String {
        locale.group_digits(&self.to_decimal_string())
    }

    /// Returns the value as `u64` when it fits.
    pub fn to_u64(&self) -> Option<u64> {
        self.0.to_u64()
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    /// Number of decimal digits; zero renders as one digit.
    pub(crate) fn decimal_len(&self) -> usize {
        self.to_decimal_string().len()
    }

    pub(crate) fn is_one(&self) -> bool {
        self.0.is_one()
    }
}

impl Display for Count {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Count {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<BigUint> for Count {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl From<Count> for BigUint {
    fn from(value: Count) -> Self {
        value.0
    }
}

impl TryFrom<String> for Count {
    type Error = CountParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_decimal(&value)
    }
}

impl From<Count> for String {
    fn from(value: Count) -> Self {
        value.to_decimal_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{Count, CountParseError};

    #[test]
    fn parse_normalizes_leading_zeros_and_whitespace() {
        let count = Count::parse_decimal("  000120 \n").unwrap();
        assert_eq!(count, Count::from(120));
        assert_eq!(count.to_decimal_string(), "120");
    }

    #[test]
    fn parse_rejects_signs_and_separators() {
        assert_eq!(Count::parse_decimal("   "), Err(CountParseError::Empty));
        for bad in ["-1", "+1", "1,000", "1_000", "12a", "1.5", "١٢"] {
            assert!(
                matches!(
                    Count::parse_decimal(bad),
                    Err(CountParseError::InvalidDigits(_))
                ),
                "`{bad}` should be rejected"
            );
        }
    }

    #[test]
    fn increment_crosses_u64_boundary_without_wrapping() {
        let mut count = Count::from(u64::MAX);
        count.increment();
        assert_eq!(count.to_decimal_string(), "18446744073709551616");
        assert_eq!(count.to_u64(), None);
    }

    #[test]
    fn reset_returns_to_zero() {
        let mut count = Count::from(42);
        count.reset();
        assert!(count.is_zero());
        assert_eq!(count.decimal_len(), 1);
    }
}

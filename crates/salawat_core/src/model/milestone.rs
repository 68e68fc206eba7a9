//! Milestone thresholds and crossing notifications.
//!
//! # Responsibility
//! - Define the ordered set of counts that trigger a celebration.
//! - Answer membership, next and previous queries at any magnitude.
//!
//! # Invariants
//! - Thresholds are strictly increasing and never zero.
//! - The standard set is infinite: `1`, then `10^k` and `5·10^k` for `k >= 1`.
//! - A finite set returns `None` from `next_after` once exhausted.

use crate::model::count::Count;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Ordered milestone thresholds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MilestoneSet {
    /// `1, 10, 50, 100, 500, 1000, 5000, 10000, ...` without end.
    #[default]
    Standard,
    /// Caller-provided, strictly increasing thresholds.
    Finite(Vec<Count>),
}

/// Validation error for finite milestone sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MilestoneSetError {
    Empty,
    ZeroThreshold,
    NotStrictlyIncreasing { previous: Count, next: Count },
}

impl Display for MilestoneSetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "milestone set must contain at least one threshold"),
            Self::ZeroThreshold => write!(f, "milestone threshold must be greater than zero"),
            Self::NotStrictlyIncreasing { previous, next } => write!(
                f,
                "milestone thresholds must be strictly increasing: {next} follows {previous}"
            ),
        }
    }
}

impl Error for MilestoneSetError {}

/// Emitted by an increment that lands exactly on a milestone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneNotification {
    /// The count value just reached.
    pub milestone: Count,
    /// `true` only for the one increment that flipped the golden unlock.
    pub golden_unlock: bool,
}

impl MilestoneSet {
    /// Builds a finite set from strictly increasing, non-zero thresholds.
    pub fn finite(thresholds: impl IntoIterator<Item = Count>) -> Result<Self, MilestoneSetError> {
        let thresholds: Vec<Count> = thresholds.into_iter().collect();
        let first = thresholds.first().ok_or(MilestoneSetError::Empty)?;
        if first.is_zero() {
            return Err(MilestoneSetError::ZeroThreshold);
        }
        for pair in thresholds.windows(2) {
            if pair[1] <= pair[0] {
                return Err(MilestoneSetError::NotStrictlyIncreasing {
                    previous: pair[0].clone(),
                    next: pair[1].clone(),
                });
            }
        }
        Ok(Self::Finite(thresholds))
    }

    /// Convenience constructor for small literal sets.
    pub fn from_u64s(thresholds: &[u64]) -> Result<Self, MilestoneSetError> {
        Self::finite(thresholds.iter().copied().map(Count::from))
    }

    /// Returns whether `count` is exactly one of the thresholds.
    pub fn contains(&self, count: &Count) -> bool {
        match self {
            Self::Standard => standard_contains(count),
            Self::Finite(thresholds) => thresholds.binary_search(count).is_ok(),
        }
    }

    /// Smallest threshold strictly greater than `count`.
    pub fn next_after(&self, count: &Count) -> Option<Count> {
        match self {
            Self::Standard => Some(standard_next_after(count)),
            Self::Finite(thresholds) => {
                let index = thresholds.partition_point(|threshold| threshold <= count);
                thresholds.get(index).cloned()
            }
        }
    }

    /// Largest threshold less than or equal to `count`.
    pub fn previous_at_or_below(&self, count: &Count) -> Option<Count> {
        match self {
            Self::Standard => standard_previous_at_or_below(count),
            Self::Finite(thresholds) => {
                let index = thresholds.partition_point(|threshold| threshold <= count);
                index.checked_sub(1).map(|index| thresholds[index].clone())
            }
        }
    }
}

fn standard_contains(count: &Count) -> bool {
    if count.is_one() {
        return true;
    }
    let digits = count.to_decimal_string();
    let mut chars = digits.chars();
    let leading_ok = matches!(chars.next(), Some('1' | '5'));
    leading_ok && digits.len() >= 2 && chars.all(|ch| ch == '0')
}

fn standard_next_after(count: &Count) -> Count {
    if count.is_zero() {
        return Count::from(1);
    }
    let mut exponent = count.decimal_len().saturating_sub(1).max(1);
    loop {
        for mantissa in [1u32, 5] {
            let candidate = scaled_power_of_ten(mantissa, exponent);
            if &candidate > count {
                return candidate;
            }
        }
        exponent += 1;
    }
}

fn standard_previous_at_or_below(count: &Count) -> Option<Count> {
    if count.is_zero() {
        return None;
    }
    let mut exponent = count.decimal_len() - 1;
    while exponent >= 1 {
        for mantissa in [5u32, 1] {
            let candidate = scaled_power_of_ten(mantissa, exponent);
            if &candidate <= count {
                return Some(candidate);
            }
        }
        exponent -= 1;
    }
    Some(Count::from(1))
}

fn scaled_power_of_ten(mantissa: u32, exponent: usize) -> Count {
    let power = num_traits::pow(BigUint::from(10u32), exponent);
    Count::from(power * mantissa)
}

#[cfg(test)]
mod tests {
    use super::{MilestoneSet, MilestoneSetError};
    use crate::model::count::Count;

    fn standard_members_up_to(limit: u64) -> Vec<u64> {
        let set = MilestoneSet::Standard;
        (0..=limit)
            .filter(|value| set.contains(&Count::from(*value)))
            .collect()
    }

    #[test]
    fn standard_set_prefix_matches_rule() {
        assert_eq!(
            standard_members_up_to(100_000),
            vec![1, 10, 50, 100, 500, 1_000, 5_000, 10_000, 50_000, 100_000]
        );
    }

    #[test]
    fn standard_next_and_previous_walk_the_sequence() {
        let set = MilestoneSet::Standard;
        assert_eq!(set.next_after(&Count::zero()), Some(Count::from(1)));
        assert_eq!(set.next_after(&Count::from(1)), Some(Count::from(10)));
        assert_eq!(set.next_after(&Count::from(10)), Some(Count::from(50)));
        assert_eq!(set.next_after(&Count::from(999)), Some(Count::from(1_000)));
        assert_eq!(set.next_after(&Count::from(1_000)), Some(Count::from(5_000)));

        assert_eq!(set.previous_at_or_below(&Count::zero()), None);
        assert_eq!(set.previous_at_or_below(&Count::from(7)), Some(Count::from(1)));
        assert_eq!(set.previous_at_or_below(&Count::from(49)), Some(Count::from(10)));
        assert_eq!(set.previous_at_or_below(&Count::from(500)), Some(Count::from(500)));
        assert_eq!(set.previous_at_or_below(&Count::from(999)), Some(Count::from(500)));
    }

    #[test]
    fn standard_set_handles_values_beyond_u64() {
        let set = MilestoneSet::Standard;
        let huge = Count::parse_decimal("999999999999999999999999").unwrap();
        let next = set.next_after(&huge).unwrap();
        assert_eq!(next.to_decimal_string(), format!("1{}", "0".repeat(24)));
        assert!(set.contains(&next));
        assert_eq!(
            set.previous_at_or_below(&huge).unwrap().to_decimal_string(),
            format!("5{}", "0".repeat(23))
        );
    }

    #[test]
    fn finite_set_is_exhausted_after_last_threshold() {
        let set = MilestoneSet::from_u64s(&[1, 10, 50]).unwrap();
        assert!(set.contains(&Count::from(10)));
        assert!(!set.contains(&Count::from(11)));
        assert_eq!(set.next_after(&Count::from(10)), Some(Count::from(50)));
        assert_eq!(set.next_after(&Count::from(50)), None);
        assert_eq!(set.previous_at_or_below(&Count::from(60)), Some(Count::from(50)));
        assert_eq!(set.previous_at_or_below(&Count::zero()), None);
    }

    #[test]
    fn finite_set_rejects_invalid_thresholds() {
        assert_eq!(MilestoneSet::from_u64s(&[]), Err(MilestoneSetError::Empty));
        assert_eq!(
            MilestoneSet::from_u64s(&[0, 1]),
            Err(MilestoneSetError::ZeroThreshold)
        );
        assert!(matches!(
            MilestoneSet::from_u64s(&[1, 10, 10]),
            Err(MilestoneSetError::NotStrictlyIncreasing { .. })
        ));
    }
}

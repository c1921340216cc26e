//! Indicator engine: stateless queries over a normalized [`Transactions`]
//! table.
//!
//! Shared conventions:
//!
//! - functions borrow the table read-only and never reshape it;
//! - a trailing window runs from `reference − years` to `reference`, both
//!   inclusive;
//! - rows with a missing order date are left out of any windowed query;
//! - an empty window produces an empty result, not an error;
//! - money and percentages are summed unrounded and rounded half-to-even to
//!   two places when the output row is built.
//!
//! [`Transactions`]: crate::loader::Transactions

pub mod growth;
pub mod orders;
pub mod suppliers;
pub mod volume;

use std::{collections::HashMap, hash::Hash};

use chrono::{Months, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal::prelude::FromPrimitive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    Largest,
    Smallest,
}

impl Extreme {
    /// True when `candidate` should replace `current`. Ties keep `current`,
    /// so the first row encountered wins.
    pub(crate) fn beats(self, candidate: Decimal, current: Decimal) -> bool {
        match self {
            Extreme::Largest => candidate > current,
            Extreme::Smallest => candidate < current,
        }
    }
}

/// First day of a trailing window of `years` ending at `reference`.
pub fn window_start(reference: NaiveDate, years: u32) -> NaiveDate {
    reference
        .checked_sub_months(Months::new(years.saturating_mul(12)))
        .unwrap_or(NaiveDate::MIN)
}

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// `part / total × 100`, rounded; zero when `total` is zero.
pub fn percent_of(part: Decimal, total: Decimal) -> Decimal {
    if total.is_zero() {
        return Decimal::ZERO;
    }
    match part.checked_div(total) {
        Some(ratio) => round_money(ratio * Decimal::ONE_HUNDRED),
        None => Decimal::ZERO,
    }
}

/// Clips a percentage to `[-|bound|, |bound|]`. A non-finite bound leaves
/// the value unclipped.
pub fn clip_percent(value: Decimal, bound: Option<f64>) -> Decimal {
    match bound
        .filter(|b| b.is_finite())
        .and_then(|b| Decimal::from_f64(b.abs()))
    {
        Some(limit) => value.clamp(-limit, limit),
        None => value,
    }
}

/// Groups that remember the order in which their keys first appeared.
#[derive(Debug)]
pub(crate) struct FirstSeen<K, V> {
    index: HashMap<K, usize>,
    groups: Vec<(K, V)>,
}

impl<K, V> FirstSeen<K, V>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }

    pub(crate) fn entry_or_insert_with<F>(&mut self, key: K, init: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        let idx = match self.index.get(&key) {
            Some(idx) => *idx,
            None => {
                self.groups.push((key.clone(), init()));
                self.index.insert(key, self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        &mut self.groups[idx].1
    }

    pub(crate) fn into_groups(self) -> Vec<(K, V)> {
        self.groups
    }
}

/// Keeps the first non-missing value offered.
pub(crate) fn keep_first<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_start_clamps_leap_days() {
        let reference = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(
            window_start(reference, 1),
            NaiveDate::from_ymd_opt(2023, 2, 28).unwrap()
        );
    }

    #[test]
    fn round_money_is_half_even() {
        assert_eq!(round_money(Decimal::new(1005, 3)), Decimal::new(100, 2));
        assert_eq!(round_money(Decimal::new(1015, 3)), Decimal::new(102, 2));
    }

    #[test]
    fn percent_of_zero_total_is_zero() {
        assert_eq!(percent_of(Decimal::ONE, Decimal::ZERO), Decimal::ZERO);
        assert_eq!(
            percent_of(Decimal::ONE, Decimal::new(3, 0)),
            Decimal::new(3333, 2)
        );
    }

    #[test]
    fn clip_percent_respects_optional_bound() {
        let big = Decimal::new(90000, 2);
        assert_eq!(clip_percent(big, Some(500.0)), Decimal::new(500, 0));
        assert_eq!(clip_percent(-big, Some(500.0)), Decimal::new(-500, 0));
        assert_eq!(clip_percent(big, None), big);
    }

    #[test]
    fn clip_percent_uses_bound_magnitude() {
        let ten = Decimal::new(10, 0);
        assert_eq!(clip_percent(ten, Some(-5.0)), Decimal::new(5, 0));
        assert_eq!(clip_percent(-ten, Some(-5.0)), Decimal::new(-5, 0));
        assert_eq!(clip_percent(ten, Some(f64::NAN)), ten);
    }

    #[test]
    fn first_seen_preserves_insertion_order() {
        let mut groups = FirstSeen::new();
        *groups.entry_or_insert_with("b", || 0) += 1;
        *groups.entry_or_insert_with("a", || 0) += 1;
        *groups.entry_or_insert_with("b", || 0) += 1;
        assert_eq!(groups.into_groups(), vec![("b", 2), ("a", 1)]);
    }
}

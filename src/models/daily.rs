//! Per-day income/expense aggregate.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Income and expense totals for one calendar day.
///
/// Derived from the transaction set on every change and never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAggregate {
    /// Sum of positive amounts.
    pub income: Decimal,
    /// Sum of negative amounts (zero or negative).
    pub expense: Decimal,
}

impl DailyAggregate {
    /// Adds a signed amount to the matching side.
    #[inline]
    pub fn record(&mut self, amount: Decimal) {
        if amount > Decimal::ZERO {
            self.income = self.income.saturating_add(amount);
        } else if amount < Decimal::ZERO {
            self.expense = self.expense.saturating_add(amount);
        }
    }

    /// Returns income plus expense.
    #[inline]
    #[must_use]
    pub fn net(&self) -> Decimal {
        self.income.saturating_add(self.expense)
    }

    /// Returns `true` if neither side has moved.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.income.is_zero() && self.expense.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_splits_by_sign() {
        let mut day = DailyAggregate::default();
        day.record(Decimal::new(50_000, 0));
        day.record(Decimal::new(-3_000, 0));
        day.record(Decimal::ZERO);
        assert_eq!(day.income, Decimal::new(50_000, 0));
        assert_eq!(day.expense, Decimal::new(-3_000, 0));
        assert_eq!(day.net(), Decimal::new(47_000, 0));
        assert!(!day.is_empty());
    }

    #[test]
    fn default_is_empty() {
        assert!(DailyAggregate::default().is_empty());
    }

    #[test]
    fn decimal_cents_do_not_drift() {
        let mut day = DailyAggregate::default();
        for _ in 0..10 {
            day.record(Decimal::new(10, 2));
        }
        assert_eq!(day.income, Decimal::ONE);
    }
}

//! Derived-state computations over a transaction set.
//!
//! Every function here is pure: it reads its inputs, performs no I/O and
//! returns a defined value for any input, including an empty transaction
//! set. Callers recompute wholesale whenever the transaction set or the
//! goal changes.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{DailyAggregate, Goal, Transaction};

/// Income and expense summed over a whole transaction set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    /// Sum of positive amounts.
    pub income: Decimal,
    /// Sum of negative amounts.
    pub expense: Decimal,
}

/// Returns the calendar date of `timestamp` as seen in `tz`.
///
/// This is the bucket key used by [`compute_daily_aggregates`] and
/// [`filter_by_date`].
#[inline]
#[must_use]
pub fn local_date<Tz: TimeZone>(timestamp: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    timestamp.with_timezone(tz).date_naive()
}

/// Sums the amounts of all transactions, dated or not.
#[inline]
#[must_use]
pub fn compute_balance(transactions: &[Transaction]) -> Decimal {
    transactions
        .iter()
        .fold(Decimal::ZERO, |acc, tx| acc.saturating_add(tx.amount))
}

/// Returns the balance as a percentage of the goal target, clamped to
/// `[0, 100]`.
///
/// Yields zero when there is no goal or its target is not positive.
#[inline]
#[must_use]
pub fn compute_progress(balance: Decimal, goal: Option<&Goal>) -> Decimal {
    let Some(target) = goal
        .filter(|goal| goal.has_valid_target())
        .map(|goal| goal.target_amount)
    else {
        return Decimal::ZERO;
    };
    let percent = balance
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|scaled| scaled.checked_div(target));
    match percent {
        Some(value) => value.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED),
        // Only reachable for balances near the Decimal range limit.
        None if balance > Decimal::ZERO => Decimal::ONE_HUNDRED,
        None => Decimal::ZERO,
    }
}

/// Returns how much is still missing to reach the goal, floored at zero.
///
/// `None` when there is no goal with a positive target.
#[inline]
#[must_use]
pub fn remaining_to_goal(balance: Decimal, goal: Option<&Goal>) -> Option<Decimal> {
    let goal = goal.filter(|goal| goal.has_valid_target())?;
    Some(
        goal.target_amount
            .saturating_sub(balance)
            .max(Decimal::ZERO),
    )
}

/// Splits the whole transaction set into income and expense totals.
#[inline]
#[must_use]
pub fn compute_totals(transactions: &[Transaction]) -> Totals {
    let mut day = DailyAggregate::default();
    for tx in transactions {
        day.record(tx.amount);
    }
    Totals {
        income: day.income,
        expense: day.expense,
    }
}

/// Buckets dated transactions by their local calendar date.
///
/// Undated transactions are skipped. A day that only has zero-amount
/// transactions still gets an (empty) entry.
#[inline]
#[must_use]
pub fn compute_daily_aggregates<Tz: TimeZone>(
    transactions: &[Transaction],
    tz: &Tz,
) -> BTreeMap<NaiveDate, DailyAggregate> {
    let mut days: BTreeMap<NaiveDate, DailyAggregate> = BTreeMap::new();
    for tx in transactions {
        let Some(timestamp) = tx.date.as_ref() else {
            continue;
        };
        days.entry(local_date(timestamp, tz))
            .or_default()
            .record(tx.amount);
    }
    tracing::trace!(days = days.len(), "computed daily aggregates");
    days
}

/// Returns the transactions dated on `date`, most recent first.
///
/// Ties on the timestamp are ordered by id so the result is stable. No
/// match is an empty vector, not an error.
#[inline]
#[must_use]
pub fn filter_by_date<Tz: TimeZone>(
    transactions: &[Transaction],
    date: NaiveDate,
    tz: &Tz,
) -> Vec<Transaction> {
    let mut matching: Vec<Transaction> = transactions
        .iter()
        .filter(|tx| {
            tx.date
                .as_ref()
                .is_some_and(|timestamp| local_date(timestamp, tz) == date)
        })
        .cloned()
        .collect();
    matching.sort_by(Transaction::newest_first);
    matching
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::FixedOffset;

    use super::*;
    use crate::models::TransactionId;

    fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn tx(id: &str, amount: i64, when: Option<DateTime<Utc>>) -> Transaction {
        Transaction {
            id: TransactionId::new(id.to_owned()),
            description: format!("Transaction {id}"),
            amount: Decimal::new(amount, 0),
            date: when,
        }
    }

    fn goal(target: i64) -> Goal {
        Goal {
            name: "Goal".to_owned(),
            target_amount: Decimal::new(target, 0),
        }
    }

    /// Store order: descending by date.
    fn may_sample() -> Vec<Transaction> {
        vec![
            tx("t-3", 10_000, Some(at(2024, 5, 3, 12))),
            tx("t-2", -3_000, Some(at(2024, 5, 1, 18))),
            tx("t-1", 50_000, Some(at(2024, 5, 1, 9))),
        ]
    }

    #[test]
    fn balance_of_sample() {
        assert_eq!(compute_balance(&may_sample()), Decimal::new(57_000, 0));
    }

    #[test]
    fn balance_of_empty_set_is_zero() {
        assert_eq!(compute_balance(&[]), Decimal::ZERO);
    }

    #[test]
    fn balance_includes_undated_transactions() {
        let mut txs = may_sample();
        txs.push(tx("t-4", 1_000, None));
        assert_eq!(compute_balance(&txs), Decimal::new(58_000, 0));
    }

    #[test]
    fn balance_is_order_independent() {
        let txs = may_sample();
        let expected = compute_balance(&txs);
        for shift in 0..txs.len() {
            let mut rotated = txs.clone();
            rotated.rotate_left(shift);
            assert_eq!(compute_balance(&rotated), expected);
            rotated.reverse();
            assert_eq!(compute_balance(&rotated), expected);
        }
    }

    #[test]
    fn balance_has_no_float_drift() {
        let txs: Vec<Transaction> = (0..10)
            .map(|n| Transaction {
                id: TransactionId::new(format!("c-{n}")),
                description: "Dime".to_owned(),
                amount: Decimal::new(10, 2),
                date: None,
            })
            .collect();
        assert_eq!(compute_balance(&txs), Decimal::ONE);
    }

    #[test]
    fn progress_of_sample_goal() {
        let progress = compute_progress(Decimal::new(57_000, 0), Some(&goal(100_000)));
        assert_eq!(progress, Decimal::new(57, 0));
    }

    #[test]
    fn progress_without_goal_is_zero() {
        assert_eq!(compute_progress(Decimal::ZERO, None), Decimal::ZERO);
        assert_eq!(compute_progress(Decimal::new(500, 0), None), Decimal::ZERO);
    }

    #[test]
    fn progress_with_non_positive_target_is_zero() {
        assert_eq!(
            compute_progress(Decimal::new(10, 0), Some(&goal(0))),
            Decimal::ZERO
        );
        assert_eq!(
            compute_progress(Decimal::new(10, 0), Some(&goal(-10))),
            Decimal::ZERO
        );
    }

    #[test]
    fn progress_is_clamped() {
        let target = goal(1_000);
        assert_eq!(
            compute_progress(Decimal::new(5_000, 0), Some(&target)),
            Decimal::ONE_HUNDRED
        );
        assert_eq!(
            compute_progress(Decimal::new(-5_000, 0), Some(&target)),
            Decimal::ZERO
        );
    }

    #[test]
    fn progress_stays_in_range_for_extremes() {
        let balances = [
            Decimal::MAX,
            Decimal::MIN,
            Decimal::ZERO,
            Decimal::new(1, 28),
            Decimal::new(-1, 28),
        ];
        let goals = [goal(1), goal(100_000), goal(0)];
        for balance in balances {
            for target in &goals {
                let progress = compute_progress(balance, Some(target));
                assert!(progress >= Decimal::ZERO, "{balance} / {target:?}");
                assert!(progress <= Decimal::ONE_HUNDRED, "{balance} / {target:?}");
            }
        }
    }

    #[test]
    fn remaining_is_floored_at_zero() {
        let target = goal(100_000);
        assert_eq!(
            remaining_to_goal(Decimal::new(57_000, 0), Some(&target)),
            Some(Decimal::new(43_000, 0))
        );
        assert_eq!(
            remaining_to_goal(Decimal::new(200_000, 0), Some(&target)),
            Some(Decimal::ZERO)
        );
        assert_eq!(remaining_to_goal(Decimal::ZERO, None), None);
    }

    #[test]
    fn totals_split_income_and_expense() {
        let totals = compute_totals(&may_sample());
        assert_eq!(totals.income, Decimal::new(60_000, 0));
        assert_eq!(totals.expense, Decimal::new(-3_000, 0));
    }

    #[test]
    fn daily_aggregate_of_sample() {
        let days = compute_daily_aggregates(&may_sample(), &Utc);
        assert_eq!(days.len(), 2);
        let first = days.get(&date(2024, 5, 1)).unwrap();
        assert_eq!(first.income, Decimal::new(50_000, 0));
        assert_eq!(first.expense, Decimal::new(-3_000, 0));
        let third = days.get(&date(2024, 5, 3)).unwrap();
        assert_eq!(third.income, Decimal::new(10_000, 0));
        assert_eq!(third.expense, Decimal::ZERO);
        assert!(!days.contains_key(&date(2024, 5, 2)));
    }

    #[test]
    fn daily_aggregates_skip_undated() {
        let txs = vec![tx("t-1", 100, None)];
        assert!(compute_daily_aggregates(&txs, &Utc).is_empty());
    }

    #[test]
    fn daily_aggregates_use_local_date() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let txs = vec![tx("t-1", 100, Some(at(2024, 5, 1, 23)))];
        let days = compute_daily_aggregates(&txs, &plus_two);
        assert!(days.contains_key(&date(2024, 5, 2)));
        assert!(!days.contains_key(&date(2024, 5, 1)));
    }

    #[test]
    fn daily_aggregates_span_months() {
        let txs = vec![
            tx("t-1", 100, Some(at(2024, 4, 30, 10))),
            tx("t-2", 200, Some(at(2024, 5, 1, 10))),
        ];
        let days = compute_daily_aggregates(&txs, &Utc);
        assert_eq!(days.len(), 2);
        assert_eq!(
            days.get(&date(2024, 4, 30)).unwrap().income,
            Decimal::new(100, 0)
        );
    }

    #[test]
    fn daily_aggregates_are_order_independent() {
        let txs = may_sample();
        let expected = compute_daily_aggregates(&txs, &Utc);
        let mut reversed = txs.clone();
        reversed.reverse();
        assert_eq!(compute_daily_aggregates(&reversed, &Utc), expected);
        let mut rotated = txs;
        rotated.rotate_left(1);
        assert_eq!(compute_daily_aggregates(&rotated, &Utc), expected);
    }

    #[test]
    fn zero_amount_creates_empty_bucket() {
        let txs = vec![tx("t-1", 0, Some(at(2024, 5, 9, 10)))];
        let days = compute_daily_aggregates(&txs, &Utc);
        assert!(days.get(&date(2024, 5, 9)).unwrap().is_empty());
    }

    #[test]
    fn filter_by_date_sorts_most_recent_first() {
        let mut txs = may_sample();
        txs.reverse();
        let day = filter_by_date(&txs, date(2024, 5, 1), &Utc);
        let ids: Vec<&str> = day.iter().map(|tx| tx.id.as_inner()).collect();
        assert_eq!(ids, ["t-2", "t-1"]);
    }

    #[test]
    fn filter_by_date_breaks_ties_by_id() {
        let when = Some(at(2024, 5, 1, 9));
        let txs = vec![tx("b", 1, when), tx("a", 2, when)];
        let day = filter_by_date(&txs, date(2024, 5, 1), &Utc);
        let ids: Vec<&str> = day.iter().map(|tx| tx.id.as_inner()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn filter_by_date_without_match_is_empty() {
        assert!(filter_by_date(&may_sample(), date(2024, 5, 2), &Utc).is_empty());
        assert!(filter_by_date(&[], date(2024, 5, 2), &Utc).is_empty());
    }

    #[test]
    fn filter_by_date_partitions_dated_transactions() {
        let mut txs = may_sample();
        txs.push(tx("t-4", 5, Some(at(2024, 6, 1, 0))));
        txs.push(tx("t-5", 5, None));
        let dates: BTreeSet<NaiveDate> = txs
            .iter()
            .filter_map(|tx| tx.date.as_ref())
            .map(|timestamp| local_date(timestamp, &Utc))
            .collect();
        let mut seen = BTreeSet::new();
        let mut total = 0;
        for day in dates {
            for found in filter_by_date(&txs, day, &Utc) {
                total += 1;
                assert!(seen.insert(found.id), "transaction listed twice");
            }
        }
        assert_eq!(total, 4);
    }
}

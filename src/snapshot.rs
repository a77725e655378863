//! Consistent snapshots of the tracker state.
//!
//! Stores deliver the transaction list and the goal independently, through
//! [`SnapshotObserver`]. A [`SnapshotAssembler`] pairs the latest delivery
//! of each half and withholds the pair until both have arrived at least
//! once, so a presentation layer never renders derived values computed from
//! half-loaded data. Every delivery replaces its half wholesale.
//!
//! Deliveries carry the store's commit sequence. Notifications from
//! concurrent writers may arrive out of commit order; the assembler drops
//! any delivery older than the one it already holds for that half.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::aggregation::{self, Totals};
use crate::config::CalendarZone;
use crate::models::{DailyAggregate, Goal, NaiveDate, Transaction};

/// Receives store change notifications.
///
/// Stores call both methods once at subscription time with their current
/// contents, then again after every successful write to the matching half.
///
/// `sequence` is the store's commit counter at the moment the delivered
/// state was read. It never decreases across commits of one store, but
/// deliveries are not guaranteed to arrive in sequence order.
pub trait SnapshotObserver: core::fmt::Debug + Send + Sync {
    /// The full transaction list changed.
    fn transactions_changed(&self, sequence: u64, transactions: &[Transaction]);

    /// The goal changed (or was cleared).
    fn goal_changed(&self, sequence: u64, goal: Option<&Goal>);
}

/// Aggregate figures for the whole transaction set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Current goal, if any.
    pub goal: Option<Goal>,
    /// Sum of all amounts.
    pub balance: Decimal,
    /// Balance as a clamped percentage of the goal target.
    pub progress: Decimal,
    /// Amount still missing to reach the goal.
    pub remaining: Option<Decimal>,
    /// Income and expense totals.
    pub totals: Totals,
    /// Number of transactions.
    pub transaction_count: usize,
}

impl Summary {
    /// Computes the summary of `transactions` against `goal`.
    #[inline]
    #[must_use]
    pub fn compute(transactions: &[Transaction], goal: Option<&Goal>) -> Self {
        let balance = aggregation::compute_balance(transactions);
        Self {
            goal: goal.cloned(),
            balance,
            progress: aggregation::compute_progress(balance, goal),
            remaining: aggregation::remaining_to_goal(balance, goal),
            totals: aggregation::compute_totals(transactions),
            transaction_count: transactions.len(),
        }
    }
}

/// Everything a presentation layer renders for one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedState {
    /// Revision of the snapshot this was computed from.
    pub revision: u64,
    /// Balance, progress and totals.
    pub summary: Summary,
    /// Per-day aggregates, keyed by local date.
    pub daily: BTreeMap<NaiveDate, DailyAggregate>,
}

/// A consistent pair of transaction list and goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Increases with every delivery; newer snapshots supersede older ones.
    pub revision: u64,
    /// All transactions.
    pub transactions: Vec<Transaction>,
    /// The goal, if set.
    pub goal: Option<Goal>,
}

impl Snapshot {
    /// Recomputes all derived values, bucketing days in `zone`.
    #[inline]
    #[must_use]
    pub fn derive(&self, zone: &CalendarZone) -> DerivedState {
        DerivedState {
            revision: self.revision,
            summary: Summary::compute(&self.transactions, self.goal.as_ref()),
            daily: zone.daily_aggregates(&self.transactions),
        }
    }
}

/// Pairs independently delivered halves into [`Snapshot`]s.
///
/// Until both halves have arrived once the assembler reports loading.
/// After that each delivery replaces its half and the other half keeps its
/// last value. A delivery with a lower store sequence than the one applied
/// to its half is stale and ignored.
#[derive(Debug, Default)]
pub struct SnapshotAssembler {
    /// Last applied transaction list.
    transactions: Option<Vec<Transaction>>,
    /// Store sequence of `transactions`.
    transactions_sequence: u64,
    /// Last applied goal; the outer `Option` tracks arrival.
    goal: Option<Option<Goal>>,
    /// Store sequence of `goal`.
    goal_sequence: u64,
    /// Number of applied deliveries so far.
    revision: u64,
}

impl SnapshotAssembler {
    /// Creates an assembler with nothing delivered yet.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the transaction half unless `sequence` is older than the
    /// applied one. Returns whether the delivery was applied.
    #[inline]
    pub fn receive_transactions(&mut self, sequence: u64, transactions: Vec<Transaction>) -> bool {
        if self.transactions.is_some() && sequence < self.transactions_sequence {
            tracing::trace!(sequence, applied = self.transactions_sequence, "dropping stale transactions");
            return false;
        }
        self.revision = self.revision.saturating_add(1);
        tracing::trace!(
            revision = self.revision,
            sequence,
            count = transactions.len(),
            "received transactions"
        );
        self.transactions = Some(transactions);
        self.transactions_sequence = sequence;
        true
    }

    /// Replaces the goal half unless `sequence` is older than the applied
    /// one. Returns whether the delivery was applied.
    #[inline]
    pub fn receive_goal(&mut self, sequence: u64, goal: Option<Goal>) -> bool {
        if self.goal.is_some() && sequence < self.goal_sequence {
            tracing::trace!(sequence, applied = self.goal_sequence, "dropping stale goal");
            return false;
        }
        self.revision = self.revision.saturating_add(1);
        tracing::trace!(revision = self.revision, sequence, has_goal = goal.is_some(), "received goal");
        self.goal = Some(goal);
        self.goal_sequence = sequence;
        true
    }

    /// Returns `true` while either half is still missing.
    #[inline]
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.transactions.is_none() || self.goal.is_none()
    }

    /// Number of deliveries received.
    #[inline]
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// The latest complete snapshot, or `None` while loading.
    #[inline]
    #[must_use]
    pub fn current(&self) -> Option<Snapshot> {
        let transactions = self.transactions.as_ref()?;
        let goal = self.goal.as_ref()?;
        Some(Snapshot {
            revision: self.revision,
            transactions: transactions.clone(),
            goal: goal.clone(),
        })
    }
}

/// Thread-safe [`SnapshotAssembler`] that can be subscribed to a store.
#[derive(Debug, Default)]
pub struct SharedAssembler {
    /// Guarded assembler state.
    inner: Mutex<SnapshotAssembler>,
}

impl SharedAssembler {
    /// Creates an empty shared assembler.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` on the assembler. A poisoned lock is recovered, since every
    /// write leaves the assembler in a valid state.
    fn with_inner<R, F: FnOnce(&mut SnapshotAssembler) -> R>(&self, f: F) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// See [`SnapshotAssembler::is_loading`].
    #[inline]
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.with_inner(|inner| inner.is_loading())
    }

    /// See [`SnapshotAssembler::current`].
    #[inline]
    #[must_use]
    pub fn current(&self) -> Option<Snapshot> {
        self.with_inner(|inner| inner.current())
    }

    /// Latest derived state, or `None` while loading.
    #[inline]
    #[must_use]
    pub fn derived(&self, zone: &CalendarZone) -> Option<DerivedState> {
        self.current().map(|snapshot| snapshot.derive(zone))
    }

    /// Returns `true` if `revision` is older than the latest delivery, in
    /// which case a render computed from it should be discarded.
    #[inline]
    #[must_use]
    pub fn is_superseded(&self, revision: u64) -> bool {
        self.with_inner(|inner| inner.revision() > revision)
    }
}

impl SnapshotObserver for SharedAssembler {
    #[inline]
    fn transactions_changed(&self, sequence: u64, transactions: &[Transaction]) {
        let _applied = self.with_inner(|inner| inner.receive_transactions(sequence, transactions.to_vec()));
    }

    #[inline]
    fn goal_changed(&self, sequence: u64, goal: Option<&Goal>) {
        let _applied = self.with_inner(|inner| inner.receive_goal(sequence, goal.cloned()));
    }
}

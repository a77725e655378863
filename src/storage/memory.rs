//! In-memory storage backend.
//!
//! Provides [`InMemoryStorage`], a thread-safe in-memory implementation of
//! the storage traits. Useful for tests, demos and as the reference
//! behavior other backends are checked against.

use std::sync::{Arc, Mutex};

#[cfg(feature = "async")]
use core::future::{self, Future};

use super::observers::Observers;
use crate::error::{Result, SavingsError};
use crate::models::{
    Goal, NewTransaction, SubscriptionId, Transaction, TransactionId, TransactionPatch,
};
use crate::snapshot::SnapshotObserver;

/// Thread-safe in-memory storage.
///
/// This type implements both [`super::Storage`] (async) and
/// [`super::BlockingStorage`] (blocking) traits, as well as
/// [`super::Observable`].
///
/// # Example
///
/// ```rust
/// use savings_tracker::storage::InMemoryStorage;
///
/// let storage = InMemoryStorage::new();
/// // Use with the tracker builders:
/// // BlockingSavingsTracker::builder().storage(storage).build()
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    /// All data behind a single mutex for thread-safe interior mutability.
    inner: Mutex<Inner>,
    /// Change subscribers.
    observers: Observers,
}

/// Inner mutable state.
#[derive(Debug, Default)]
struct Inner {
    /// Stored transactions, in insertion order.
    transactions: Vec<Transaction>,
    /// Stored goal.
    goal: Option<Goal>,
    /// Commit counter, bumped by every successful write.
    sequence: u64,
    /// When set, every operation fails as if the backend were offline.
    unavailable: bool,
}

impl InMemoryStorage {
    /// Creates a new empty in-memory storage.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage pre-filled with the given data.
    #[inline]
    #[must_use]
    pub fn with_data(transactions: Vec<Transaction>, goal: Option<Goal>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                transactions,
                goal,
                sequence: 0,
                unavailable: false,
            }),
            observers: Observers::default(),
        }
    }

    /// Simulates a backend outage: while `true`, every read and write
    /// fails with [`SavingsError::Storage`].
    ///
    /// # Errors
    ///
    /// Returns an error if the inner lock is poisoned.
    #[inline]
    pub fn set_unavailable(&self, unavailable: bool) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|err| lock_error(&err))?;
        inner.unavailable = unavailable;
        Ok(())
    }

    /// Acquires the inner lock and applies a closure.
    fn with_lock<R, F: FnOnce(&mut Inner) -> Result<R>>(&self, op: F) -> Result<R> {
        let mut inner = self.inner.lock().map_err(|err| lock_error(&err))?;
        if inner.unavailable {
            return Err(SavingsError::Storage("storage backend is unavailable".into()));
        }
        op(&mut inner)
    }

    /// Returns all transactions in listing order.
    fn list(&self) -> Result<Vec<Transaction>> {
        self.list_at().map(|(_, transactions)| transactions)
    }

    /// Returns the listing together with the sequence it was read at.
    fn list_at(&self) -> Result<(u64, Vec<Transaction>)> {
        self.with_lock(|inner| Ok((inner.sequence, listing(&inner.transactions))))
    }

    /// Stores a new transaction and notifies observers.
    fn insert(&self, transaction: NewTransaction) -> Result<TransactionId> {
        let id = TransactionId::generate();
        let stored = transaction.into_transaction(id.clone());
        let (sequence, snapshot) = self.with_lock(|inner| {
            inner.transactions.push(stored);
            Ok((inner.commit(), listing(&inner.transactions)))
        })?;
        tracing::debug!(id = %id, "transaction added");
        self.observers.notify_transactions(sequence, &snapshot);
        Ok(id)
    }

    /// Patches an existing transaction and notifies observers.
    fn patch(&self, id: &TransactionId, patch: TransactionPatch) -> Result<()> {
        let (sequence, snapshot) = self.with_lock(|inner| {
            let target = inner
                .transactions
                .iter_mut()
                .find(|tx| tx.id == *id)
                .ok_or_else(|| SavingsError::TransactionNotFound(id.clone()))?;
            target.apply(patch);
            Ok((inner.commit(), listing(&inner.transactions)))
        })?;
        tracing::debug!(id = %id, "transaction updated");
        self.observers.notify_transactions(sequence, &snapshot);
        Ok(())
    }

    /// Removes a transaction and notifies observers.
    fn remove(&self, id: &TransactionId) -> Result<()> {
        let (sequence, snapshot) = self.with_lock(|inner| {
            let before = inner.transactions.len();
            inner.transactions.retain(|tx| tx.id != *id);
            if inner.transactions.len() == before {
                return Err(SavingsError::TransactionNotFound(id.clone()));
            }
            Ok((inner.commit(), listing(&inner.transactions)))
        })?;
        tracing::debug!(id = %id, "transaction deleted");
        self.observers.notify_transactions(sequence, &snapshot);
        Ok(())
    }

    /// Returns the stored goal.
    fn read_goal(&self) -> Result<Option<Goal>> {
        self.goal_at().map(|(_, goal)| goal)
    }

    /// Returns the goal together with the sequence it was read at.
    fn goal_at(&self) -> Result<(u64, Option<Goal>)> {
        self.with_lock(|inner| Ok((inner.sequence, inner.goal.clone())))
    }

    /// Stores the goal and notifies observers. With `require_existing`,
    /// fails if no goal is stored yet.
    fn write_goal(&self, goal: Goal, require_existing: bool) -> Result<()> {
        let sequence = self.with_lock(|inner| {
            if require_existing && inner.goal.is_none() {
                return Err(SavingsError::GoalNotSet);
            }
            inner.goal = Some(goal.clone());
            Ok(inner.commit())
        })?;
        tracing::debug!(name = %goal.name, "goal stored");
        self.observers.notify_goal(sequence, Some(&goal));
        Ok(())
    }

    /// Drops all data and notifies observers.
    fn reset(&self) -> Result<()> {
        let sequence = self.with_lock(|inner| {
            inner.transactions.clear();
            inner.goal = None;
            Ok(inner.commit())
        })?;
        tracing::debug!("storage cleared");
        self.observers.notify_transactions(sequence, &[]);
        self.observers.notify_goal(sequence, None);
        Ok(())
    }
}

impl Inner {
    /// Records a commit and returns its sequence.
    fn commit(&mut self) -> u64 {
        self.sequence = self.sequence.saturating_add(1);
        self.sequence
    }
}

/// Copies `transactions` into listing order.
fn listing(transactions: &[Transaction]) -> Vec<Transaction> {
    let mut sorted = transactions.to_vec();
    sorted.sort_by(Transaction::newest_first);
    sorted
}

/// Wraps a mutex poison error.
fn lock_error<T>(err: &std::sync::PoisonError<T>) -> SavingsError {
    SavingsError::Storage(err.to_string().into())
}

// ── Observable implementation ───────────────────────────────────────────

impl super::Observable for InMemoryStorage {
    #[inline]
    fn subscribe(&self, observer: Arc<dyn SnapshotObserver>) -> Result<SubscriptionId> {
        let id = self.observers.add(Arc::clone(&observer))?;
        match self.list_at() {
            Ok((sequence, transactions)) => observer.transactions_changed(sequence, &transactions),
            Err(err) => tracing::warn!(error = %err, "initial transaction read failed"),
        }
        match self.goal_at() {
            Ok((sequence, goal)) => observer.goal_changed(sequence, goal.as_ref()),
            Err(err) => tracing::warn!(error = %err, "initial goal read failed"),
        }
        Ok(id)
    }

    #[inline]
    fn unsubscribe(&self, id: SubscriptionId) -> Result<bool> {
        self.observers.remove(id)
    }
}

// ── BlockingStorage implementation ──────────────────────────────────────

#[cfg(feature = "blocking")]
impl super::BlockingStorage for InMemoryStorage {
    #[inline]
    fn transactions(&self) -> Result<Vec<Transaction>> {
        self.list()
    }

    #[inline]
    fn add_transaction(&self, transaction: NewTransaction) -> Result<TransactionId> {
        self.insert(transaction)
    }

    #[inline]
    fn update_transaction(&self, id: &TransactionId, patch: TransactionPatch) -> Result<()> {
        self.patch(id, patch)
    }

    #[inline]
    fn delete_transaction(&self, id: &TransactionId) -> Result<()> {
        self.remove(id)
    }

    #[inline]
    fn goal(&self) -> Result<Option<Goal>> {
        self.read_goal()
    }

    #[inline]
    fn set_goal(&self, goal: Goal) -> Result<()> {
        self.write_goal(goal, false)
    }

    #[inline]
    fn update_goal(&self, goal: Goal) -> Result<()> {
        self.write_goal(goal, true)
    }

    #[inline]
    fn clear(&self) -> Result<()> {
        self.reset()
    }
}

// ── Storage (async) implementation ──────────────────────────────────────

#[cfg(feature = "async")]
impl super::Storage for InMemoryStorage {
    #[inline]
    fn transactions(&self) -> impl Future<Output = Result<Vec<Transaction>>> + Send {
        future::ready(self.list())
    }

    #[inline]
    fn add_transaction(
        &self,
        transaction: NewTransaction,
    ) -> impl Future<Output = Result<TransactionId>> + Send {
        future::ready(self.insert(transaction))
    }

    #[inline]
    fn update_transaction(
        &self,
        id: &TransactionId,
        patch: TransactionPatch,
    ) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.patch(id, patch))
    }

    #[inline]
    fn delete_transaction(&self, id: &TransactionId) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.remove(id))
    }

    #[inline]
    fn goal(&self) -> impl Future<Output = Result<Option<Goal>>> + Send {
        future::ready(self.read_goal())
    }

    #[inline]
    fn set_goal(&self, goal: Goal) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.write_goal(goal, false))
    }

    #[inline]
    fn update_goal(&self, goal: Goal) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.write_goal(goal, true))
    }

    #[inline]
    fn clear(&self) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.reset())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;

    use super::*;
    use crate::snapshot::SharedAssembler;
    use crate::storage::Observable;

    /// Constant timestamp for test helpers.
    const TEST_TIMESTAMP_SECS: i64 = 1_714_521_600;

    fn ts(offset_secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(TEST_TIMESTAMP_SECS + offset_secs, 0).unwrap()
    }

    fn income(description: &str, amount: i64, offset_secs: i64) -> NewTransaction {
        NewTransaction::income(description, Decimal::new(amount, 0), ts(offset_secs))
    }

    fn test_goal(target: i64) -> Goal {
        Goal::new("Holiday", Decimal::new(target, 0)).unwrap()
    }

    /// Counts notifications per half.
    #[derive(Debug, Default)]
    struct Recorder {
        /// Lengths of delivered transaction lists.
        transaction_lists: Mutex<Vec<usize>>,
        /// Delivered goal names.
        goals: Mutex<Vec<Option<String>>>,
    }

    impl SnapshotObserver for Recorder {
        fn transactions_changed(&self, _sequence: u64, transactions: &[Transaction]) {
            self.transaction_lists.lock().unwrap().push(transactions.len());
        }

        fn goal_changed(&self, _sequence: u64, goal: Option<&Goal>) {
            self.goals
                .lock()
                .unwrap()
                .push(goal.map(|goal| goal.name.clone()));
        }
    }

    #[test]
    fn subscribe_delivers_current_state() {
        let s = InMemoryStorage::with_data(Vec::new(), Some(test_goal(100)));
        let recorder = Arc::new(Recorder::default());
        let _id = s.subscribe(Arc::<Recorder>::clone(&recorder)).unwrap();
        assert_eq!(*recorder.transaction_lists.lock().unwrap(), [0]);
        assert_eq!(
            *recorder.goals.lock().unwrap(),
            [Some("Holiday".to_owned())]
        );
    }

    #[test]
    fn subscribe_during_outage_delivers_nothing() {
        let s = InMemoryStorage::new();
        s.set_unavailable(true).unwrap();
        let assembler = Arc::new(SharedAssembler::new());
        let _id = s.subscribe(Arc::<SharedAssembler>::clone(&assembler)).unwrap();
        assert!(assembler.is_loading());
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let s = InMemoryStorage::new();
        let assembler = Arc::new(SharedAssembler::new());
        let id = s.subscribe(Arc::<SharedAssembler>::clone(&assembler)).unwrap();
        let revision = assembler.current().unwrap().revision;
        assert!(s.unsubscribe(id).unwrap());
        assert!(!s.unsubscribe(id).unwrap());
        s.write_goal(test_goal(5), false).unwrap();
        assert_eq!(assembler.current().unwrap().revision, revision);
    }

    /// Forwards to an assembler, stalling the first write delivery until
    /// released.
    #[derive(Debug)]
    struct StallFirstWrite {
        assembler: SharedAssembler,
        deliveries: AtomicUsize,
        reached: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl SnapshotObserver for StallFirstWrite {
        fn transactions_changed(&self, sequence: u64, transactions: &[Transaction]) {
            // Delivery 0 comes from subscribe, delivery 1 from the first write.
            if self.deliveries.fetch_add(1, Ordering::SeqCst) == 1 {
                self.reached.lock().unwrap().send(()).unwrap();
                self.release.lock().unwrap().recv().unwrap();
            }
            self.assembler.transactions_changed(sequence, transactions);
        }

        fn goal_changed(&self, sequence: u64, goal: Option<&Goal>) {
            self.assembler.goal_changed(sequence, goal);
        }
    }

    #[test]
    fn delayed_delivery_does_not_overwrite_newer_state() {
        let store = Arc::new(InMemoryStorage::new());
        let (reached_tx, reached_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let observer = Arc::new(StallFirstWrite {
            assembler: SharedAssembler::new(),
            deliveries: AtomicUsize::new(0),
            reached: Mutex::new(reached_tx),
            release: Mutex::new(release_rx),
        });
        let _id = store
            .subscribe(Arc::<StallFirstWrite>::clone(&observer))
            .unwrap();

        let first_writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || store.insert(income("Salary", 100, 0)).unwrap())
        };
        reached_rx.recv().unwrap();
        let _second = store.insert(income("Bonus", 50, 60)).unwrap();
        release_tx.send(()).unwrap();
        let _first = first_writer.join().unwrap();

        assert_eq!(store.list().unwrap().len(), 2);
        assert_eq!(observer.assembler.current().unwrap().transactions.len(), 2);
    }

    #[cfg(feature = "blocking")]
    mod blocking {
        use super::*;
        use crate::error::ValidationError;
        use crate::storage::BlockingStorage;

        #[test]
        fn empty_storage() {
            let s = InMemoryStorage::new();
            assert!(s.transactions().unwrap().is_empty());
            assert!(s.goal().unwrap().is_none());
        }

        #[test]
        fn add_and_list_newest_first() {
            let s = InMemoryStorage::new();
            let older = s.add_transaction(income("Salary", 100, 0)).unwrap();
            let newer = s.add_transaction(income("Bonus", 50, 3_600)).unwrap();
            let listed = s.transactions().unwrap();
            let ids: Vec<&TransactionId> = listed.iter().map(|tx| &tx.id).collect();
            assert_eq!(ids, [&newer, &older]);
        }

        #[test]
        fn update_applies_patch() {
            let s = InMemoryStorage::new();
            let id = s.add_transaction(income("Salary", 100, 0)).unwrap();
            s.update_transaction(&id, TransactionPatch::new().description("Paycheck"))
                .unwrap();
            let listed = s.transactions().unwrap();
            assert_eq!(listed[0].description, "Paycheck");
            assert_eq!(listed[0].amount, Decimal::new(100, 0));
        }

        #[test]
        fn update_unknown_id_fails() {
            let s = InMemoryStorage::new();
            let missing = TransactionId::new("missing".to_owned());
            let err = s
                .update_transaction(&missing, TransactionPatch::new())
                .unwrap_err();
            assert!(matches!(err, SavingsError::TransactionNotFound(id) if id == missing));
        }

        #[test]
        fn delete_removes_and_reports_missing() {
            let s = InMemoryStorage::new();
            let id = s.add_transaction(income("Salary", 100, 0)).unwrap();
            s.delete_transaction(&id).unwrap();
            assert!(s.transactions().unwrap().is_empty());
            assert!(matches!(
                s.delete_transaction(&id),
                Err(SavingsError::TransactionNotFound(_))
            ));
        }

        #[test]
        fn goal_lifecycle() {
            let s = InMemoryStorage::new();
            assert!(matches!(
                s.update_goal(test_goal(10)),
                Err(SavingsError::GoalNotSet)
            ));
            s.set_goal(test_goal(10)).unwrap();
            s.update_goal(test_goal(20)).unwrap();
            assert_eq!(s.goal().unwrap(), Some(test_goal(20)));
        }

        #[test]
        fn store_does_not_validate() {
            // Validation belongs to the tracker; the store persists as-is.
            let s = InMemoryStorage::new();
            let blank = NewTransaction::income(" ", Decimal::ZERO, ts(0));
            assert_eq!(blank.validate(), Err(ValidationError::EmptyDescription));
            let _id = s.add_transaction(blank).unwrap();
            assert_eq!(s.transactions().unwrap().len(), 1);
        }

        #[test]
        fn outage_fails_reads_and_writes() {
            let s = InMemoryStorage::new();
            s.set_unavailable(true).unwrap();
            assert!(matches!(s.transactions(), Err(SavingsError::Storage(_))));
            assert!(matches!(
                s.add_transaction(income("Salary", 1, 0)),
                Err(SavingsError::Storage(_))
            ));
            s.set_unavailable(false).unwrap();
            assert!(s.transactions().unwrap().is_empty());
        }

        #[test]
        fn writes_notify_observers() {
            let s = InMemoryStorage::new();
            let assembler = Arc::new(SharedAssembler::new());
            let _sub = s.subscribe(Arc::<SharedAssembler>::clone(&assembler)).unwrap();
            let id = s.add_transaction(income("Salary", 100, 0)).unwrap();
            s.set_goal(test_goal(200)).unwrap();
            let snapshot = assembler.current().unwrap();
            assert_eq!(snapshot.transactions.len(), 1);
            assert_eq!(snapshot.goal, Some(test_goal(200)));

            s.delete_transaction(&id).unwrap();
            assert!(assembler.current().unwrap().transactions.is_empty());
        }

        #[test]
        fn failed_write_does_not_notify() {
            let s = InMemoryStorage::new();
            let assembler = Arc::new(SharedAssembler::new());
            let _sub = s.subscribe(Arc::<SharedAssembler>::clone(&assembler)).unwrap();
            let revision = assembler.current().unwrap().revision;
            assert!(s.update_goal(test_goal(1)).is_err());
            assert_eq!(assembler.current().unwrap().revision, revision);
        }

        #[test]
        fn clear_resets_everything() {
            let s = InMemoryStorage::new();
            let _id = s.add_transaction(income("Salary", 100, 0)).unwrap();
            s.set_goal(test_goal(10)).unwrap();
            s.clear().unwrap();
            assert!(s.transactions().unwrap().is_empty());
            assert!(s.goal().unwrap().is_none());
        }
    }

    #[cfg(feature = "async")]
    mod async_tests {
        use super::*;
        use crate::storage::Storage;

        #[tokio::test]
        async fn add_update_delete() {
            let s = InMemoryStorage::new();
            let id = s.add_transaction(income("Salary", 100, 0)).await.unwrap();
            s.update_transaction(&id, TransactionPatch::new().amount(Decimal::new(150, 0)))
                .await
                .unwrap();
            assert_eq!(
                s.transactions().await.unwrap()[0].amount,
                Decimal::new(150, 0)
            );
            s.delete_transaction(&id).await.unwrap();
            assert!(s.transactions().await.unwrap().is_empty());
        }

        #[tokio::test]
        async fn goal_lifecycle() {
            let s = InMemoryStorage::new();
            assert!(s.goal().await.unwrap().is_none());
            assert!(s.update_goal(test_goal(10)).await.is_err());
            s.set_goal(test_goal(10)).await.unwrap();
            assert_eq!(s.goal().await.unwrap(), Some(test_goal(10)));
        }

        #[tokio::test]
        async fn clear_resets_everything() {
            let s = InMemoryStorage::new();
            let _id = s.add_transaction(income("Salary", 100, 0)).await.unwrap();
            s.set_goal(test_goal(10)).await.unwrap();
            s.clear().await.unwrap();
            assert!(s.transactions().await.unwrap().is_empty());
            assert!(s.goal().await.unwrap().is_none());
        }
    }
}

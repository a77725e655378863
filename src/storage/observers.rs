//! Observer registry shared by the storage backends.

use std::sync::{Arc, Mutex};

use crate::error::{Result, SavingsError};
use crate::models::{Goal, SubscriptionId, Transaction};
use crate::snapshot::SnapshotObserver;

/// Registered observers, in subscription order.
#[derive(Debug, Default)]
pub(crate) struct Observers {
    /// Guarded registry state.
    inner: Mutex<Registry>,
}

/// Registry contents.
#[derive(Debug, Default)]
struct Registry {
    /// Next ID to hand out.
    next_id: u64,
    /// Active subscriptions.
    entries: Vec<(SubscriptionId, Arc<dyn SnapshotObserver>)>,
}

impl Observers {
    /// Registers an observer and returns its ID.
    pub(crate) fn add(&self, observer: Arc<dyn SnapshotObserver>) -> Result<SubscriptionId> {
        let mut registry = self.inner.lock().map_err(|err| lock_error(&err))?;
        let id = SubscriptionId::new(registry.next_id);
        registry.next_id = registry.next_id.saturating_add(1);
        registry.entries.push((id, observer));
        tracing::debug!(subscription = %id, "observer subscribed");
        Ok(id)
    }

    /// Removes an observer; `false` if it was not registered.
    pub(crate) fn remove(&self, id: SubscriptionId) -> Result<bool> {
        let mut registry = self.inner.lock().map_err(|err| lock_error(&err))?;
        let before = registry.entries.len();
        registry.entries.retain(|(entry_id, _)| *entry_id != id);
        let removed = registry.entries.len() != before;
        tracing::debug!(subscription = %id, removed, "observer unsubscribed");
        Ok(removed)
    }

    /// Copies the current observer list so callbacks run without the
    /// registry lock held.
    fn listeners(&self) -> Vec<Arc<dyn SnapshotObserver>> {
        match self.inner.lock() {
            Ok(registry) => registry
                .entries
                .iter()
                .map(|(_, observer)| Arc::clone(observer))
                .collect(),
            Err(err) => {
                tracing::warn!(error = %err, "observer registry poisoned; skipping notification");
                Vec::new()
            }
        }
    }

    /// Delivers the transaction list committed at `sequence` to every
    /// observer.
    pub(crate) fn notify_transactions(&self, sequence: u64, transactions: &[Transaction]) {
        let listeners = self.listeners();
        tracing::trace!(observers = listeners.len(), sequence, "notifying transaction change");
        for observer in listeners {
            observer.transactions_changed(sequence, transactions);
        }
    }

    /// Delivers the goal committed at `sequence` to every observer.
    pub(crate) fn notify_goal(&self, sequence: u64, goal: Option<&Goal>) {
        let listeners = self.listeners();
        tracing::trace!(observers = listeners.len(), sequence, "notifying goal change");
        for observer in listeners {
            observer.goal_changed(sequence, goal);
        }
    }
}

/// Wraps a mutex poison error.
fn lock_error<T>(err: &std::sync::PoisonError<T>) -> SavingsError {
    SavingsError::Storage(err.to_string().into())
}

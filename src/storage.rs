//! Pluggable storage backends for transactions and the savings goal.
//!
//! This module defines the [`Storage`] (async) and [`BlockingStorage`]
//! (blocking) traits via a shared macro, plus the [`Observable`]
//! subscription contract that backends use to push change notifications.
//!
//! Stores only persist. Input validation happens in [`crate::tracker`]
//! before a store is called.

#[cfg(feature = "storage-file")]
mod file;
mod memory;
mod observers;

use std::sync::Arc;

#[cfg(feature = "storage-file")]
pub use file::FileStorage;
pub use memory::InMemoryStorage;

use crate::error::Result;
use crate::models::SubscriptionId;
use crate::snapshot::SnapshotObserver;

/// Generates a storage trait (async or blocking) with all methods.
///
/// Uses `@methods` to define the method list once, and `@method` to render
/// each method in async (`impl Future + Send`) or blocking (`fn`) style.
macro_rules! define_storage {
    // ── Entry points ────────────────────────────────────────────────
    (
        trait_name: $trait_name:ident,
        trait_doc: $trait_doc:expr,
        mode: async_mode,
    ) => {
        #[doc = $trait_doc]
        pub trait $trait_name: core::fmt::Debug + Send + Sync {
            define_storage!(@methods async_mode);
        }
    };
    (
        trait_name: $trait_name:ident,
        trait_doc: $trait_doc:expr,
        mode: blocking,
    ) => {
        #[doc = $trait_doc]
        pub trait $trait_name: core::fmt::Debug + Send + Sync {
            define_storage!(@methods blocking);
        }
    };

    // ── Single method list (shared between both variants) ───────────
    (@methods $mode:ident) => {
        // Transactions
        define_storage!(@method $mode, transactions,
            "Returns all stored transactions, most recent first (undated last).\n\n# Errors\n\nReturns an error if the storage backend fails to read.",
            -> Result<Vec<Transaction>>);
        define_storage!(@method $mode, add_transaction,
            "Stores a new transaction under a freshly generated ID and returns that ID.\n\n# Errors\n\nReturns an error if the storage backend fails to write.",
            transaction: NewTransaction, -> Result<TransactionId>);
        define_storage!(@method $mode, update_transaction,
            "Applies a patch to the transaction with the given ID.\n\n# Errors\n\nReturns [`SavingsError::TransactionNotFound`](crate::error::SavingsError::TransactionNotFound) if no such transaction exists,\nor an error if the storage backend fails.",
            id: &TransactionId, patch: TransactionPatch, -> Result<()>);
        define_storage!(@method $mode, delete_transaction,
            "Removes the transaction with the given ID.\n\n# Errors\n\nReturns [`SavingsError::TransactionNotFound`](crate::error::SavingsError::TransactionNotFound) if no such transaction exists,\nor an error if the storage backend fails.",
            id: &TransactionId, -> Result<()>);

        // Goal
        define_storage!(@method $mode, goal,
            "Returns the goal, or `Ok(None)` if none has been set.\n\n# Errors\n\nReturns an error if the storage backend fails to read.",
            -> Result<Option<Goal>>);
        define_storage!(@method $mode, set_goal,
            "Stores the goal, replacing any existing one.\n\n# Errors\n\nReturns an error if the storage backend fails to write.",
            goal: Goal, -> Result<()>);
        define_storage!(@method $mode, update_goal,
            "Replaces an existing goal.\n\n# Errors\n\nReturns [`SavingsError::GoalNotSet`](crate::error::SavingsError::GoalNotSet) if no goal exists,\nor an error if the storage backend fails.",
            goal: Goal, -> Result<()>);

        // Clear
        define_storage!(@method $mode, clear,
            "Removes all stored transactions and the goal.\n\n# Errors\n\nReturns an error if the storage backend fails to write.",
            -> Result<()>);
    };

    // ── Blocking method renderer ────────────────────────────────────
    (@method blocking, $name:ident, $doc:expr,
     $($param:ident: $param_ty:ty,)* -> $ret:ty) => {
        #[doc = $doc]
        fn $name(&self $(, $param: $param_ty)*) -> $ret;
    };

    // ── Async method renderer (returns impl Future + Send) ──────────
    (@method async_mode, $name:ident, $doc:expr,
     $($param:ident: $param_ty:ty,)* -> $ret:ty) => {
        #[doc = $doc]
        fn $name(&self $(, $param: $param_ty)*)
            -> impl core::future::Future<Output = $ret> + Send;
    };
}

#[cfg(feature = "async")]
mod async_storage {
    //! Async storage trait definition.

    use crate::error::Result;
    use crate::models::{Goal, NewTransaction, Transaction, TransactionId, TransactionPatch};

    define_storage! {
        trait_name: Storage,
        trait_doc: "Async storage backend for transactions and the savings goal.\n\nAll methods take `&self`; implementations use interior mutability\n(e.g. `Mutex`) for thread-safe mutation.",
        mode: async_mode,
    }
}

#[cfg(feature = "blocking")]
mod blocking_storage {
    //! Blocking storage trait definition.

    use crate::error::Result;
    use crate::models::{Goal, NewTransaction, Transaction, TransactionId, TransactionPatch};

    define_storage! {
        trait_name: BlockingStorage,
        trait_doc: "Blocking storage backend for transactions and the savings goal.\n\nAll methods take `&self`; implementations use interior mutability\n(e.g. `Mutex`) for thread-safe mutation.",
        mode: blocking,
    }
}

#[cfg(feature = "async")]
pub use async_storage::Storage;
#[cfg(feature = "blocking")]
pub use blocking_storage::BlockingStorage;

/// Change-notification contract for storage backends.
///
/// On [`Observable::subscribe`] the observer immediately receives the
/// current transactions and goal; afterwards it receives the new state of
/// whichever half a successful write changed. Observers are called after
/// the store has released its locks, so they may read from the store.
///
/// Every delivery carries the store's commit sequence at the time the
/// state was read. Deliveries from concurrent writers can arrive out of
/// order; observers should drop a delivery older than the last one they
/// applied for the same half.
pub trait Observable {
    /// Registers an observer and delivers the current state to it.
    ///
    /// If the current state cannot be read, nothing is delivered and the
    /// observer waits for the next successful write.
    ///
    /// # Errors
    ///
    /// Returns an error if the observer registry is unavailable.
    fn subscribe(&self, observer: Arc<dyn SnapshotObserver>) -> Result<SubscriptionId>;

    /// Removes an observer. Returns `false` if the ID was not registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the observer registry is unavailable.
    fn unsubscribe(&self, id: SubscriptionId) -> Result<bool>;
}

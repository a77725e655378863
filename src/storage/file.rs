//! JSON-file-based storage backend.
//!
//! Stores transactions and the goal in separate JSON files under a
//! configurable directory (default: `$XDG_DATA_HOME/savings-tracker/`).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[cfg(feature = "async")]
use core::future::{self, Future};

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::observers::Observers;
use crate::config::TrackerConfig;
use crate::error::{Result, SavingsError};
use crate::models::{
    Goal, NewTransaction, SubscriptionId, Transaction, TransactionId, TransactionPatch,
};
use crate::snapshot::SnapshotObserver;

/// Application name used for the XDG data directory.
const APP_NAME: &str = "savings-tracker";

/// File name for transactions.
const TRANSACTIONS_FILE: &str = "transactions.json";
/// File name for the goal.
const GOAL_FILE: &str = "goal.json";
/// Sentinel file used for cross-process file locking.
const LOCK_FILE: &str = "storage.lock";

/// File-backed storage that persists data as JSON files.
///
/// # Concurrency
///
/// Thread safety within a single process is provided by an in-process
/// [`Mutex`]. Cross-process safety is achieved via an advisory file lock
/// on `storage.lock` (using [`std::fs::File::lock`] /
/// [`std::fs::File::lock_shared`]).
///
/// Read operations acquire a shared lock, write operations an exclusive
/// one. Observers are notified after both locks are released.
///
/// # File layout
///
/// ```text
/// <dir>/
///   storage.lock          (cross-process lock sentinel)
///   transactions.json
///   goal.json             (absent until a goal is set)
/// ```
#[derive(Debug)]
pub struct FileStorage {
    /// Root directory containing all JSON files.
    dir: PathBuf,
    /// Mutex serializing concurrent in-process access. Holds the commit
    /// counter, bumped by every successful write.
    lock: Mutex<u64>,
    /// Sentinel file for cross-process advisory locking.
    lock_file: fs::File,
    /// Change subscribers.
    observers: Observers,
}

impl FileStorage {
    /// Creates a new file storage rooted at the given directory.
    ///
    /// Creates the directory (and parents) if it does not exist, and
    /// opens (or creates) the `storage.lock` sentinel file.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the lock
    /// file cannot be opened.
    #[inline]
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).map_err(storage_io_error)?;
        let lock_file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))
            .map_err(storage_io_error)?;
        tracing::debug!(dir = %dir.display(), "file storage opened");
        Ok(Self {
            dir,
            lock: Mutex::new(0),
            lock_file,
            observers: Observers::default(),
        })
    }

    /// Opens the storage at `config.data_dir`, falling back to
    /// [`FileStorage::default_dir`] when none is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the default directory cannot be determined or
    /// the storage cannot be opened.
    #[inline]
    pub fn from_config(config: &TrackerConfig) -> Result<Self> {
        let dir = match config.data_dir.as_ref() {
            Some(dir) => dir.clone(),
            None => Self::default_dir()?,
        };
        Self::new(dir)
    }

    /// Returns the default XDG-compliant data directory for this application.
    ///
    /// On Linux: `$XDG_DATA_HOME/savings-tracker/` (typically
    /// `~/.local/share/savings-tracker/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the platform data directory cannot be determined.
    #[inline]
    pub fn default_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|data_path| data_path.join(APP_NAME))
            .ok_or_else(|| {
                SavingsError::Storage("could not determine platform data directory".into())
            })
    }

    /// Returns the directory this storage writes to.
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // ── Private helpers ─────────────────────────────────────────────

    /// Returns the full path for a given file name.
    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Acquires the in-process guard and a shared file lock, runs `op`,
    /// then releases the file lock. Returns the commit sequence the read
    /// observed alongside the result.
    fn with_shared_lock<R, F: FnOnce() -> Result<R>>(&self, op: F) -> Result<(u64, R)> {
        let guard: MutexGuard<'_, u64> = self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        self.lock_file.lock_shared().map_err(storage_io_error)?;
        let result = op();
        // The operation's own error wins over an unlock failure.
        if let Err(err) = self.lock_file.unlock()
            && result.is_ok()
        {
            return Err(storage_io_error(err));
        }
        Ok((*guard, result?))
    }

    /// Acquires the in-process guard and an exclusive file lock, runs
    /// `op`, then releases the file lock. On success the commit sequence
    /// is bumped and returned alongside the result.
    fn with_exclusive_lock<R, F: FnOnce() -> Result<R>>(&self, op: F) -> Result<(u64, R)> {
        let mut guard: MutexGuard<'_, u64> =
            self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        self.lock_file.lock().map_err(storage_io_error)?;
        let result = op();
        if let Err(err) = self.lock_file.unlock()
            && result.is_ok()
        {
            return Err(storage_io_error(err));
        }
        let value = result?;
        *guard = guard.saturating_add(1);
        Ok((*guard, value))
    }

    /// Reads and deserializes a JSON file. Returns `None` if the file does
    /// not exist.
    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match fs::read_to_string(self.path(name)) {
            Ok(contents) => serde_json::from_str(&contents)
                .map(Some)
                .map_err(SavingsError::from),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(storage_io_error(err)),
        }
    }

    /// Atomically writes a serialized JSON file (write-to-tmp then rename).
    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.path(name);
        let tmp_path = self.path(&format!("{name}.tmp"));
        let json = serde_json::to_string_pretty(value).map_err(SavingsError::from)?;
        fs::write(&tmp_path, json).map_err(storage_io_error)?;
        fs::rename(&tmp_path, &path).map_err(storage_io_error)?;
        Ok(())
    }

    /// Reads the transaction file without locking.
    fn load_transactions(&self) -> Result<Vec<Transaction>> {
        Ok(self.read_json(TRANSACTIONS_FILE)?.unwrap_or_default())
    }

    /// Reads, modifies and rewrites the transaction file under an
    /// exclusive lock, then notifies observers with the new listing.
    fn modify_transactions<R, F>(&self, op: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<Transaction>) -> Result<R>,
    {
        let (sequence, (result, snapshot)) = self.with_exclusive_lock(|| {
            let mut transactions = self.load_transactions()?;
            let result = op(&mut transactions)?;
            self.write_json(TRANSACTIONS_FILE, &transactions)?;
            Ok((result, listing(transactions)))
        })?;
        self.observers.notify_transactions(sequence, &snapshot);
        Ok(result)
    }

    /// Returns all transactions in listing order.
    fn list(&self) -> Result<Vec<Transaction>> {
        self.list_at().map(|(_, transactions)| transactions)
    }

    /// Returns the listing together with the sequence it was read at.
    fn list_at(&self) -> Result<(u64, Vec<Transaction>)> {
        self.with_shared_lock(|| self.load_transactions().map(listing))
    }

    /// Stores a new transaction.
    fn insert(&self, transaction: NewTransaction) -> Result<TransactionId> {
        let id = TransactionId::generate();
        let stored = transaction.into_transaction(id.clone());
        self.modify_transactions(|transactions| {
            transactions.push(stored);
            Ok(())
        })?;
        tracing::debug!(id = %id, "transaction added");
        Ok(id)
    }

    /// Patches an existing transaction.
    fn patch(&self, id: &TransactionId, patch: TransactionPatch) -> Result<()> {
        self.modify_transactions(|transactions| {
            let target = transactions
                .iter_mut()
                .find(|tx| tx.id == *id)
                .ok_or_else(|| SavingsError::TransactionNotFound(id.clone()))?;
            target.apply(patch);
            Ok(())
        })?;
        tracing::debug!(id = %id, "transaction updated");
        Ok(())
    }

    /// Removes a transaction.
    fn remove(&self, id: &TransactionId) -> Result<()> {
        self.modify_transactions(|transactions| {
            let before = transactions.len();
            transactions.retain(|tx| tx.id != *id);
            if transactions.len() == before {
                return Err(SavingsError::TransactionNotFound(id.clone()));
            }
            Ok(())
        })?;
        tracing::debug!(id = %id, "transaction deleted");
        Ok(())
    }

    /// Returns the stored goal.
    fn read_goal(&self) -> Result<Option<Goal>> {
        self.goal_at().map(|(_, goal)| goal)
    }

    /// Returns the goal together with the sequence it was read at.
    fn goal_at(&self) -> Result<(u64, Option<Goal>)> {
        self.with_shared_lock(|| self.read_json(GOAL_FILE))
    }

    /// Stores the goal. With `require_existing`, fails if no goal file
    /// exists yet.
    fn write_goal(&self, goal: Goal, require_existing: bool) -> Result<()> {
        let (sequence, ()) = self.with_exclusive_lock(|| {
            if require_existing && self.read_json::<Goal>(GOAL_FILE)?.is_none() {
                return Err(SavingsError::GoalNotSet);
            }
            self.write_json(GOAL_FILE, &goal)
        })?;
        tracing::debug!(name = %goal.name, "goal stored");
        self.observers.notify_goal(sequence, Some(&goal));
        Ok(())
    }

    /// Deletes all data files.
    ///
    /// The `storage.lock` sentinel is preserved.
    fn clear_all(&self) -> Result<()> {
        let (sequence, ()) = self.with_exclusive_lock(|| {
            for name in [TRANSACTIONS_FILE, GOAL_FILE] {
                match fs::remove_file(self.path(name)) {
                    Ok(()) => {}
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                    Err(err) => return Err(storage_io_error(err)),
                }
            }
            Ok(())
        })?;
        tracing::debug!("storage cleared");
        self.observers.notify_transactions(sequence, &[]);
        self.observers.notify_goal(sequence, None);
        Ok(())
    }
}

// ── Free-standing helpers ───────────────────────────────────────────────

/// Sorts transactions into listing order.
fn listing(mut transactions: Vec<Transaction>) -> Vec<Transaction> {
    transactions.sort_by(Transaction::newest_first);
    transactions
}

/// Wraps an I/O error into a [`SavingsError::Storage`].
fn storage_io_error(err: io::Error) -> SavingsError {
    SavingsError::Storage(Box::new(err))
}

/// Wraps a mutex poison error into a [`SavingsError::Storage`].
fn lock_poison_error<T>(err: &std::sync::PoisonError<T>) -> SavingsError {
    SavingsError::Storage(err.to_string().into())
}

// ── Observable implementation ───────────────────────────────────────────

impl super::Observable for FileStorage {
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
impl super::BlockingStorage for FileStorage {
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
        self.clear_all()
    }
}

// ── Storage (async) implementation ──────────────────────────────────────

#[cfg(feature = "async")]
impl super::Storage for FileStorage {
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
        future::ready(self.clear_all())
    }
}

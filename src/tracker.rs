//! High-level savings tracker with integrated storage.
//!
//! Combines a [`Storage`](crate::storage::Storage) /
//! [`BlockingStorage`](crate::storage::BlockingStorage) backend with a
//! [`TrackerConfig`](crate::config::TrackerConfig) to provide validated
//! writes and the derived views: summary, day listing and month calendar.

/// Generates a high-level tracker (async or blocking).
macro_rules! define_tracker {
    (
        tracker_name: $tracker:ident,
        builder_name: $builder:ident,
        storage_trait: $storage_trait:ident,
        tracker_doc: $tracker_doc:expr,
        builder_doc: $builder_doc:expr,
        $(async_kw: $async_kw:tt,)?
        $(await_kw: $await_ext:tt,)?
    ) => {
        #[doc = $builder_doc]
        #[derive(Debug)]
        pub struct $builder<S: $storage_trait> {
            /// Storage backend.
            storage: Option<S>,
            /// Calendar and data settings.
            config: TrackerConfig,
        }

        impl<S: $storage_trait> $builder<S> {
            /// Sets the storage backend.
            #[inline]
            #[must_use]
            pub fn storage(mut self, storage: S) -> Self {
                self.storage = Some(storage);
                self
            }

            /// Replaces the configuration (defaults to [`TrackerConfig::default`]).
            #[inline]
            #[must_use]
            pub fn config(mut self, config: TrackerConfig) -> Self {
                self.config = config;
                self
            }

            /// Builds the tracker.
            ///
            /// # Errors
            ///
            /// Returns [`SavingsError::Storage`] if no storage was provided.
            #[inline]
            pub fn build(self) -> Result<$tracker<S>> {
                let storage = self.storage.ok_or_else(|| {
                    SavingsError::Storage("storage backend is required".into())
                })?;
                Ok($tracker {
                    storage,
                    config: self.config,
                })
            }
        }

        #[doc = $tracker_doc]
        #[derive(Debug)]
        pub struct $tracker<S: $storage_trait> {
            /// Storage backend.
            storage: S,
            /// Calendar and data settings.
            config: TrackerConfig,
        }

        impl<S: $storage_trait> $tracker<S> {
            /// Creates a new builder for configuring the tracker.
            #[inline]
            #[must_use]
            pub fn builder() -> $builder<S> {
                $builder {
                    storage: None,
                    config: TrackerConfig::default(),
                }
            }

            /// Returns the active configuration.
            #[inline]
            #[must_use]
            pub const fn config(&self) -> &TrackerConfig {
                &self.config
            }

            /// Returns the storage backend, e.g. to subscribe observers.
            #[inline]
            #[must_use]
            pub const fn storage(&self) -> &S {
                &self.storage
            }

            // ── Reads ────────────────────────────────────────────────

            /// Returns all transactions, most recent first.
            ///
            /// # Errors
            ///
            /// Returns an error if the storage backend fails to read.
            #[inline]
            pub $($async_kw)? fn transactions(&self) -> Result<Vec<Transaction>> {
                self.storage.transactions() $( .$await_ext )?
            }

            /// Returns the savings goal, if one has been set.
            ///
            /// # Errors
            ///
            /// Returns an error if the storage backend fails to read.
            #[inline]
            pub $($async_kw)? fn goal(&self) -> Result<Option<Goal>> {
                self.storage.goal() $( .$await_ext )?
            }

            /// Computes balance, progress and totals from the stored data.
            ///
            /// # Errors
            ///
            /// Returns an error if either read fails.
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn summary(&self) -> Result<Summary> {
                let transactions = self.storage.transactions() $( .$await_ext )? ?;
                let goal = self.storage.goal() $( .$await_ext )? ?;
                let summary = Summary::compute(&transactions, goal.as_ref());
                tracing::trace!(balance = %summary.balance, progress = %summary.progress, "summary computed");
                Ok(summary)
            }

            /// Returns the transactions whose local date is `date`, most
            /// recent first.
            ///
            /// # Errors
            ///
            /// Returns an error if the storage backend fails to read.
            #[tracing::instrument(skip_all, fields(date = %date))]
            pub $($async_kw)? fn day(&self, date: NaiveDate) -> Result<Vec<Transaction>> {
                let transactions = self.storage.transactions() $( .$await_ext )? ?;
                Ok(self.config.zone.filter_by_date(&transactions, date))
            }

            /// Builds the calendar grid for `month` using the configured
            /// week start and time zone.
            ///
            /// # Errors
            ///
            /// Returns an error if the storage backend fails to read.
            #[tracing::instrument(skip_all, fields(month = %month))]
            pub $($async_kw)? fn calendar(&self, month: YearMonth) -> Result<Vec<CalendarCell>> {
                let transactions = self.storage.transactions() $( .$await_ext )? ?;
                let daily = self.config.zone.daily_aggregates(&transactions);
                Ok(calendar::build_calendar_grid_with(
                    month.year(),
                    month.month(),
                    &daily,
                    self.config.week_start,
                ))
            }

            // ── Transaction writes ───────────────────────────────────

            /// Validates and stores a new transaction.
            ///
            /// # Errors
            ///
            /// Returns [`SavingsError::Validation`] for a blank description
            /// or a non-positive amount, or an error if the store fails.
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn add_transaction(
                &self,
                transaction: NewTransaction,
            ) -> Result<TransactionId> {
                if let Err(err) = transaction.validate() {
                    tracing::debug!(error = %err, "transaction rejected");
                    return Err(err.into());
                }
                self.storage.add_transaction(transaction) $( .$await_ext )?
            }

            /// Records an income of `amount` at `date`.
            ///
            /// # Errors
            ///
            /// Same as [`Self::add_transaction`].
            #[inline]
            pub $($async_kw)? fn add_income<T: Into<String>>(
                &self,
                description: T,
                amount: Decimal,
                date: DateTime<Utc>,
            ) -> Result<TransactionId> {
                self.add_transaction(NewTransaction::income(description, amount, date))
                    $( .$await_ext )?
            }

            /// Records an expense of `amount` at `date`.
            ///
            /// # Errors
            ///
            /// Same as [`Self::add_transaction`].
            #[inline]
            pub $($async_kw)? fn add_expense<T: Into<String>>(
                &self,
                description: T,
                amount: Decimal,
                date: DateTime<Utc>,
            ) -> Result<TransactionId> {
                self.add_transaction(NewTransaction::expense(description, amount, date))
                    $( .$await_ext )?
            }

            /// Validates and applies a patch to an existing transaction.
            ///
            /// # Errors
            ///
            /// Returns [`SavingsError::Validation`] for an invalid field,
            /// [`SavingsError::TransactionNotFound`] for an unknown ID, or an
            /// error if the store fails.
            #[tracing::instrument(skip_all, fields(id = %id))]
            pub $($async_kw)? fn update_transaction(
                &self,
                id: &TransactionId,
                patch: TransactionPatch,
            ) -> Result<()> {
                patch.validate()?;
                self.storage.update_transaction(id, patch.normalized()) $( .$await_ext )?
            }

            /// Deletes a transaction.
            ///
            /// # Errors
            ///
            /// Returns [`SavingsError::TransactionNotFound`] for an unknown
            /// ID, or an error if the store fails.
            #[tracing::instrument(skip_all, fields(id = %id))]
            pub $($async_kw)? fn delete_transaction(&self, id: &TransactionId) -> Result<()> {
                self.storage.delete_transaction(id) $( .$await_ext )?
            }

            // ── Goal writes ──────────────────────────────────────────

            /// Validates and stores the goal, replacing any existing one.
            ///
            /// # Errors
            ///
            /// Returns [`SavingsError::Validation`] for a blank name or a
            /// non-positive target, or an error if the store fails.
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn set_goal<T: AsRef<str>>(
                &self,
                name: T,
                target_amount: Decimal,
            ) -> Result<Goal> {
                let goal = Goal::new(name, target_amount)?;
                self.storage.set_goal(goal.clone()) $( .$await_ext )? ?;
                Ok(goal)
            }

            /// Validates and replaces the existing goal.
            ///
            /// # Errors
            ///
            /// Returns [`SavingsError::Validation`] for invalid input,
            /// [`SavingsError::GoalNotSet`] if no goal exists yet, or an
            /// error if the store fails.
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn update_goal<T: AsRef<str>>(
                &self,
                name: T,
                target_amount: Decimal,
            ) -> Result<Goal> {
                let goal = Goal::new(name, target_amount)?;
                self.storage.update_goal(goal.clone()) $( .$await_ext )? ?;
                Ok(goal)
            }
        }
    };
}

// ── Async variant ───────────────────────────────────────────────────────

#[cfg(feature = "async")]
mod async_tracker {
    //! Async high-level tracker.

    use chrono::{DateTime, Utc};

    use crate::calendar::{self, CalendarCell, YearMonth};
    use crate::config::TrackerConfig;
    use crate::error::{Result, SavingsError};
    use crate::models::{
        Decimal, Goal, NaiveDate, NewTransaction, Transaction, TransactionId, TransactionPatch,
    };
    use crate::snapshot::Summary;
    use crate::storage::Storage;

    define_tracker! {
        tracker_name: SavingsTracker,
        builder_name: SavingsTrackerBuilder,
        storage_trait: Storage,
        tracker_doc: "High-level async savings tracker with integrated storage.\n\nUse [`SavingsTracker::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`SavingsTracker`].",
        async_kw: async,
        await_kw: await,
    }
}

// ── Blocking variant ────────────────────────────────────────────────────

#[cfg(feature = "blocking")]
mod blocking_tracker {
    //! Blocking high-level tracker.

    use chrono::{DateTime, Utc};

    use crate::calendar::{self, CalendarCell, YearMonth};
    use crate::config::TrackerConfig;
    use crate::error::{Result, SavingsError};
    use crate::models::{
        Decimal, Goal, NaiveDate, NewTransaction, Transaction, TransactionId, TransactionPatch,
    };
    use crate::snapshot::Summary;
    use crate::storage::BlockingStorage;

    define_tracker! {
        tracker_name: BlockingSavingsTracker,
        builder_name: BlockingSavingsTrackerBuilder,
        storage_trait: BlockingStorage,
        tracker_doc: "High-level blocking savings tracker with integrated storage.\n\nUse [`BlockingSavingsTracker::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`BlockingSavingsTracker`].",
    }
}

#[cfg(feature = "async")]
pub use async_tracker::{SavingsTracker, SavingsTrackerBuilder};
#[cfg(feature = "blocking")]
pub use blocking_tracker::{BlockingSavingsTracker, BlockingSavingsTrackerBuilder};

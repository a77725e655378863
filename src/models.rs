//! Data models for the savings tracker.
//!
//! Stored entities ([`Transaction`], [`Goal`]), the inputs used to create
//! and edit them, newtype ID wrappers, and the derived [`DailyAggregate`].

mod daily;
mod goal;
mod ids;
mod transaction;

pub use chrono::NaiveDate;
pub use daily::DailyAggregate;
pub use goal::Goal;
pub use ids::{SubscriptionId, TransactionId};
pub use rust_decimal::Decimal;
pub use transaction::{NewTransaction, Transaction, TransactionKind, TransactionPatch};

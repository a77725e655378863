//! Transaction model and the inputs used to create and edit transactions.

use core::cmp::Ordering;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::TransactionId;
use crate::error::ValidationError;

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionKind {
    /// Money saved toward the goal.
    Income,
    /// Money taken out of the savings.
    Expense,
}

impl TransactionKind {
    /// Applies this direction to a positive magnitude.
    #[inline]
    #[must_use]
    pub fn signed(self, magnitude: Decimal) -> Decimal {
        match self {
            Self::Income => magnitude,
            Self::Expense => -magnitude,
        }
    }
}

/// A single signed monetary record.
///
/// Positive amounts are income, negative amounts are expenses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Unique identifier.
    pub id: TransactionId,
    /// Free-form description.
    pub description: String,
    /// Signed amount.
    pub amount: Decimal,
    /// When the transaction happened. `None` until the store has assigned
    /// a timestamp.
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Returns the direction implied by the sign of the amount.
    ///
    /// Zero amounts count as income.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> TransactionKind {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            TransactionKind::Expense
        } else {
            TransactionKind::Income
        }
    }

    /// Returns the unsigned amount.
    #[inline]
    #[must_use]
    pub fn magnitude(&self) -> Decimal {
        self.amount.abs()
    }

    /// Listing order: most recent first, undated last, ties by id.
    #[inline]
    #[must_use]
    pub fn newest_first(&self, other: &Self) -> Ordering {
        other
            .date
            .cmp(&self.date)
            .then_with(|| self.id.cmp(&other.id))
    }

    /// Applies a patch, replacing description, amount and kind.
    ///
    /// Fields missing from the patch keep their current value. A patch
    /// that only changes the kind flips the sign of the stored amount.
    #[inline]
    pub fn apply(&mut self, patch: TransactionPatch) {
        if let Some(description) = patch.description {
            self.description = description;
        }
        let magnitude = patch.amount.unwrap_or_else(|| self.magnitude());
        let kind = patch.kind.unwrap_or_else(|| self.kind());
        self.amount = kind.signed(magnitude);
    }
}

/// Input for recording a new transaction.
///
/// The amount is entered as a positive magnitude; [`Self::kind`] decides
/// the sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    /// Free-form description.
    pub description: String,
    /// Positive magnitude.
    pub amount: Decimal,
    /// Income or expense.
    pub kind: TransactionKind,
    /// When the transaction happened.
    pub date: Option<DateTime<Utc>>,
}

impl NewTransaction {
    /// Creates an income entry.
    #[inline]
    #[must_use]
    pub fn income<T: Into<String>>(description: T, amount: Decimal, date: DateTime<Utc>) -> Self {
        Self {
            description: description.into(),
            amount,
            kind: TransactionKind::Income,
            date: Some(date),
        }
    }

    /// Creates an expense entry.
    #[inline]
    #[must_use]
    pub fn expense<T: Into<String>>(description: T, amount: Decimal, date: DateTime<Utc>) -> Self {
        Self {
            description: description.into(),
            amount,
            kind: TransactionKind::Expense,
            date: Some(date),
        }
    }

    /// Checks the description and amount.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyDescription`] for a blank description
    /// and [`ValidationError::NonPositiveAmount`] for a zero or negative
    /// amount.
    #[inline]
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_description(&self.description)?;
        validate_magnitude(self.amount)
    }

    /// Builds the stored transaction under the given id.
    #[inline]
    #[must_use]
    pub fn into_transaction(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            description: self.description.trim().to_owned(),
            amount: self.kind.signed(self.amount),
            date: self.date,
        }
    }
}

/// Partial update for an existing transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPatch {
    /// Replacement description.
    pub description: Option<String>,
    /// Replacement positive magnitude.
    pub amount: Option<Decimal>,
    /// Replacement direction.
    pub kind: Option<TransactionKind>,
}

impl TransactionPatch {
    /// Creates an empty patch that changes nothing.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the description.
    #[inline]
    #[must_use]
    pub fn description<T: Into<String>>(mut self, description: T) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replaces the amount magnitude.
    #[inline]
    #[must_use]
    pub const fn amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Replaces the direction.
    #[inline]
    #[must_use]
    pub const fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Checks the fields that are present.
    ///
    /// # Errors
    ///
    /// Same rules as [`NewTransaction::validate`].
    #[inline]
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(description) = self.description.as_deref() {
            validate_description(description)?;
        }
        if let Some(amount) = self.amount {
            validate_magnitude(amount)?;
        }
        Ok(())
    }

    /// Trims the description, if any.
    #[inline]
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.description = self.description.map(|text| text.trim().to_owned());
        self
    }
}

/// Rejects blank descriptions.
fn validate_description(description: &str) -> Result<(), ValidationError> {
    if description.trim().is_empty() {
        return Err(ValidationError::EmptyDescription);
    }
    Ok(())
}

/// Rejects zero and negative magnitudes.
fn validate_magnitude(amount: Decimal) -> Result<(), ValidationError> {
    if amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveAmount);
    }
    Ok(())
}

//! Error types for the savings tracker.

use crate::models::TransactionId;

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, SavingsError>;

/// All errors that can occur when mutating or reading tracker data.
#[derive(Debug, thiserror::Error)]
pub enum SavingsError {
    /// Input was rejected before it reached the store.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// The storage backend could not be read or written.
    #[error("storage error: {0}")]
    Storage(Box<dyn core::error::Error + Send + Sync>),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No transaction with the given id exists in the store.
    #[error("transaction {0} not found")]
    TransactionNotFound(TransactionId),

    /// A goal update was requested before any goal was set.
    #[error("no savings goal has been set")]
    GoalNotSet,

    /// A configuration value could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Reasons a goal or transaction input is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Goal name is empty or whitespace only.
    #[error("goal name must not be empty")]
    EmptyGoalName,

    /// Goal target is zero or negative.
    #[error("goal target must be greater than zero")]
    NonPositiveTarget,

    /// Transaction description is empty or whitespace only.
    #[error("transaction description must not be empty")]
    EmptyDescription,

    /// Transaction amount is zero or negative.
    #[error("transaction amount must be greater than zero")]
    NonPositiveAmount,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_from_serde_json() {
        let serde_err = serde_json::from_str::<String>("not json").unwrap_err();
        let err = SavingsError::from(serde_err);
        assert!(matches!(err, SavingsError::Serialization(_)));
        assert!(err.to_string().contains("serialization error"));
    }

    #[test]
    fn error_from_validation() {
        let err = SavingsError::from(ValidationError::NonPositiveTarget);
        assert!(matches!(
            err,
            SavingsError::Validation(ValidationError::NonPositiveTarget)
        ));
        assert_eq!(
            err.to_string(),
            "invalid input: goal target must be greater than zero"
        );
    }

    #[test]
    fn error_storage_display() {
        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = SavingsError::Storage(Box::new(inner));
        let msg = err.to_string();
        assert!(msg.contains("storage error"));
        assert!(msg.contains("file missing"));
    }

    #[test]
    fn error_not_found_mentions_id() {
        let err = SavingsError::TransactionNotFound(TransactionId::new("tx-9".to_owned()));
        assert_eq!(err.to_string(), "transaction tx-9 not found");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SavingsError>();
    }
}

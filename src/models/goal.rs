//! Savings goal model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The single savings target a user is working toward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    /// Display name.
    pub name: String,
    /// Amount to save. Positive for any goal built through [`Goal::new`].
    pub target_amount: Decimal,
}

impl Goal {
    /// Creates a validated goal. The name is trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyGoalName`] for a blank name and
    /// [`ValidationError::NonPositiveTarget`] for a zero or negative target.
    #[inline]
    pub fn new<T: AsRef<str>>(name: T, target_amount: Decimal) -> Result<Self, ValidationError> {
        let trimmed = name.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyGoalName);
        }
        if target_amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveTarget);
        }
        Ok(Self {
            name: trimmed.to_owned(),
            target_amount,
        })
    }

    /// Returns `true` if the target can be used as a progress denominator.
    #[inline]
    #[must_use]
    pub fn has_valid_target(&self) -> bool {
        self.target_amount > Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_name() {
        let goal = Goal::new("  New laptop ", Decimal::new(100_000, 0)).unwrap();
        assert_eq!(goal.name, "New laptop");
        assert!(goal.has_valid_target());
    }

    #[test]
    fn new_rejects_blank_name() {
        assert_eq!(
            Goal::new(" ", Decimal::ONE),
            Err(ValidationError::EmptyGoalName)
        );
    }

    #[test]
    fn new_rejects_non_positive_target() {
        assert_eq!(
            Goal::new("Trip", Decimal::ZERO),
            Err(ValidationError::NonPositiveTarget)
        );
        assert_eq!(
            Goal::new("Trip", Decimal::new(-5, 0)),
            Err(ValidationError::NonPositiveTarget)
        );
    }

    #[test]
    fn deserialize_goal() {
        let json = r#"{"name": "Emergency fund", "targetAmount": "100000"}"#;
        let goal: Goal = serde_json::from_str(json).unwrap();
        assert_eq!(goal.name, "Emergency fund");
        assert_eq!(goal.target_amount, Decimal::new(100_000, 0));
    }

    #[test]
    fn stored_zero_target_is_not_valid() {
        let goal = Goal {
            name: "Broken".to_owned(),
            target_amount: Decimal::ZERO,
        };
        assert!(!goal.has_valid_target());
    }
}

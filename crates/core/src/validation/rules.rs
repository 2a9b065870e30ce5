//! Validation rule and result types.

use serde::{Deserialize, Serialize};

/// Aggregated result of validating one draft.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<FieldViolation>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    /// Build a result from collected violations, sorted by field then rule.
    pub fn from_violations(mut errors: Vec<FieldViolation>) -> Self {
        errors.sort_by(|a, b| {
            a.field
                .cmp(&b.field)
                .then_with(|| a.rule_type.cmp(&b.rule_type))
        });
        errors.dedup();
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    /// Messages reported against `field`.
    pub fn messages_for(&self, field: &str) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|v| v.field == field)
            .map(|v| v.message.as_str())
            .collect()
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.iter().any(|v| v.field == field)
    }
}

/// A single field-level rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub rule_type: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(
        field: impl Into<String>,
        rule_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            rule_type: rule_type.into(),
            message: message.into(),
        }
    }
}

/// A rule spanning several fields of a draft.
///
/// The rule only runs once every field in `requires` is present in the
/// draft; a missing field is the business of its own `required` rule.
pub struct CrossFieldRule<D> {
    /// Field the violation is reported against.
    pub field: &'static str,
    /// Fields that must be present before `check` runs.
    pub requires: &'static [&'static str],
    pub rule_type: &'static str,
    pub message: &'static str,
    /// Returns `true` when the draft satisfies the rule.
    pub check: fn(&D) -> bool,
}

impl<D> Clone for CrossFieldRule<D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D> Copy for CrossFieldRule<D> {}

impl<D> std::fmt::Debug for CrossFieldRule<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossFieldRule")
            .field("field", &self.field)
            .field("requires", &self.requires)
            .field("rule_type", &self.rule_type)
            .finish()
    }
}

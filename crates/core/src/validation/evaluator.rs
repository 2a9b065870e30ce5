//! Draft evaluator: pure logic, no I/O.

use serde::Serialize;
use serde_json::Value;
use validator::{Validate, ValidationErrors};

use super::rules::{CrossFieldRule, FieldViolation, ValidationResult};

/// Validate a draft against its derived field rules and the given cross-field
/// rules.
pub fn evaluate<D>(draft: &D, cross_rules: &[CrossFieldRule<D>]) -> ValidationResult
where
    D: Validate + Serialize,
{
    let mut errors = match draft.validate() {
        Ok(()) => Vec::new(),
        Err(errs) => field_violations(&errs),
    };

    if !cross_rules.is_empty() {
        let snapshot = serde_json::to_value(draft).unwrap_or(Value::Null);
        for rule in cross_rules {
            if !rule.requires.iter().all(|f| is_present(&snapshot, f)) {
                continue;
            }
            if !(rule.check)(draft) {
                errors.push(FieldViolation::new(rule.field, rule.rule_type, rule.message));
            }
        }
    }

    ValidationResult::from_violations(errors)
}

fn field_violations(errors: &ValidationErrors) -> Vec<FieldViolation> {
    let mut out = Vec::new();
    for (field, field_errors) in errors.field_errors() {
        for err in field_errors.iter() {
            let message = err
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("{field} is invalid"));
            out.push(FieldViolation::new(field.to_string(), err.code.to_string(), message));
        }
    }
    out
}

/// Whether a (possibly dotted) field path holds a value in the serialized
/// draft. `null` and empty strings count as absent.
pub fn is_present(snapshot: &Value, path: &str) -> bool {
    let mut current = snapshot;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(next) => current = next,
            None => return false,
        }
    }
    match current {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

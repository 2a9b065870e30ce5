//! Draft validation engine.
//!
//! Field-level rules are declared on each draft with `validator` derive
//! attributes; cross-field rules are plain functions gated on the presence of
//! the fields they read. Both feed a single [`rules::ValidationResult`].

pub mod checks;
pub mod evaluator;
pub mod rules;

pub use evaluator::evaluate;
pub use rules::{CrossFieldRule, FieldViolation, ValidationResult};

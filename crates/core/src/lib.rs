//! Campus domain core.
//!
//! Entity drafts, their validation rules, wire coercion and pagination shapes
//! for the school-management form workflow. Pure logic with no I/O so the
//! workflow engine and the HTTP client can both depend on it.

pub mod draft;
pub mod error;
pub mod inquiry;
pub mod leave;
pub mod pagination;
pub mod quota;
pub mod staff;
pub mod student;
pub mod types;
pub mod validation;
pub mod wire;

//! Contracts shared by every form-backed entity.
//!
//! A [`Record`] is the server's canonical row. A [`Draft`] is the client-only
//! staging copy a form edits; it knows how to seed itself from a record, how
//! to validate itself, and how to shape the wire payload for a create or
//! update call.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::error::CoreError;
use crate::types::DbId;
use crate::validation::{self, CrossFieldRule, ValidationResult};

/// Whether a form creates a new record or edits an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormMode {
    Create,
    Edit,
}

impl FormMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Edit => "edit",
        }
    }
}

/// Text of a yes/no confirmation shown before an irreversible submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmPrompt {
    pub title: String,
    pub message: String,
    pub confirm_label: String,
}

impl ConfirmPrompt {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            confirm_label: "Confirm".to_string(),
        }
    }

    pub fn with_confirm_label(mut self, label: impl Into<String>) -> Self {
        self.confirm_label = label.into();
        self
    }
}

/// A persisted entity as returned by the backend.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Field names the backend accepts for spreadsheet export.
    const EXPORTABLE_FIELDS: &'static [&'static str];

    fn id(&self) -> DbId;

    /// Text matched by the list view's local search box.
    fn search_text(&self) -> String;

    /// Case-insensitive substring match against [`search_text`](Self::search_text).
    fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        needle.is_empty() || self.search_text().to_lowercase().contains(&needle)
    }
}

/// A client-only staging copy of a record being created or edited.
pub trait Draft:
    Clone + PartialEq + Serialize + DeserializeOwned + Validate + Send + Sync + 'static
{
    type Entity: Record;
    type Payload: Serialize + Send + Sync + 'static;

    /// Human-readable entity label used in notices, e.g. `"Leave application"`.
    const LABEL: &'static str;

    /// Defaults for a create form.
    fn blank() -> Self;

    /// Seed an edit form from a persisted record, coercing wire formats.
    fn from_entity(entity: &Self::Entity) -> Result<Self, CoreError>;

    /// Shape the wire body. Only called on a valid draft.
    fn to_payload(&self) -> Result<Self::Payload, CoreError>;

    fn cross_field_rules() -> Vec<CrossFieldRule<Self>> {
        Vec::new()
    }

    /// Prompt to show before submitting, or `None` to submit directly.
    /// `seed` is the record being edited (absent in create mode).
    fn confirmation(&self, _seed: Option<&Self::Entity>) -> Option<ConfirmPrompt> {
        None
    }

    /// Set one field from a UI value.
    fn set_field(&mut self, path: &str, value: Value) -> Result<(), CoreError> {
        patch_field(self, path, value)
    }

    fn validate_draft(&self) -> ValidationResult {
        validation::evaluate(self, &Self::cross_field_rules())
    }
}

/// Replace one top-level field by round-tripping the draft through JSON.
///
/// Unknown fields and values of the wrong type are rejected so a typo in a
/// field binding cannot silently drop input.
pub fn patch_field<D>(draft: &mut D, path: &str, value: Value) -> Result<(), CoreError>
where
    D: Serialize + DeserializeOwned,
{
    let mut snapshot = serde_json::to_value(&*draft)
        .map_err(|e| CoreError::Internal(format!("Failed to serialize draft: {e}")))?;
    let obj = snapshot
        .as_object_mut()
        .ok_or_else(|| CoreError::Internal("Draft must serialize to an object".to_string()))?;

    match obj.get_mut(path) {
        Some(slot) => *slot = value,
        None => {
            return Err(CoreError::Validation(format!("Unknown field '{path}'")));
        }
    }

    *draft = serde_json::from_value(snapshot)
        .map_err(|e| CoreError::Validation(format!("Invalid value for field '{path}': {e}")))?;
    Ok(())
}

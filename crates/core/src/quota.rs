//! Admission quotas (seat reservations per academic year).

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::draft::{ConfirmPrompt, Draft, Record};
use crate::error::CoreError;
use crate::types::DbId;
use crate::validation::checks::not_blank;
use crate::wire::{non_empty, WireNumber};

/// Seat category a quota reserves for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaCategory {
    General,
    Management,
    StaffWard,
    Sibling,
    Rte,
}

impl QuotaCategory {
    pub fn from_wire(s: &str) -> Result<Self, CoreError> {
        match s {
            "general" => Ok(Self::General),
            "management" => Ok(Self::Management),
            "staff_ward" => Ok(Self::StaffWard),
            "sibling" => Ok(Self::Sibling),
            "rte" => Ok(Self::Rte),
            _ => Err(CoreError::Validation(format!(
                "Invalid quota category '{s}'. Must be one of: general, management, staff_ward, sibling, rte"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quota {
    pub id: DbId,
    pub name: String,
    pub academic_year_id: DbId,
    pub category: String,
    pub total_seats: WireNumber,
    /// Seats already allotted, computed by the backend.
    #[serde(default)]
    pub filled_seats: Option<WireNumber>,
    pub is_active: bool,
    #[serde(default)]
    pub description: Option<String>,
}

impl Record for Quota {
    const EXPORTABLE_FIELDS: &'static [&'static str] = &[
        "name",
        "academic_year",
        "category",
        "total_seats",
        "filled_seats",
        "is_active",
    ];

    fn id(&self) -> DbId {
        self.id
    }

    fn search_text(&self) -> String {
        format!("{} {}", self.name, self.category)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct QuotaDraft {
    #[validate(
        custom(function = not_blank),
        length(max = 100, message = "Name must be at most 100 characters")
    )]
    pub name: String,
    #[validate(required(message = "Select an academic year"))]
    pub academic_year_id: Option<DbId>,
    #[validate(required(message = "Select a category"))]
    pub category: Option<QuotaCategory>,
    #[validate(
        required(message = "Total seats is required"),
        range(min = 1, max = 1000, message = "Total seats must be between 1 and 1000")
    )]
    pub total_seats: Option<u32>,
    pub is_active: bool,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaPayload {
    pub name: String,
    pub academic_year_id: DbId,
    pub category: QuotaCategory,
    pub total_seats: u32,
    pub is_active: bool,
    pub description: Option<String>,
}

impl QuotaPayload {
    /// Payload that flips only the active flag of an existing quota.
    pub fn with_active(quota: &Quota, is_active: bool) -> Result<Self, CoreError> {
        let mut payload = QuotaDraft::from_entity(quota)?.to_payload()?;
        payload.is_active = is_active;
        Ok(payload)
    }
}

/// Prompt shown before a quota is deactivated.
pub fn deactivation_prompt(name: &str) -> ConfirmPrompt {
    ConfirmPrompt::new(
        "Deactivate quota?",
        format!("'{name}' will stop accepting new admissions until it is reactivated."),
    )
    .with_confirm_label("Deactivate")
}

impl Draft for QuotaDraft {
    type Entity = Quota;
    type Payload = QuotaPayload;

    const LABEL: &'static str = "Quota";

    fn blank() -> Self {
        Self {
            name: String::new(),
            academic_year_id: None,
            category: None,
            total_seats: None,
            is_active: true,
            description: String::new(),
        }
    }

    fn from_entity(entity: &Quota) -> Result<Self, CoreError> {
        Ok(Self {
            name: entity.name.clone(),
            academic_year_id: Some(entity.academic_year_id),
            category: Some(QuotaCategory::from_wire(&entity.category)?),
            total_seats: Some(entity.total_seats.to_unsigned("total_seats")?),
            is_active: entity.is_active,
            description: entity.description.clone().unwrap_or_default(),
        })
    }

    fn to_payload(&self) -> Result<QuotaPayload, CoreError> {
        let missing = |field: &str| CoreError::Validation(format!("Field '{field}' is required"));
        Ok(QuotaPayload {
            name: self.name.trim().to_string(),
            academic_year_id: self.academic_year_id.ok_or_else(|| missing("academic_year_id"))?,
            category: self.category.ok_or_else(|| missing("category"))?,
            total_seats: self.total_seats.ok_or_else(|| missing("total_seats"))?,
            is_active: self.is_active,
            description: non_empty(Some(&self.description)),
        })
    }

    fn confirmation(&self, seed: Option<&Quota>) -> Option<ConfirmPrompt> {
        match seed {
            Some(quota) if quota.is_active && !self.is_active => {
                Some(deactivation_prompt(&quota.name))
            }
            _ => None,
        }
    }
}

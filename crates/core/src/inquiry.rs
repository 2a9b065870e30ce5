//! Admission inquiries (front-office enquiry register).

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::draft::{Draft, Record};
use crate::error::CoreError;
use crate::types::{Date, DbId};
use crate::validation::checks::{not_blank, phone_number};
use crate::validation::CrossFieldRule;
use crate::wire::non_empty;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InquirySource {
    WalkIn,
    Phone,
    Website,
    Referral,
}

impl InquirySource {
    pub fn from_wire(s: &str) -> Result<Self, CoreError> {
        match s {
            "walk_in" => Ok(Self::WalkIn),
            "phone" => Ok(Self::Phone),
            "website" => Ok(Self::Website),
            "referral" => Ok(Self::Referral),
            _ => Err(CoreError::Validation(format!(
                "Invalid inquiry source '{s}'. Must be one of: walk_in, phone, website, referral"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inquiry {
    pub id: DbId,
    pub student_name: String,
    pub guardian_phone: String,
    pub class_applied_id: DbId,
    pub source: String,
    pub inquiry_date: Date,
    #[serde(default)]
    pub follow_up_date: Option<Date>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Pipeline stage maintained by the backend (`open`, `converted`, `closed`).
    #[serde(default)]
    pub status: Option<String>,
}

impl Record for Inquiry {
    const EXPORTABLE_FIELDS: &'static [&'static str] = &[
        "student_name",
        "guardian_phone",
        "class_applied",
        "source",
        "inquiry_date",
        "follow_up_date",
        "status",
    ];

    fn id(&self) -> DbId {
        self.id
    }

    fn search_text(&self) -> String {
        format!("{} {}", self.student_name, self.guardian_phone)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate)]
pub struct InquiryDraft {
    #[validate(custom(function = not_blank))]
    pub student_name: String,
    #[validate(custom(function = phone_number))]
    pub guardian_phone: String,
    #[validate(required(message = "Select the class applied for"))]
    pub class_applied_id: Option<DbId>,
    #[validate(required(message = "Select how the inquiry came in"))]
    pub source: Option<InquirySource>,
    #[validate(required(message = "Inquiry date is required"))]
    pub inquiry_date: Option<Date>,
    pub follow_up_date: Option<Date>,
    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InquiryPayload {
    pub student_name: String,
    pub guardian_phone: String,
    pub class_applied_id: DbId,
    pub source: InquirySource,
    pub inquiry_date: Date,
    pub follow_up_date: Option<Date>,
    pub notes: Option<String>,
}

impl Draft for InquiryDraft {
    type Entity = Inquiry;
    type Payload = InquiryPayload;

    const LABEL: &'static str = "Inquiry";

    fn blank() -> Self {
        Self::default()
    }

    fn from_entity(entity: &Inquiry) -> Result<Self, CoreError> {
        Ok(Self {
            student_name: entity.student_name.clone(),
            guardian_phone: entity.guardian_phone.clone(),
            class_applied_id: Some(entity.class_applied_id),
            source: Some(InquirySource::from_wire(&entity.source)?),
            inquiry_date: Some(entity.inquiry_date),
            follow_up_date: entity.follow_up_date,
            notes: entity.notes.clone().unwrap_or_default(),
        })
    }

    fn to_payload(&self) -> Result<InquiryPayload, CoreError> {
        let missing = |field: &str| CoreError::Validation(format!("Field '{field}' is required"));
        Ok(InquiryPayload {
            student_name: self.student_name.trim().to_string(),
            guardian_phone: self.guardian_phone.trim().to_string(),
            class_applied_id: self
                .class_applied_id
                .ok_or_else(|| missing("class_applied_id"))?,
            source: self.source.ok_or_else(|| missing("source"))?,
            inquiry_date: self.inquiry_date.ok_or_else(|| missing("inquiry_date"))?,
            follow_up_date: self.follow_up_date,
            notes: non_empty(Some(&self.notes)),
        })
    }

    fn cross_field_rules() -> Vec<CrossFieldRule<Self>> {
        vec![CrossFieldRule {
            field: "follow_up_date",
            requires: &["inquiry_date", "follow_up_date"],
            rule_type: "date_order",
            message: "Follow-up date cannot be before the inquiry date",
            check: |d| d.follow_up_date >= d.inquiry_date,
        }]
    }
}

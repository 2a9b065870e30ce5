//! Student onboarding (admission enrolment).

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::draft::{ConfirmPrompt, Draft, Record};
use crate::error::CoreError;
use crate::types::{Date, DbId};
use crate::validation::checks::{not_blank, optional_email, phone_number};
use crate::validation::CrossFieldRule;
use crate::wire::non_empty;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn from_wire(s: &str) -> Result<Self, CoreError> {
        match s.to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Self::Male),
            "female" | "f" => Ok(Self::Female),
            "other" | "o" => Ok(Self::Other),
            _ => Err(CoreError::Validation(format!(
                "Invalid gender '{s}'. Must be one of: male, female, other"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: DbId,
    /// Assigned by the backend on enrolment.
    #[serde(default)]
    pub admission_no: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Date,
    pub gender: String,
    pub class_id: DbId,
    #[serde(default)]
    pub section_id: Option<DbId>,
    pub admission_date: Date,
    pub guardian_name: String,
    pub guardian_phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub quota_id: Option<DbId>,
}

impl Record for Student {
    const EXPORTABLE_FIELDS: &'static [&'static str] = &[
        "admission_no",
        "first_name",
        "last_name",
        "date_of_birth",
        "gender",
        "class",
        "section",
        "admission_date",
        "guardian_name",
        "guardian_phone",
        "email",
    ];

    fn id(&self) -> DbId {
        self.id
    }

    fn search_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.admission_no.as_deref().unwrap_or_default(),
            self.first_name,
            self.last_name,
            self.guardian_name
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate)]
pub struct StudentDraft {
    #[validate(custom(function = not_blank))]
    pub first_name: String,
    #[validate(custom(function = not_blank))]
    pub last_name: String,
    #[validate(required(message = "Date of birth is required"))]
    pub date_of_birth: Option<Date>,
    #[validate(required(message = "Select a gender"))]
    pub gender: Option<Gender>,
    #[validate(required(message = "Select a class"))]
    pub class_id: Option<DbId>,
    pub section_id: Option<DbId>,
    #[validate(required(message = "Admission date is required"))]
    pub admission_date: Option<Date>,
    #[validate(custom(function = not_blank))]
    pub guardian_name: String,
    #[validate(custom(function = phone_number))]
    pub guardian_phone: String,
    #[validate(custom(function = optional_email))]
    pub email: String,
    pub quota_id: Option<DbId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentPayload {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Date,
    pub gender: Gender,
    pub class_id: DbId,
    pub section_id: Option<DbId>,
    pub admission_date: Date,
    pub guardian_name: String,
    pub guardian_phone: String,
    pub email: Option<String>,
    pub quota_id: Option<DbId>,
}

impl Draft for StudentDraft {
    type Entity = Student;
    type Payload = StudentPayload;

    const LABEL: &'static str = "Student";

    fn blank() -> Self {
        Self::default()
    }

    fn from_entity(entity: &Student) -> Result<Self, CoreError> {
        Ok(Self {
            first_name: entity.first_name.clone(),
            last_name: entity.last_name.clone(),
            date_of_birth: Some(entity.date_of_birth),
            gender: Some(Gender::from_wire(&entity.gender)?),
            class_id: Some(entity.class_id),
            section_id: entity.section_id,
            admission_date: Some(entity.admission_date),
            guardian_name: entity.guardian_name.clone(),
            guardian_phone: entity.guardian_phone.clone(),
            email: entity.email.clone().unwrap_or_default(),
            quota_id: entity.quota_id,
        })
    }

    fn to_payload(&self) -> Result<StudentPayload, CoreError> {
        let missing = |field: &str| CoreError::Validation(format!("Field '{field}' is required"));
        Ok(StudentPayload {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            date_of_birth: self.date_of_birth.ok_or_else(|| missing("date_of_birth"))?,
            gender: self.gender.ok_or_else(|| missing("gender"))?,
            class_id: self.class_id.ok_or_else(|| missing("class_id"))?,
            section_id: self.section_id,
            admission_date: self.admission_date.ok_or_else(|| missing("admission_date"))?,
            guardian_name: self.guardian_name.trim().to_string(),
            guardian_phone: self.guardian_phone.trim().to_string(),
            email: non_empty(Some(&self.email)),
            quota_id: self.quota_id,
        })
    }

    fn cross_field_rules() -> Vec<CrossFieldRule<Self>> {
        vec![CrossFieldRule {
            field: "date_of_birth",
            requires: &["date_of_birth", "admission_date"],
            rule_type: "date_order",
            message: "Date of birth must be before the admission date",
            check: |d| d.date_of_birth < d.admission_date,
        }]
    }

    fn confirmation(&self, seed: Option<&Student>) -> Option<ConfirmPrompt> {
        if seed.is_some() {
            return None;
        }
        Some(
            ConfirmPrompt::new(
                "Onboard student?",
                format!(
                    "{} {} will be enrolled and an admission number will be issued.",
                    self.first_name.trim(),
                    self.last_name.trim()
                ),
            )
            .with_confirm_label("Onboard"),
        )
    }
}

//! Staff onboarding.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::draft::{patch_field, ConfirmPrompt, Draft, Record};
use crate::error::CoreError;
use crate::types::{Date, DbId};
use crate::validation::checks::{not_blank, phone_number};
use crate::validation::CrossFieldRule;
use crate::wire::WireNumber;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    Permanent,
    Contract,
    PartTime,
}

impl EmploymentType {
    pub fn from_wire(s: &str) -> Result<Self, CoreError> {
        match s {
            "permanent" => Ok(Self::Permanent),
            "contract" => Ok(Self::Contract),
            "part_time" => Ok(Self::PartTime),
            _ => Err(CoreError::Validation(format!(
                "Invalid employment type '{s}'. Must be one of: permanent, contract, part_time"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staff {
    pub id: DbId,
    #[serde(default)]
    pub employee_code: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub designation: String,
    pub department_id: DbId,
    pub employment_type: String,
    pub joining_date: Date,
    #[serde(default)]
    pub contract_end_date: Option<Date>,
    /// Decimal column, usually sent as a string such as `"45000.00"`.
    pub basic_salary: WireNumber,
}

impl Record for Staff {
    const EXPORTABLE_FIELDS: &'static [&'static str] = &[
        "employee_code",
        "first_name",
        "last_name",
        "email",
        "phone",
        "designation",
        "department",
        "employment_type",
        "joining_date",
        "basic_salary",
    ];

    fn id(&self) -> DbId {
        self.id
    }

    fn search_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.employee_code.as_deref().unwrap_or_default(),
            self.first_name,
            self.last_name,
            self.designation
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate)]
pub struct StaffDraft {
    #[validate(custom(function = not_blank))]
    pub first_name: String,
    #[validate(custom(function = not_blank))]
    pub last_name: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(custom(function = phone_number))]
    pub phone: String,
    #[validate(custom(function = not_blank))]
    pub designation: String,
    #[validate(required(message = "Select a department"))]
    pub department_id: Option<DbId>,
    #[validate(required(message = "Select an employment type"))]
    pub employment_type: Option<EmploymentType>,
    #[validate(required(message = "Joining date is required"))]
    pub joining_date: Option<Date>,
    pub contract_end_date: Option<Date>,
    #[validate(
        required(message = "Basic salary is required"),
        range(min = 0.0, message = "Basic salary cannot be negative")
    )]
    pub basic_salary: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffPayload {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub designation: String,
    pub department_id: DbId,
    pub employment_type: EmploymentType,
    pub joining_date: Date,
    pub contract_end_date: Option<Date>,
    pub basic_salary: f64,
}

impl Draft for StaffDraft {
    type Entity = Staff;
    type Payload = StaffPayload;

    const LABEL: &'static str = "Staff member";

    fn blank() -> Self {
        Self::default()
    }

    fn from_entity(entity: &Staff) -> Result<Self, CoreError> {
        Ok(Self {
            first_name: entity.first_name.clone(),
            last_name: entity.last_name.clone(),
            email: entity.email.clone(),
            phone: entity.phone.clone(),
            designation: entity.designation.clone(),
            department_id: Some(entity.department_id),
            employment_type: Some(EmploymentType::from_wire(&entity.employment_type)?),
            joining_date: Some(entity.joining_date),
            contract_end_date: entity.contract_end_date,
            basic_salary: Some(entity.basic_salary.to_f64("basic_salary")?),
        })
    }

    fn to_payload(&self) -> Result<StaffPayload, CoreError> {
        let missing = |field: &str| CoreError::Validation(format!("Field '{field}' is required"));
        let employment_type = self
            .employment_type
            .ok_or_else(|| missing("employment_type"))?;
        Ok(StaffPayload {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            designation: self.designation.trim().to_string(),
            department_id: self.department_id.ok_or_else(|| missing("department_id"))?,
            employment_type,
            joining_date: self.joining_date.ok_or_else(|| missing("joining_date"))?,
            contract_end_date: self.contract_end_date,
            basic_salary: self.basic_salary.ok_or_else(|| missing("basic_salary"))?,
        })
    }

    fn cross_field_rules() -> Vec<CrossFieldRule<Self>> {
        vec![
            CrossFieldRule {
                field: "contract_end_date",
                requires: &["employment_type"],
                rule_type: "required",
                message: "Contract staff need a contract end date",
                check: |d| {
                    d.employment_type != Some(EmploymentType::Contract)
                        || d.contract_end_date.is_some()
                },
            },
            CrossFieldRule {
                field: "contract_end_date",
                requires: &["employment_type", "joining_date", "contract_end_date"],
                rule_type: "date_order",
                message: "Contract end date must be after the joining date",
                check: |d| {
                    d.employment_type != Some(EmploymentType::Contract)
                        || d.contract_end_date > d.joining_date
                },
            },
        ]
    }

    /// Leaving contract employment clears the contract end date so a hidden
    /// value can neither block submission nor reach the backend.
    fn set_field(&mut self, path: &str, value: Value) -> Result<(), CoreError> {
        let was_contract = self.employment_type == Some(EmploymentType::Contract);
        patch_field(self, path, value)?;
        if path == "employment_type"
            && was_contract
            && self.employment_type != Some(EmploymentType::Contract)
        {
            self.contract_end_date = None;
        }
        Ok(())
    }

    fn confirmation(&self, seed: Option<&Staff>) -> Option<ConfirmPrompt> {
        if seed.is_some() {
            return None;
        }
        Some(
            ConfirmPrompt::new(
                "Onboard staff member?",
                format!(
                    "{} {} will be added to payroll from {}.",
                    self.first_name.trim(),
                    self.last_name.trim(),
                    self.joining_date
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "the joining date".to_string())
                ),
            )
            .with_confirm_label("Onboard"),
        )
    }
}

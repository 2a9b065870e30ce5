//! Staff leave applications.
//!
//! A leave is either a full day (or range of days), a half day, or a few
//! hours. The mode is a tagged variant so a draft can never be half-day and
//! hourly at the same time; toggling one mode on replaces the other.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::draft::{patch_field, Draft, Record};
use crate::error::CoreError;
use crate::types::{Date, DbId};
use crate::validation::CrossFieldRule;
use crate::wire::{non_empty, WireNumber};

/// Shortest hourly leave, in hours.
pub const MIN_HOURLY_LEAVE: u8 = 1;

/// Longest hourly leave, in hours.
pub const MAX_HOURLY_LEAVE: u8 = 4;

// ---------------------------------------------------------------------------
// Leave mode
// ---------------------------------------------------------------------------

/// Which half of the day a half-day leave covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HalfDaySession {
    FirstHalf,
    SecondHalf,
}

impl HalfDaySession {
    pub fn from_wire(s: &str) -> Result<Self, CoreError> {
        match s {
            "first_half" => Ok(Self::FirstHalf),
            "second_half" => Ok(Self::SecondHalf),
            _ => Err(CoreError::Validation(format!(
                "Invalid half-day session '{s}'. Must be one of: first_half, second_half"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstHalf => "first_half",
            Self::SecondHalf => "second_half",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "leave_mode", rename_all = "snake_case")]
pub enum LeaveMode {
    #[default]
    FullDay,
    HalfDay {
        half_day_type: Option<HalfDaySession>,
    },
    Hourly {
        /// Kept wide so out-of-range input reaches the range rule intact.
        hours: Option<i64>,
    },
}

impl LeaveMode {
    pub fn is_half_day(&self) -> bool {
        matches!(self, Self::HalfDay { .. })
    }

    pub fn is_hourly(&self) -> bool {
        matches!(self, Self::Hourly { .. })
    }
}

// ---------------------------------------------------------------------------
// Persisted record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveApplication {
    pub id: DbId,
    pub staff_id: DbId,
    pub leave_type_id: DbId,
    pub from_date: Date,
    pub to_date: Date,
    #[serde(default)]
    pub is_half_day: bool,
    #[serde(default)]
    pub half_day_type: Option<String>,
    #[serde(default)]
    pub is_hourly_leave: bool,
    #[serde(default)]
    pub hours: Option<WireNumber>,
    #[serde(default)]
    pub reason: Option<String>,
    /// Server-derived approval state (`pending`, `approved`, `rejected`).
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub staff_name: Option<String>,
}

impl Record for LeaveApplication {
    const EXPORTABLE_FIELDS: &'static [&'static str] = &[
        "staff_name",
        "leave_type",
        "from_date",
        "to_date",
        "is_half_day",
        "is_hourly_leave",
        "hours",
        "status",
        "reason",
    ];

    fn id(&self) -> DbId {
        self.id
    }

    fn search_text(&self) -> String {
        [
            self.staff_name.as_deref().unwrap_or_default(),
            self.reason.as_deref().unwrap_or_default(),
            self.status.as_deref().unwrap_or_default(),
        ]
        .join(" ")
    }
}

// ---------------------------------------------------------------------------
// Draft and payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate)]
pub struct LeaveDraft {
    #[validate(required(message = "Select a staff member"))]
    pub staff_id: Option<DbId>,
    #[validate(required(message = "Select a leave type"))]
    pub leave_type_id: Option<DbId>,
    #[validate(required(message = "Start date is required"))]
    pub from_date: Option<Date>,
    #[validate(required(message = "End date is required"))]
    pub to_date: Option<Date>,
    #[serde(flatten)]
    pub mode: LeaveMode,
    #[validate(length(max = 500, message = "Reason must be at most 500 characters"))]
    pub reason: String,
}

/// Wire body for `POST /leave-applications` and `PUT /leave-applications/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeavePayload {
    pub staff_id: DbId,
    pub leave_type_id: DbId,
    pub from_date: Date,
    pub to_date: Date,
    pub is_half_day: bool,
    pub half_day_type: Option<HalfDaySession>,
    pub is_hourly_leave: bool,
    pub hours: Option<u8>,
    pub reason: Option<String>,
}

fn required<T: Copy>(value: Option<T>, field: &str) -> Result<T, CoreError> {
    value.ok_or_else(|| CoreError::Validation(format!("Field '{field}' is required")))
}

fn flag(value: &Value, field: &str) -> Result<bool, CoreError> {
    value
        .as_bool()
        .ok_or_else(|| CoreError::Validation(format!("Field '{field}' must be true or false")))
}

impl LeaveDraft {
    fn set_half_day(&mut self, on: bool) {
        match (on, &self.mode) {
            (true, LeaveMode::HalfDay { .. }) => {}
            (true, _) => self.mode = LeaveMode::HalfDay { half_day_type: None },
            (false, LeaveMode::HalfDay { .. }) => self.mode = LeaveMode::FullDay,
            (false, _) => {}
        }
    }

    fn set_hourly(&mut self, on: bool) {
        match (on, &self.mode) {
            (true, LeaveMode::Hourly { .. }) => {}
            (true, _) => self.mode = LeaveMode::Hourly { hours: None },
            (false, LeaveMode::Hourly { .. }) => self.mode = LeaveMode::FullDay,
            (false, _) => {}
        }
    }
}

impl Draft for LeaveDraft {
    type Entity = LeaveApplication;
    type Payload = LeavePayload;

    const LABEL: &'static str = "Leave application";

    fn blank() -> Self {
        Self::default()
    }

    fn from_entity(entity: &LeaveApplication) -> Result<Self, CoreError> {
        let mode = match (entity.is_half_day, entity.is_hourly_leave) {
            (true, true) => {
                return Err(CoreError::Conflict(format!(
                    "Leave application {} is marked both half-day and hourly",
                    entity.id
                )));
            }
            (_, true) => LeaveMode::Hourly {
                hours: entity
                    .hours
                    .as_ref()
                    .map(|h| h.to_i64("hours"))
                    .transpose()?,
            },
            (true, _) => LeaveMode::HalfDay {
                half_day_type: non_empty(entity.half_day_type.as_deref())
                    .map(|s| HalfDaySession::from_wire(&s))
                    .transpose()?,
            },
            _ => LeaveMode::FullDay,
        };

        Ok(Self {
            staff_id: Some(entity.staff_id),
            leave_type_id: Some(entity.leave_type_id),
            from_date: Some(entity.from_date),
            to_date: Some(entity.to_date),
            mode,
            reason: entity.reason.clone().unwrap_or_default(),
        })
    }

    fn to_payload(&self) -> Result<LeavePayload, CoreError> {
        let (half_day_type, hours) = match &self.mode {
            LeaveMode::FullDay => (None, None),
            LeaveMode::HalfDay { half_day_type } => (*half_day_type, None),
            LeaveMode::Hourly { hours } => (
                None,
                hours
                    .map(|h| {
                        u8::try_from(h).map_err(|_| {
                            CoreError::Validation(format!("Field 'hours' is out of range: {h}"))
                        })
                    })
                    .transpose()?,
            ),
        };
        Ok(LeavePayload {
            staff_id: required(self.staff_id, "staff_id")?,
            leave_type_id: required(self.leave_type_id, "leave_type_id")?,
            from_date: required(self.from_date, "from_date")?,
            to_date: required(self.to_date, "to_date")?,
            is_half_day: self.mode.is_half_day(),
            half_day_type,
            is_hourly_leave: self.mode.is_hourly(),
            hours,
            reason: non_empty(Some(&self.reason)),
        })
    }

    fn cross_field_rules() -> Vec<CrossFieldRule<Self>> {
        vec![
            CrossFieldRule {
                field: "to_date",
                requires: &["from_date", "to_date"],
                rule_type: "date_order",
                message: "End date must be after start date",
                check: |d| d.to_date >= d.from_date,
            },
            CrossFieldRule {
                field: "to_date",
                requires: &["from_date", "to_date"],
                rule_type: "single_day",
                message: "Half-day and hourly leave must start and end on the same day",
                check: |d| d.mode == LeaveMode::FullDay || d.from_date == d.to_date,
            },
            CrossFieldRule {
                field: "half_day_type",
                requires: &[],
                rule_type: "required",
                message: "Select first half or second half",
                check: |d| !matches!(d.mode, LeaveMode::HalfDay { half_day_type: None }),
            },
            CrossFieldRule {
                field: "hours",
                requires: &[],
                rule_type: "required",
                message: "Enter the number of hours",
                check: |d| !matches!(d.mode, LeaveMode::Hourly { hours: None }),
            },
            CrossFieldRule {
                field: "hours",
                requires: &["hours"],
                rule_type: "range",
                message: "Hourly leave must be between 1 and 4 hours",
                check: |d| match d.mode {
                    LeaveMode::Hourly { hours: Some(h) } => {
                        (i64::from(MIN_HOURLY_LEAVE)..=i64::from(MAX_HOURLY_LEAVE)).contains(&h)
                    }
                    _ => true,
                },
            },
        ]
    }

    fn set_field(&mut self, path: &str, value: Value) -> Result<(), CoreError> {
        match path {
            "half_day" | "is_half_day" => self.set_half_day(flag(&value, path)?),
            "hourly_leave" | "is_hourly_leave" => self.set_hourly(flag(&value, path)?),
            "leave_mode" => {
                self.mode = match value.as_str() {
                    Some("full_day") => LeaveMode::FullDay,
                    Some("half_day") => LeaveMode::HalfDay { half_day_type: None },
                    Some("hourly") => LeaveMode::Hourly { hours: None },
                    _ => {
                        return Err(CoreError::Validation(format!(
                            "Invalid leave mode {value}. Must be one of: full_day, half_day, hourly"
                        )));
                    }
                };
            }
            "half_day_type" => {
                let LeaveMode::HalfDay { half_day_type } = &mut self.mode else {
                    return Err(CoreError::Validation(
                        "Half-day session can only be chosen for half-day leave".to_string(),
                    ));
                };
                *half_day_type = match value.as_str() {
                    _ if value.is_null() => None,
                    Some(s) if s.is_empty() => None,
                    Some(s) => Some(HalfDaySession::from_wire(s)?),
                    None => {
                        return Err(CoreError::Validation(
                            "Field 'half_day_type' must be a string".to_string(),
                        ));
                    }
                };
            }
            "hours" => {
                let LeaveMode::Hourly { hours } = &mut self.mode else {
                    return Err(CoreError::Validation(
                        "Hours can only be set for hourly leave".to_string(),
                    ));
                };
                *hours = match value {
                    Value::Null => None,
                    Value::String(s) if s.trim().is_empty() => None,
                    other => {
                        let wire: WireNumber = serde_json::from_value(other).map_err(|_| {
                            CoreError::Validation("Field 'hours' must be a number".to_string())
                        })?;
                        Some(wire.to_i64("hours")?)
                    }
                };
            }
            _ => patch_field(self, path, value)?,
        }
        Ok(())
    }
}

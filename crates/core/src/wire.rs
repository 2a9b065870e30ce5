//! Coercion helpers for backend wire formats.
//!
//! The school backend serializes several numeric columns (decimal salaries,
//! seat counts, leave hours) as JSON strings. Edit-mode drafts need them as
//! typed values, so every persisted record keeps the raw [`WireNumber`] and
//! coerces on demand.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A number that may arrive either as a JSON number or as a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

impl WireNumber {
    /// Coerce to an integer. Strings such as `"12"` and `"12.00"` are accepted;
    /// fractional values are rejected.
    pub fn to_i64(&self, field: &str) -> Result<i64, CoreError> {
        match self {
            Self::Int(n) => Ok(*n),
            Self::Float(f) => float_to_i64(*f, field),
            Self::Text(s) => {
                let trimmed = s.trim();
                if let Ok(n) = trimmed.parse::<i64>() {
                    return Ok(n);
                }
                let f = trimmed.parse::<f64>().map_err(|_| invalid(field, s))?;
                float_to_i64(f, field)
            }
        }
    }

    /// Coerce to a float.
    pub fn to_f64(&self, field: &str) -> Result<f64, CoreError> {
        match self {
            Self::Int(n) => Ok(*n as f64),
            Self::Float(f) => Ok(*f),
            Self::Text(s) => s.trim().parse::<f64>().map_err(|_| invalid(field, s)),
        }
    }

    /// Coerce to an unsigned integer that fits in `T`.
    pub fn to_unsigned<T: TryFrom<i64>>(&self, field: &str) -> Result<T, CoreError> {
        let n = self.to_i64(field)?;
        T::try_from(n).map_err(|_| {
            CoreError::Validation(format!("Field '{field}' is out of range: {n}"))
        })
    }
}

impl From<i64> for WireNumber {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for WireNumber {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

fn float_to_i64(f: f64, field: &str) -> Result<i64, CoreError> {
    if f.fract() == 0.0 && f.is_finite() {
        Ok(f as i64)
    } else {
        Err(CoreError::Validation(format!(
            "Field '{field}' must be a whole number, got {f}"
        )))
    }
}

fn invalid(field: &str, raw: &str) -> CoreError {
    CoreError::Validation(format!("Field '{field}' is not a number: '{raw}'"))
}

/// Empty strings from the wire mean "no value".
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

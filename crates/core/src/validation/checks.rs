//! Reusable custom checks for `#[validate(custom(function = ...))]`.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use validator::{ValidateEmail, ValidationError};

/// Ten-digit phone numbers with an optional `+CC` prefix; spaces and dashes
/// between groups are tolerated.
static PHONE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(\+\d{1,3}[ -]?)?\d{3}[ -]?\d{3}[ -]?\d{4}$").ok());

fn error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Rejects empty and whitespace-only strings.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(error("required", "This field is required"))
    } else {
        Ok(())
    }
}

/// Requires a well-formed phone number.
pub fn phone_number(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(error("required", "Phone number is required"));
    }
    match PHONE_RE.as_ref() {
        Some(re) if re.is_match(value) => Ok(()),
        _ => Err(error("pattern", "Enter a valid 10-digit phone number")),
    }
}

/// Accepts an empty string or a valid email address.
pub fn optional_email(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() || value.validate_email() {
        Ok(())
    } else {
        Err(error("email", "Enter a valid email address"))
    }
}

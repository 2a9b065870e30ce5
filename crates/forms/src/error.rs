use campus_core::error::CoreError;
use campus_core::validation::ValidationResult;
use serde_json::Value;

/// Shown when a failure carries no message the user can act on.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// Shown when the backend could not be reached at all.
pub const NETWORK_ERROR_MESSAGE: &str =
    "Unable to reach the server. Check your connection and try again.";

/// Failure of a single backend call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, TLS, timeout, refused).
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// The backend answered with a non-2xx status.
    #[error("Backend rejected the request ({status}): {}", .message.as_deref().unwrap_or("unrecognized error body"))]
    Rejected {
        status: u16,
        /// Message extracted from the error envelope, when recognized.
        message: Option<String>,
    },

    /// A 2xx response whose body did not match the expected shape.
    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Build a [`ApiError::Rejected`] from a status and raw body.
    pub fn rejected(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| extract_server_message(&v));
        Self::Rejected { status, message }
    }
}

/// Pull a user-facing message out of a backend error envelope.
///
/// Recognized shapes, in order of preference:
/// - `{ "error": "..." }`
/// - `{ "errors": { "messages": ["...", ...] } }`
/// - `{ "message": "..." }`
pub fn extract_server_message(body: &Value) -> Option<String> {
    if let Some(msg) = body.get("error").and_then(Value::as_str) {
        if !msg.trim().is_empty() {
            return Some(msg.to_string());
        }
    }

    if let Some(messages) = body
        .get("errors")
        .and_then(|e| e.get("messages"))
        .and_then(Value::as_array)
    {
        let joined: Vec<&str> = messages
            .iter()
            .filter_map(Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .collect();
        if !joined.is_empty() {
            return Some(joined.join("\n"));
        }
    }

    body.get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}

/// Error surfaced by the form workflow.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormError {
    /// Local validation failed; nothing was sent.
    #[error("Validation failed with {} error(s)", .0.errors.len())]
    Invalid(ValidationResult),

    /// A submission from this form is already in flight.
    #[error("A submission is already in progress")]
    Busy,

    /// The operation does not apply to the form's current phase.
    #[error("Cannot {action} while the form is {phase}")]
    InvalidPhase {
        action: &'static str,
        phase: &'static str,
    },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Core(#[from] CoreError),

    /// The form or view was closed before the operation finished; the result
    /// was discarded.
    #[error("Closed before the operation completed")]
    Closed,
}

impl FormError {
    /// Text suitable for a toast or inline banner.
    pub fn user_message(&self) -> String {
        match self {
            Self::Invalid(_) => "Please correct the highlighted fields.".to_string(),
            Self::Busy => "Your previous submission is still being processed.".to_string(),
            Self::Api(ApiError::Transport(_)) => NETWORK_ERROR_MESSAGE.to_string(),
            Self::Api(ApiError::Rejected {
                message: Some(msg), ..
            }) => msg.clone(),
            Self::Core(CoreError::Validation(msg)) => msg.clone(),
            Self::Core(CoreError::NotFound { .. }) => {
                "This record no longer exists. Refresh the list and try again.".to_string()
            }
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

use campus_forms::ApiError;

/// Failures that happen outside a single backend call: configuration,
/// client construction and local file I/O.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid client configuration: {0}")]
    Config(String),

    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),

    #[error("File I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Map a `reqwest` failure that produced no response.
pub(crate) fn transport(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Transport(format!("request timed out: {err}"))
    } else {
        ApiError::Transport(err.to_string())
    }
}

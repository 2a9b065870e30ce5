use campus_core::pagination::{ListQuery, DEFAULT_PER_PAGE, MAX_PER_PAGE};
use validator::Validate;

use crate::error::ClientError;

/// Default backend base URL for local development.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Default per-request timeout applied by the HTTP client.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Backend client configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct ClientConfig {
    /// Base URL every resource path is joined onto.
    #[validate(url(message = "CAMPUS_API_URL must be an absolute http(s) URL"))]
    pub base_url: String,
    /// Bearer token sent with every request, if any.
    pub token: Option<String>,
    #[validate(range(
        min = 1,
        max = 300,
        message = "CAMPUS_REQUEST_TIMEOUT_SECS must be between 1 and 300"
    ))]
    pub request_timeout_secs: u64,
    #[validate(range(
        min = 1,
        max = MAX_PER_PAGE,
        message = "CAMPUS_PAGE_SIZE must be between 1 and 100"
    ))]
    pub page_size: u32,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            page_size: DEFAULT_PER_PAGE,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Load configuration from the process environment.
    ///
    /// | Env Var                       | Default                     |
    /// |-------------------------------|-----------------------------|
    /// | `CAMPUS_API_URL`              | `http://localhost:8000/api` |
    /// | `CAMPUS_API_TOKEN`            | unset                       |
    /// | `CAMPUS_REQUEST_TIMEOUT_SECS` | `30`                        |
    /// | `CAMPUS_PAGE_SIZE`            | `15`                        |
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), loading a `.env` file first if one
    /// exists.
    pub fn from_dotenv() -> Result<Self, ClientError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let base_url = get("CAMPUS_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let token = get("CAMPUS_API_TOKEN");

        let request_timeout_secs = match get("CAMPUS_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw.parse().map_err(|_| {
                ClientError::Config(format!(
                    "CAMPUS_REQUEST_TIMEOUT_SECS must be a whole number of seconds, got '{raw}'"
                ))
            })?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        let page_size = match get("CAMPUS_PAGE_SIZE") {
            Some(raw) => raw.parse().map_err(|_| {
                ClientError::Config(format!("CAMPUS_PAGE_SIZE must be a positive integer, got '{raw}'"))
            })?,
            None => DEFAULT_PER_PAGE,
        };

        Self {
            base_url,
            token,
            request_timeout_secs,
            page_size,
        }
        .validated()
    }

    /// Run the field checks, folding all failures into one error.
    pub fn validated(self) -> Result<Self, ClientError> {
        if let Err(errors) = self.validate() {
            let mut messages: Vec<String> = errors
                .field_errors()
                .into_values()
                .flat_map(|errs| errs.iter())
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            messages.sort();
            return Err(ClientError::Config(messages.join("; ")));
        }
        Ok(self)
    }

    /// A first-page list query with the configured page size.
    pub fn list_query(&self) -> ListQuery {
        ListQuery::new(self.page_size)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

//! HTTP client for the school backend REST API.
//!
//! Wraps a [`reqwest::Client`] with the base URL, bearer token and
//! per-request `x-request-id` header every call needs. Non-2xx responses are
//! turned into [`ApiError::Rejected`] with the message pulled from the
//! backend's error envelope.

use std::time::{Duration, Instant};

use campus_forms::ApiError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::envelope::Envelope;
use crate::error::{transport, ClientError};

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared handle to the backend. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Build a client from validated configuration.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let config = config.clone().validated()?;
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .default_headers(headers)
            .build()?;
        Ok(Self::with_client(http, &config))
    }

    /// Reuse an existing [`reqwest::Client`] (shared connection pool).
    pub fn with_client(http: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a resource path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Start a request with auth and correlation headers attached.
    pub(crate) fn request(&self, method: Method, path: &str) -> (RequestBuilder, String) {
        let request_id = Uuid::new_v4().to_string();
        let mut builder = self
            .http
            .request(method, self.url(path))
            .header(REQUEST_ID_HEADER, &request_id);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        (builder, request_id)
    }

    /// Send a prepared request and require a 2xx status.
    pub(crate) async fn execute(
        &self,
        builder: RequestBuilder,
        request_id: &str,
        label: &str,
    ) -> Result<Response, ApiError> {
        let started = Instant::now();
        let response = builder.send().await.map_err(|e| {
            tracing::warn!(request_id, request = label, error = %e, "Backend unreachable");
            transport(e)
        })?;
        let status = response.status();
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if status.is_success() {
            tracing::debug!(
                request_id,
                request = label,
                status = status.as_u16(),
                elapsed_ms,
                "Backend request succeeded",
            );
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        let err = ApiError::rejected(status.as_u16(), &body);
        tracing::warn!(
            request_id,
            request = label,
            status = status.as_u16(),
            elapsed_ms,
            error = %err,
            "Backend rejected request",
        );
        Err(err)
    }

    /// `GET {path}` with query parameters, decoding a `{ data }` or bare body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, ApiError> {
        let (builder, request_id) = self.request(Method::GET, path);
        let label = format!("GET {path}");
        let response = self.execute(builder.query(query), &request_id, &label).await?;
        decode::<Envelope<T>>(response).await.map(Envelope::into_inner)
    }

    /// Send a JSON body and decode the `{ data }` or bare response.
    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let label = format!("{method} {path}");
        let (builder, request_id) = self.request(method, path);
        let response = self.execute(builder.json(body), &request_id, &label).await?;
        decode::<Envelope<T>>(response).await.map(Envelope::into_inner)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Read the whole body and deserialize it, reporting shape mismatches as
/// [`ApiError::Decode`].
pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await.map_err(transport)?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

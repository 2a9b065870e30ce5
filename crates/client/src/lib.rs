//! HTTP client for the school backend.
//!
//! Implements the workflow engine's [`Resource`](campus_forms::Resource)
//! seam over `reqwest`, loads connection settings from the environment, and
//! carries the opaque file flows (spreadsheet export/import, fee receipts).

pub mod config;
pub mod envelope;
pub mod error;
pub mod files;
pub mod http;
pub mod resource;

pub use config::ClientConfig;
pub use error::ClientError;
pub use files::Download;
pub use http::ApiClient;
pub use resource::HttpResource;

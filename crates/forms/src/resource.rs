//! Backend seam for one REST collection.

use async_trait::async_trait;
use campus_core::draft::Record;
use campus_core::pagination::{ListQuery, Page};
use campus_core::types::DbId;
use serde::Serialize;

use crate::error::ApiError;

/// A backend collection the workflow can list, fetch, create and update.
///
/// The HTTP client implements this against the school REST API; tests use an
/// in-memory fake.
#[async_trait]
pub trait Resource: Send + Sync + 'static {
    type Entity: Record;
    type Payload: Serialize + Send + Sync + 'static;

    /// Collection name used in logs, e.g. `"leave-applications"`.
    fn name(&self) -> &str;

    async fn list(&self, query: &ListQuery) -> Result<Page<Self::Entity>, ApiError>;

    async fn fetch(&self, id: DbId) -> Result<Self::Entity, ApiError>;

    async fn create(&self, payload: &Self::Payload) -> Result<Self::Entity, ApiError>;

    async fn update(&self, id: DbId, payload: &Self::Payload) -> Result<Self::Entity, ApiError>;
}

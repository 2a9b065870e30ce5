//! [`Resource`] implementation over the REST API, plus the collections the
//! school front-end works with.

use std::marker::PhantomData;

use async_trait::async_trait;
use campus_core::draft::Record;
use campus_core::inquiry::{Inquiry, InquiryPayload};
use campus_core::leave::{LeaveApplication, LeavePayload};
use campus_core::pagination::{ListQuery, Page};
use campus_core::quota::{Quota, QuotaPayload};
use campus_core::staff::{Staff, StaffPayload};
use campus_core::student::{Student, StudentPayload};
use campus_core::types::DbId;
use campus_forms::{ApiError, Resource};
use reqwest::Method;
use serde::Serialize;

use crate::files::Download;
use crate::http::ApiClient;

/// One REST collection: `GET {path}`, `GET {path}/{id}`, `POST {path}`,
/// `PUT {path}/{id}`.
pub struct HttpResource<E, P> {
    client: ApiClient,
    path: String,
    _marker: PhantomData<fn() -> (E, P)>,
}

impl<E, P> HttpResource<E, P>
where
    E: Record,
    P: Serialize + Send + Sync + 'static,
{
    pub fn new(client: ApiClient, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into().trim_matches('/').to_string(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn item_path(&self, id: DbId) -> String {
        format!("{}/{id}", self.path)
    }

    /// Spreadsheet export of the named columns.
    pub async fn export(&self, fields: &[&str]) -> Result<Download, ApiError> {
        self.client.export(&self.path, fields).await
    }

    /// Spreadsheet export of every column the backend offers.
    pub async fn export_all(&self) -> Result<Download, ApiError> {
        self.export(E::EXPORTABLE_FIELDS).await
    }

    /// Upload a spreadsheet for bulk import. The backend's summary is
    /// returned as-is.
    pub async fn import(&self, file_name: &str, bytes: Vec<u8>) -> Result<serde_json::Value, ApiError> {
        self.client.import(&self.path, file_name, bytes).await
    }
}

#[async_trait]
impl<E, P> Resource for HttpResource<E, P>
where
    E: Record,
    P: Serialize + Send + Sync + 'static,
{
    type Entity = E;
    type Payload = P;

    fn name(&self) -> &str {
        &self.path
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<E>, ApiError> {
        self.client.get_json(&self.path, &query.to_params()).await
    }

    async fn fetch(&self, id: DbId) -> Result<E, ApiError> {
        self.client.get_json(&self.item_path(id), &[]).await
    }

    async fn create(&self, payload: &P) -> Result<E, ApiError> {
        self.client.send_json(Method::POST, &self.path, payload).await
    }

    async fn update(&self, id: DbId, payload: &P) -> Result<E, ApiError> {
        self.client
            .send_json(Method::PUT, &self.item_path(id), payload)
            .await
    }
}

pub type LeaveResource = HttpResource<LeaveApplication, LeavePayload>;
pub type QuotaResource = HttpResource<Quota, QuotaPayload>;
pub type StudentResource = HttpResource<Student, StudentPayload>;
pub type StaffResource = HttpResource<Staff, StaffPayload>;
pub type InquiryResource = HttpResource<Inquiry, InquiryPayload>;

pub fn leave_applications(client: &ApiClient) -> LeaveResource {
    HttpResource::new(client.clone(), "leave-applications")
}

pub fn quotas(client: &ApiClient) -> QuotaResource {
    HttpResource::new(client.clone(), "admission/quotas")
}

pub fn students(client: &ApiClient) -> StudentResource {
    HttpResource::new(client.clone(), "students")
}

pub fn staff(client: &ApiClient) -> StaffResource {
    HttpResource::new(client.clone(), "staff")
}

pub fn inquiries(client: &ApiClient) -> InquiryResource {
    HttpResource::new(client.clone(), "admission/inquiries")
}

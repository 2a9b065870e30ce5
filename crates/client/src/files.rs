//! Opaque file flows: spreadsheet export/import and fee receipts.
//!
//! File contents are never parsed client-side; exports and receipts come
//! back as a [`Download`] that can be written to disk, imports hand the raw
//! bytes to the backend and return its JSON summary.

use std::path::{Path, PathBuf};

use campus_core::types::DbId;
use campus_forms::ApiError;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, Response};

use crate::error::{transport, ClientError};
use crate::http::{decode, ApiClient};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A file produced by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Download {
    /// Read a successful response, taking the file name from
    /// `Content-Disposition` when present.
    async fn from_response(response: Response, fallback_name: String) -> Result<Self, ApiError> {
        let headers = response.headers();
        let file_name = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(file_name_from_disposition)
            .unwrap_or(fallback_name);
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(transport)?.to_vec();
        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }

    /// Write the file into `dir` under a sanitized name and return its path.
    pub async fn save(&self, dir: &Path) -> Result<PathBuf, ClientError> {
        let path = dir.join(sanitize_file_name(&self.file_name));
        tokio::fs::write(&path, &self.bytes).await?;
        tracing::info!(path = %path.display(), bytes = self.bytes.len(), "Saved download");
        Ok(path)
    }
}

/// Extract `filename` from a `Content-Disposition` header value.
pub fn file_name_from_disposition(header: &str) -> Option<String> {
    header.split(';').map(str::trim).find_map(|part| {
        let (key, value) = part.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("filename") {
            return None;
        }
        let value = value.trim().trim_matches('"').trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Reduce a server-supplied name to a safe single path component.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "download".to_string()
    } else {
        cleaned
    }
}

fn last_segment(path: &str) -> &str {
    path.trim_matches('/').rsplit('/').next().unwrap_or("export")
}

impl ApiClient {
    /// `POST {path}/export` with the selected column names.
    pub async fn export(&self, path: &str, fields: &[&str]) -> Result<Download, ApiError> {
        let collection = path.trim_end_matches('/');
        let path = format!("{collection}/export");
        let (builder, request_id) = self.request(Method::POST, &path);
        let body = serde_json::json!({ "fields": fields });
        let response = self
            .execute(builder.json(&body), &request_id, &format!("POST {path}"))
            .await?;
        let fallback = format!("{}-export.xlsx", last_segment(collection));
        Download::from_response(response, fallback).await
    }

    /// Multipart `POST {path}/import` with the spreadsheet as field `file`.
    pub async fn import(
        &self,
        path: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<serde_json::Value, ApiError> {
        let path = format!("{}/import", path.trim_end_matches('/'));
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(XLSX_MIME)
            .map_err(transport)?;
        let (builder, request_id) = self.request(Method::POST, &path);
        let response = self
            .execute(
                builder.multipart(Form::new().part("file", part)),
                &request_id,
                &format!("POST {path}"),
            )
            .await?;
        decode(response).await
    }

    /// `GET fees/payments/{id}/receipt` as a PDF.
    pub async fn fee_receipt(&self, payment_id: DbId) -> Result<Download, ApiError> {
        let path = format!("fees/payments/{payment_id}/receipt");
        let (builder, request_id) = self.request(Method::GET, &path);
        let response = self
            .execute(builder, &request_id, &format!("GET {path}"))
            .await?;
        Download::from_response(response, format!("receipt-{payment_id}.pdf")).await
    }
}

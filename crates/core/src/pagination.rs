//! Paginated list shapes shared by the list view and the HTTP client.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default number of rows requested per page.
pub const DEFAULT_PER_PAGE: u32 = 15;

/// Largest page size the backend honours.
pub const MAX_PER_PAGE: u32 = 100;

/// Pagination metadata attached to every list response.
///
/// Only `current_page`, `last_page` and `total` are relied upon; anything
/// else the backend sends is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub last_page: u32,
    pub total: u64,
}

/// A `{ data, meta }` list response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

/// Parameters for a list fetch.
///
/// `scope` carries server-side filters such as the academic session or class;
/// `search` is forwarded to the backend for collection-wide search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub per_page: u32,
    pub search: Option<String>,
    pub scope: BTreeMap<String, String>,
}

impl ListQuery {
    pub fn new(per_page: u32) -> Self {
        Self {
            page: 1,
            per_page: per_page.clamp(1, MAX_PER_PAGE),
            search: None,
            scope: BTreeMap::new(),
        }
    }

    /// Add or replace a server-side scope filter.
    pub fn with_scope(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.scope.insert(key.into(), value.into());
        self
    }

    /// Query-string pairs in a stable order.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("page".to_string(), self.page.to_string()),
            ("per_page".to_string(), self.per_page.to_string()),
        ];
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            params.push(("search".to_string(), search.to_string()));
        }
        params.extend(self.scope.iter().map(|(k, v)| (k.clone(), v.clone())));
        params
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::new(DEFAULT_PER_PAGE)
    }
}

/// Position within a paginated collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub page: u32,
    pub last_page: u32,
    pub total: u64,
}

impl PageCursor {
    /// Build a cursor from response metadata. An empty collection reports
    /// `last_page = 0` on some endpoints; it is treated as a single page.
    pub fn from_meta(meta: &PageMeta) -> Self {
        let last_page = meta.last_page.max(1);
        Self {
            page: meta.current_page.clamp(1, last_page),
            last_page,
            total: meta.total,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.last_page
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Clamp a requested page into `1..=last_page`.
    pub fn clamp(&self, page: u32) -> u32 {
        page.clamp(1, self.last_page)
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self {
            page: 1,
            last_page: 1,
            total: 0,
        }
    }
}

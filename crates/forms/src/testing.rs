//! In-memory resource used by this crate's unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use campus_core::draft::{ConfirmPrompt, Draft, Record};
use campus_core::error::CoreError;
use campus_core::pagination::{ListQuery, Page, PageMeta};
use campus_core::types::DbId;
use campus_core::validation::checks::not_blank;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use validator::Validate;

use crate::error::ApiError;
use crate::resource::Resource;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub id: DbId,
    pub name: String,
    pub active: bool,
    /// Bumped by the "server" on every write.
    pub revision: u32,
}

impl Widget {
    pub fn new(id: DbId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            active: true,
            revision: 1,
        }
    }
}

impl Record for Widget {
    const EXPORTABLE_FIELDS: &'static [&'static str] = &["name", "active"];

    fn id(&self) -> DbId {
        self.id
    }

    fn search_text(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct WidgetDraft {
    #[validate(custom(function = not_blank))]
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetPayload {
    pub name: String,
    pub active: bool,
}

impl Draft for WidgetDraft {
    type Entity = Widget;
    type Payload = WidgetPayload;

    const LABEL: &'static str = "Widget";

    fn blank() -> Self {
        Self {
            name: String::new(),
            active: true,
        }
    }

    fn from_entity(entity: &Widget) -> Result<Self, CoreError> {
        Ok(Self {
            name: entity.name.clone(),
            active: entity.active,
        })
    }

    fn to_payload(&self) -> Result<WidgetPayload, CoreError> {
        if self.name == "explode" {
            return Err(CoreError::Internal("payload builder failed".into()));
        }
        Ok(WidgetPayload {
            name: self.name.clone(),
            active: self.active,
        })
    }

    fn confirmation(&self, seed: Option<&Widget>) -> Option<ConfirmPrompt> {
        match seed {
            Some(w) if w.active && !self.active => Some(ConfirmPrompt::new("Retire?", "Sure?")),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List(u32),
    Fetch(DbId),
    Create,
    Update(DbId),
}

pub struct FakeResource {
    rows: Mutex<Vec<Widget>>,
    next_id: AtomicI64,
    calls: Mutex<Vec<Call>>,
    fail_next: Mutex<Option<ApiError>>,
    fail_list: Mutex<Option<ApiError>>,
    hold: Option<Semaphore>,
    held_pages: Mutex<HashMap<u32, Arc<Semaphore>>>,
}

impl FakeResource {
    pub fn new(rows: Vec<Widget>) -> Self {
        let next = rows.iter().map(|w| w.id).max().unwrap_or(0) + 1;
        Self {
            rows: Mutex::new(rows),
            next_id: AtomicI64::new(next),
            calls: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
            fail_list: Mutex::new(None),
            hold: None,
            held_pages: Mutex::new(HashMap::new()),
        }
    }

    pub fn starting_at(self, id: DbId) -> Self {
        self.next_id.store(id, Ordering::SeqCst);
        self
    }

    /// Writes block until [`release`](Self::release) is called.
    pub fn held(mut self) -> Self {
        self.hold = Some(Semaphore::new(0));
        self
    }

    pub fn release(&self) {
        if let Some(sem) = &self.hold {
            sem.add_permits(1);
        }
    }

    /// List calls for `page` block until [`release_page`](Self::release_page).
    pub fn hold_page(&self, page: u32) {
        self.held_pages
            .lock()
            .unwrap()
            .insert(page, Arc::new(Semaphore::new(0)));
    }

    pub fn release_page(&self, page: u32) {
        if let Some(sem) = self.held_pages.lock().unwrap().remove(&page) {
            sem.add_permits(1);
        }
    }

    pub fn fail_next(&self, err: ApiError) {
        *self.fail_next.lock().unwrap() = Some(err);
    }

    pub fn fail_list(&self, err: ApiError) {
        *self.fail_list.lock().unwrap() = Some(err);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn writes(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Create | Call::Update(_)))
            .count()
    }

    pub fn rows(&self) -> Vec<Widget> {
        self.rows.lock().unwrap().clone()
    }

    /// Change a row behind the client's back.
    pub fn rename(&self, id: DbId, name: &str) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|w| w.id == id) {
            row.name = name.to_string();
            row.revision += 1;
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    async fn wait(&self) -> Result<(), ApiError> {
        if let Some(sem) = &self.hold {
            sem.acquire().await.unwrap().forget();
        }
        match self.fail_next.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Resource for FakeResource {
    type Entity = Widget;
    type Payload = WidgetPayload;

    fn name(&self) -> &str {
        "widgets"
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<Widget>, ApiError> {
        self.record(Call::List(query.page));
        let held = self.held_pages.lock().unwrap().get(&query.page).cloned();
        if let Some(sem) = held {
            sem.acquire().await.unwrap().forget();
        }
        if let Some(err) = self.fail_list.lock().unwrap().take() {
            return Err(err);
        }
        let rows: Vec<Widget> = self
            .rows()
            .into_iter()
            .filter(|w| query.search.as_deref().map_or(true, |s| w.matches(s)))
            .collect();
        let per_page = query.per_page.max(1) as usize;
        let total = rows.len();
        let last_page = total.div_ceil(per_page).max(1) as u32;
        let start = (query.page.saturating_sub(1) as usize) * per_page;
        Ok(Page {
            data: rows.into_iter().skip(start).take(per_page).collect(),
            meta: PageMeta {
                current_page: query.page,
                last_page,
                total: total as u64,
            },
        })
    }

    async fn fetch(&self, id: DbId) -> Result<Widget, ApiError> {
        self.record(Call::Fetch(id));
        self.rows()
            .into_iter()
            .find(|w| w.id == id)
            .ok_or(ApiError::Rejected {
                status: 404,
                message: Some("Widget not found".into()),
            })
    }

    async fn create(&self, payload: &WidgetPayload) -> Result<Widget, ApiError> {
        self.record(Call::Create);
        self.wait().await?;
        let mut widget = Widget::new(self.next_id.fetch_add(1, Ordering::SeqCst), &payload.name);
        widget.active = payload.active;
        self.rows.lock().unwrap().push(widget.clone());
        Ok(widget)
    }

    async fn update(&self, id: DbId, payload: &WidgetPayload) -> Result<Widget, ApiError> {
        self.record(Call::Update(id));
        self.wait().await?;
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or(ApiError::Rejected {
                status: 404,
                message: Some("Widget not found".into()),
            })?;
        row.name = payload.name.clone();
        row.active = payload.active;
        row.revision += 1;
        Ok(row.clone())
    }
}

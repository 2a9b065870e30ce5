#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use campus_core::draft::Record;
use campus_core::leave::{LeaveApplication, LeavePayload};
use campus_core::pagination::{ListQuery, Page, PageMeta};
use campus_core::quota::{Quota, QuotaPayload};
use campus_core::types::DbId;
use campus_core::wire::WireNumber;
use campus_forms::{ApiError, Resource};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Semaphore;

/// A backend call as seen by [`MemoryBackend`]. Write payloads are kept as
/// the JSON that would have gone over the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    List { page: u32 },
    Fetch(DbId),
    Create(Value),
    Update(DbId, Value),
}

/// Builds the stored row for a write: `(id, payload, previous row)`.
pub type Apply<E, P> = fn(DbId, &P, Option<&E>) -> E;

/// In-memory stand-in for one REST collection.
pub struct MemoryBackend<E, P> {
    name: &'static str,
    rows: Mutex<Vec<E>>,
    next_id: AtomicI64,
    requests: Mutex<Vec<Request>>,
    fail_next: Mutex<Option<ApiError>>,
    hold: Option<Semaphore>,
    apply: Apply<E, P>,
}

impl<E: Record, P: Serialize> MemoryBackend<E, P> {
    pub fn new(name: &'static str, rows: Vec<E>, apply: Apply<E, P>) -> Self {
        let next = rows.iter().map(Record::id).max().unwrap_or(0) + 1;
        Self {
            name,
            rows: Mutex::new(rows),
            next_id: AtomicI64::new(next),
            requests: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
            hold: None,
            apply,
        }
    }

    pub fn next_id(self, id: DbId) -> Self {
        self.next_id.store(id, Ordering::SeqCst);
        self
    }

    /// Writes block until [`release`](Self::release).
    pub fn held(mut self) -> Self {
        self.hold = Some(Semaphore::new(0));
        self
    }

    pub fn release(&self) {
        if let Some(sem) = &self.hold {
            sem.add_permits(1);
        }
    }

    pub fn fail_next(&self, err: ApiError) {
        *self.fail_next.lock().unwrap() = Some(err);
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| matches!(r, Request::Create(_) | Request::Update(..)))
            .collect()
    }

    pub fn row(&self, id: DbId) -> Option<E> {
        self.rows.lock().unwrap().iter().find(|r| r.id() == id).cloned()
    }

    fn log(&self, request: Request) {
        self.requests.lock().unwrap().push(request);
    }

    async fn gate(&self) -> Result<(), ApiError> {
        if let Some(sem) = &self.hold {
            sem.acquire().await.expect("semaphore closed").forget();
        }
        match self.fail_next.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn not_found(id: DbId) -> ApiError {
    ApiError::Rejected {
        status: 404,
        message: Some(format!("Record {id} not found")),
    }
}

#[async_trait]
impl<E, P> Resource for MemoryBackend<E, P>
where
    E: Record,
    P: Serialize + Send + Sync + 'static,
{
    type Entity = E;
    type Payload = P;

    fn name(&self) -> &str {
        self.name
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<E>, ApiError> {
        self.log(Request::List { page: query.page });
        let rows: Vec<E> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| query.search.as_deref().map_or(true, |s| r.matches(s)))
            .cloned()
            .collect();
        let per_page = query.per_page.max(1) as usize;
        let total = rows.len();
        let start = (query.page.saturating_sub(1) as usize) * per_page;
        Ok(Page {
            data: rows.into_iter().skip(start).take(per_page).collect(),
            meta: PageMeta {
                current_page: query.page,
                last_page: total.div_ceil(per_page).max(1) as u32,
                total: total as u64,
            },
        })
    }

    async fn fetch(&self, id: DbId) -> Result<E, ApiError> {
        self.log(Request::Fetch(id));
        self.row(id).ok_or_else(|| not_found(id))
    }

    async fn create(&self, payload: &P) -> Result<E, ApiError> {
        self.log(Request::Create(wire(payload)));
        self.gate().await?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let row = (self.apply)(id, payload, None);
        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn update(&self, id: DbId, payload: &P) -> Result<E, ApiError> {
        self.log(Request::Update(id, wire(payload)));
        self.gate().await?;
        let mut rows = self.rows.lock().unwrap();
        let slot = rows
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| not_found(id))?;
        *slot = (self.apply)(id, payload, Some(&*slot));
        Ok(slot.clone())
    }
}

fn wire<P: Serialize>(payload: &P) -> Value {
    serde_json::to_value(payload).expect("payload should serialize")
}

// ---------------------------------------------------------------------------
// Entity fixtures
// ---------------------------------------------------------------------------

pub type LeaveBackend = MemoryBackend<LeaveApplication, LeavePayload>;
pub type QuotaBackend = MemoryBackend<Quota, QuotaPayload>;

pub fn apply_leave(id: DbId, p: &LeavePayload, prev: Option<&LeaveApplication>) -> LeaveApplication {
    LeaveApplication {
        id,
        staff_id: p.staff_id,
        leave_type_id: p.leave_type_id,
        from_date: p.from_date,
        to_date: p.to_date,
        is_half_day: p.is_half_day,
        half_day_type: p.half_day_type.map(|s| s.as_str().to_string()),
        is_hourly_leave: p.is_hourly_leave,
        hours: p.hours.map(|h| WireNumber::Int(i64::from(h))),
        reason: p.reason.clone(),
        status: Some(
            prev.and_then(|l| l.status.clone())
                .unwrap_or_else(|| "pending".to_string()),
        ),
        staff_name: prev.and_then(|l| l.staff_name.clone()),
    }
}

pub fn apply_quota(id: DbId, p: &QuotaPayload, prev: Option<&Quota>) -> Quota {
    let category = serde_json::to_value(p.category)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    Quota {
        id,
        name: p.name.clone(),
        academic_year_id: p.academic_year_id,
        category,
        total_seats: WireNumber::Int(i64::from(p.total_seats)),
        filled_seats: Some(
            prev.and_then(|q| q.filled_seats.clone())
                .unwrap_or(WireNumber::Int(0)),
        ),
        is_active: p.is_active,
        description: p.description.clone(),
    }
}

/// Rows shaped like the backend sends them: numbers as strings, nulls kept.
pub fn leave_rows() -> Vec<LeaveApplication> {
    serde_json::from_value(serde_json::json!([
        {
            "id": 11, "staff_id": 7, "leave_type_id": 2,
            "from_date": "2025-06-10", "to_date": "2025-06-10",
            "is_half_day": false, "half_day_type": null,
            "is_hourly_leave": true, "hours": "2",
            "reason": "Bank visit", "status": "approved", "staff_name": "R. Iyer"
        },
        {
            "id": 12, "staff_id": 9, "leave_type_id": 1,
            "from_date": "2025-07-01", "to_date": "2025-07-01",
            "is_half_day": true, "half_day_type": "second_half",
            "is_hourly_leave": false, "hours": null,
            "reason": null, "status": "pending", "staff_name": "M. Das"
        }
    ]))
    .expect("leave fixtures should deserialize")
}

pub fn quota_rows() -> Vec<Quota> {
    serde_json::from_value(serde_json::json!([
        {
            "id": 1, "name": "General", "academic_year_id": 12, "category": "general",
            "total_seats": "120", "filled_seats": "64", "is_active": true, "description": null
        },
        {
            "id": 2, "name": "Management", "academic_year_id": 12, "category": "management",
            "total_seats": 40, "filled_seats": 18, "is_active": true,
            "description": "Board discretion"
        },
        {
            "id": 3, "name": "RTE", "academic_year_id": 12, "category": "rte",
            "total_seats": "25", "filled_seats": "25", "is_active": false, "description": null
        }
    ]))
    .expect("quota fixtures should deserialize")
}

pub fn leave_backend() -> LeaveBackend {
    MemoryBackend::new("leave-applications", leave_rows(), apply_leave)
}

pub fn quota_backend() -> QuotaBackend {
    MemoryBackend::new("quotas", quota_rows(), apply_quota)
}

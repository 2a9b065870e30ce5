#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};

use axum::extract::{Multipart, Path, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use campus_client::{ApiClient, ClientConfig};
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

pub const TEST_TOKEN: &str = "test-token";

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Route the client's `tracing` output through the test harness.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("campus_client=debug,campus_forms=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

// ---------------------------------------------------------------------------
// Recorded traffic
// ---------------------------------------------------------------------------

/// One request as the mock backend received it.
#[derive(Debug, Clone)]
pub struct Seen {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub request_id: Option<String>,
    pub authorization: Option<String>,
    pub accept: Option<String>,
}

#[derive(Default)]
pub struct MockState {
    pub quotas: Mutex<Vec<Value>>,
    pub next_id: Mutex<i64>,
    pub seen: Mutex<Vec<Seen>>,
    pub exports: Mutex<Vec<Value>>,
    pub uploads: Mutex<Vec<(String, Option<String>, Vec<u8>)>>,
}

type Shared = Arc<MockState>;

/// Quotas as the backend serializes them: counts as strings, nulls kept.
pub fn seed_quotas() -> Vec<Value> {
    vec![
        json!({
            "id": 1, "name": "General", "academic_year_id": 12, "category": "general",
            "total_seats": "120", "filled_seats": "64", "is_active": true, "description": null
        }),
        json!({
            "id": 2, "name": "Management", "academic_year_id": 12, "category": "management",
            "total_seats": "40", "filled_seats": "18", "is_active": true,
            "description": "Board discretion"
        }),
        json!({
            "id": 3, "name": "Sibling", "academic_year_id": 11, "category": "sibling",
            "total_seats": "20", "filled_seats": "20", "is_active": false, "description": null
        }),
    ]
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// A mock school backend on an ephemeral local port.
pub struct MockBackend {
    pub state: Shared,
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl MockBackend {
    pub async fn start() -> Self {
        init_tracing();
        let state: Shared = Arc::new(MockState::default());
        *state.quotas.lock().unwrap() = seed_quotas();
        *state.next_id.lock().unwrap() = 100;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("local addr");
        let app = router(state.clone());
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock backend crashed");
        });

        Self {
            state,
            base_url: format!("http://{addr}/api"),
            handle,
        }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(&self.base_url).with_token(TEST_TOKEN)
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.config()).expect("client should build")
    }

    pub fn next_id(&self, id: i64) {
        *self.state.next_id.lock().unwrap() = id;
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.state.seen.lock().unwrap().clone()
    }

    /// Requests other than list/fetch.
    pub fn writes(&self) -> Vec<Seen> {
        self.seen()
            .into_iter()
            .filter(|s| s.method != "GET")
            .collect()
    }

    pub fn quota(&self, id: i64) -> Option<Value> {
        self.state
            .quotas
            .lock()
            .unwrap()
            .iter()
            .find(|q| q["id"] == json!(id))
            .cloned()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn router(state: Shared) -> Router {
    let api = Router::new()
        .route("/admission/quotas", get(list_quotas).post(create_quota))
        .route("/admission/quotas/export", post(export_quotas))
        .route("/admission/quotas/import", post(import_quotas))
        .route("/admission/quotas/{id}", get(get_quota).put(update_quota))
        .route("/fees/payments/{id}/receipt", get(fee_receipt))
        .route("/leave-applications", post(leave_outage))
        .route("/students", get(html_instead_of_json));

    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

async fn record(State(state): State<Shared>, req: Request, next: Next) -> Response {
    let seen = {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Seen {
            method: req.method().to_string(),
            path: req.uri().path().to_string(),
            query: req.uri().query().map(str::to_string),
            request_id: header("x-request-id"),
            authorization: header("authorization"),
            accept: header("accept"),
        }
    };
    state.seen.lock().unwrap().push(seen);
    next.run(req).await
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn list_quotas(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let per_page: usize = params
        .get("per_page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(15);
    let search = params.get("search").map(|s| s.to_lowercase());
    let year = params.get("academic_year_id");

    let rows: Vec<Value> = state
        .quotas
        .lock()
        .unwrap()
        .iter()
        .filter(|q| year.map_or(true, |y| q["academic_year_id"].to_string() == *y))
        .filter(|q| {
            search.as_ref().map_or(true, |s| {
                q["name"].as_str().unwrap_or_default().to_lowercase().contains(s)
            })
        })
        .cloned()
        .collect();

    let total = rows.len();
    let last_page = total.div_ceil(per_page.max(1)).max(1);
    let data: Vec<Value> = rows
        .into_iter()
        .skip((page.max(1) - 1) * per_page)
        .take(per_page)
        .collect();

    Json(json!({
        "data": data,
        "meta": {
            "current_page": page,
            "last_page": last_page,
            "per_page": per_page,
            "total": total,
        }
    }))
}

async fn get_quota(State(state): State<Shared>, Path(id): Path<i64>) -> Response {
    let quotas = state.quotas.lock().unwrap();
    match quotas.iter().find(|q| q["id"] == json!(id)) {
        Some(q) => Json(json!({ "data": q })).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Quota not found" })),
        )
            .into_response(),
    }
}

async fn create_quota(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let name = body["name"].as_str().unwrap_or_default().to_string();
    let mut quotas = state.quotas.lock().unwrap();
    if quotas.iter().any(|q| q["name"] == json!(name)) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "message": "The given data was invalid.",
                "errors": { "messages": [format!("A quota named {name} already exists")] }
            })),
        )
            .into_response();
    }

    let id = {
        let mut next = state.next_id.lock().unwrap();
        let id = *next;
        *next += 1;
        id
    };
    let row = json!({
        "id": id,
        "name": name,
        "academic_year_id": body["academic_year_id"],
        "category": body["category"],
        "total_seats": body["total_seats"].to_string(),
        "filled_seats": "0",
        "is_active": body["is_active"],
        "description": body["description"],
    });
    quotas.push(row.clone());
    (StatusCode::CREATED, Json(json!({ "data": row }))).into_response()
}

async fn update_quota(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut quotas = state.quotas.lock().unwrap();
    let Some(row) = quotas.iter_mut().find(|q| q["id"] == json!(id)) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Quota not found" })),
        )
            .into_response();
    };
    for key in ["name", "academic_year_id", "category", "is_active", "description"] {
        row[key] = body[key].clone();
    }
    row["total_seats"] = json!(body["total_seats"].to_string());
    // Bare entity, no envelope.
    Json(row.clone()).into_response()
}

async fn export_quotas(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    state.exports.lock().unwrap().push(body);
    (
        [
            (header::CONTENT_TYPE, XLSX_MIME),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"quotas-2025.xlsx\"",
            ),
        ],
        b"PK\x03\x04xlsx-bytes".to_vec(),
    )
        .into_response()
}

async fn import_quotas(State(state): State<Shared>, mut multipart: Multipart) -> Response {
    let mut imported = 0;
    while let Some(field) = multipart.next_field().await.expect("multipart field") {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.expect("field bytes").to_vec();
        state
            .uploads
            .lock()
            .unwrap()
            .push((file_name, content_type, bytes));
        imported += 1;
    }
    if imported == 0 {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "No file uploaded" })),
        )
            .into_response();
    }
    Json(json!({ "imported": 2, "skipped": 1, "errors": ["Row 4: unknown category"] }))
        .into_response()
}

async fn fee_receipt(Path(id): Path<i64>) -> Response {
    if id == 404 {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Payment not found" })),
        )
            .into_response();
    }
    (
        [(header::CONTENT_TYPE, "application/pdf")],
        format!("%PDF-1.4 receipt {id}").into_bytes(),
    )
        .into_response()
}

async fn leave_outage() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, "text/html")],
        "<html><body>Internal Server Error</body></html>",
    )
        .into_response()
}

async fn html_instead_of_json() -> Response {
    (
        [(header::CONTENT_TYPE, "text/html")],
        "<html><body>Login</body></html>",
    )
        .into_response()
}

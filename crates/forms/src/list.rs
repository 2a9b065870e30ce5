//! Paginated list view with a child form.
//!
//! The fetched page is a read-through cache: rows change only by re-fetching,
//! never by splicing a mutation response in locally. Search and sort typed
//! into the table operate on the fetched page; `set_search` additionally
//! forwards the term to the backend for collection-wide search.

use std::cmp::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use campus_core::draft::{ConfirmPrompt, Draft, Record};
use campus_core::error::CoreError;
use campus_core::pagination::{ListQuery, PageCursor};
use campus_core::types::DbId;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::controller::{FormController, SubmitOutcome};
use crate::error::FormError;
use crate::gate::GatedUpdate;
use crate::notice::{Notice, NoticeBus};
use crate::resource::Resource;

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

/// Local sort on one serialized field of the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder {
    /// Top-level key of the row's JSON form, e.g. `"name"`.
    pub field: String,
    pub descending: bool,
}

impl SortOrder {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

// ---------------------------------------------------------------------------
// ListView
// ---------------------------------------------------------------------------

struct ListState<E> {
    query: ListQuery,
    cursor: PageCursor,
    /// The fetched page, unfiltered.
    rows: Vec<E>,
    /// Local search text applied by [`ListView::rows`].
    filter: String,
    sort: Option<SortOrder>,
    loading: bool,
    /// Bumped per fetch so only the newest response is applied.
    generation: u64,
    last_error: Option<FormError>,
}

/// One paginated table of a backend collection plus its create/edit form.
///
/// Writes made through [`submit`](Self::submit), [`confirm`](Self::confirm)
/// or [`confirm_update`](Self::confirm_update) re-fetch the current page.
pub struct ListView<D, R>
where
    R: Resource,
    D: Draft<Entity = R::Entity, Payload = R::Payload>,
{
    resource: Arc<R>,
    notices: NoticeBus,
    scope: CancellationToken,
    form: FormController<D, R>,
    state: Mutex<ListState<R::Entity>>,
}

impl<D, R> ListView<D, R>
where
    R: Resource,
    D: Draft<Entity = R::Entity, Payload = R::Payload>,
{
    /// A view over `resource` starting from `query`. Nothing is fetched until
    /// [`mount`](Self::mount).
    pub fn new(resource: Arc<R>, notices: NoticeBus, query: ListQuery) -> Self {
        let scope = CancellationToken::new();
        let form = FormController::with_scope(resource.clone(), notices.clone(), scope.child_token());
        Self {
            resource,
            notices,
            scope,
            form,
            state: Mutex::new(ListState {
                query,
                cursor: PageCursor::default(),
                rows: Vec::new(),
                filter: String::new(),
                sort: None,
                loading: false,
                generation: 0,
                last_error: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ListState<R::Entity>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The child form, for field edits and read-only queries.
    ///
    /// Submit and confirm through the view rather than this controller:
    /// only the view's methods re-fetch the page after a save.
    pub fn form(&self) -> &FormController<D, R> {
        &self.form
    }

    // -----------------------------------------------------------------------
    // Fetching
    // -----------------------------------------------------------------------

    /// First fetch after the view appears.
    pub async fn mount(&self) -> Result<(), FormError> {
        self.load().await
    }

    /// Fetch the page named by the current query.
    pub async fn load(&self) -> Result<(), FormError> {
        if self.scope.is_cancelled() {
            return Err(FormError::Closed);
        }
        let (query, generation) = {
            let mut st = self.lock();
            st.generation += 1;
            st.loading = true;
            (st.query.clone(), st.generation)
        };

        let result = tokio::select! {
            biased;
            _ = self.scope.cancelled() => return Err(FormError::Closed),
            r = self.resource.list(&query) => r,
        };

        let mut st = self.lock();
        if self.scope.is_cancelled() {
            return Err(FormError::Closed);
        }
        if st.generation != generation {
            tracing::debug!(
                resource = self.resource.name(),
                page = query.page,
                "Discarding superseded list response",
            );
            return Ok(());
        }
        st.loading = false;

        match result {
            Ok(page) => {
                tracing::debug!(
                    resource = self.resource.name(),
                    page = page.meta.current_page,
                    rows = page.data.len(),
                    total = page.meta.total,
                    "List page loaded",
                );
                st.cursor = PageCursor::from_meta(&page.meta);
                st.query.page = st.cursor.page;
                st.rows = page.data;
                st.last_error = None;
                Ok(())
            }
            Err(e) => {
                let err = FormError::from(e);
                tracing::warn!(resource = self.resource.name(), error = %err, "List fetch failed");
                self.notices.publish(Notice::error(err.user_message()));
                st.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Change a server-side scope filter (academic session, class, ...).
    /// Goes back to page 1.
    pub async fn set_scope(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), FormError> {
        {
            let mut st = self.lock();
            st.query.scope.insert(key.into(), value.into());
            st.query.page = 1;
        }
        self.load().await
    }

    /// Drop a server-side scope filter. Goes back to page 1.
    pub async fn clear_scope(&self, key: &str) -> Result<(), FormError> {
        {
            let mut st = self.lock();
            st.query.scope.remove(key);
            st.query.page = 1;
        }
        self.load().await
    }

    /// Backend-wide search. Goes back to page 1.
    pub async fn set_search(&self, term: Option<String>) -> Result<(), FormError> {
        {
            let mut st = self.lock();
            st.query.search = term.filter(|t| !t.trim().is_empty());
            st.query.page = 1;
        }
        self.load().await
    }

    /// In-memory filter over the fetched page. A change of filter returns to
    /// page 1, re-fetching only if the view was on another page.
    pub async fn set_filter(&self, text: impl Into<String>) -> Result<(), FormError> {
        let refetch = {
            let mut st = self.lock();
            st.filter = text.into();
            let away = st.query.page != 1;
            st.query.page = 1;
            away
        };
        if refetch {
            self.load().await
        } else {
            Ok(())
        }
    }

    /// In-memory sort over the fetched page.
    pub fn set_sort(&self, sort: Option<SortOrder>) {
        self.lock().sort = sort;
    }

    /// Jump to `page`, clamped to the known page range.
    pub async fn goto_page(&self, page: u32) -> Result<(), FormError> {
        {
            let mut st = self.lock();
            st.query.page = st.cursor.clamp(page);
        }
        self.load().await
    }

    /// No call is made on the last page.
    pub async fn next_page(&self) -> Result<(), FormError> {
        let page = {
            let st = self.lock();
            if !st.cursor.has_next() {
                return Ok(());
            }
            st.cursor.page + 1
        };
        self.goto_page(page).await
    }

    pub async fn prev_page(&self) -> Result<(), FormError> {
        let page = {
            let st = self.lock();
            if !st.cursor.has_prev() {
                return Ok(());
            }
            st.cursor.page - 1
        };
        self.goto_page(page).await
    }

    // -----------------------------------------------------------------------
    // Reading
    // -----------------------------------------------------------------------

    /// Rows to render: the fetched page after local filter and sort.
    pub fn rows(&self) -> Vec<R::Entity> {
        let st = self.lock();
        let mut rows: Vec<R::Entity> = st
            .rows
            .iter()
            .filter(|row| row.matches(&st.filter))
            .cloned()
            .collect();
        if let Some(sort) = &st.sort {
            sort_rows(&mut rows, sort);
        }
        rows
    }

    /// Position reported by the last applied response.
    pub fn cursor(&self) -> PageCursor {
        self.lock().cursor
    }

    pub fn query(&self) -> ListQuery {
        self.lock().query.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    /// The most recent fetch failure, cleared by the next successful fetch.
    pub fn last_error(&self) -> Option<FormError> {
        self.lock().last_error.clone()
    }

    // -----------------------------------------------------------------------
    // Child form
    // -----------------------------------------------------------------------

    /// Open the child form blank.
    pub fn open_create(&self) -> Result<(), FormError> {
        self.form.open_create()
    }

    /// Open the edit form seeded from the row already in memory.
    pub fn open_edit(&self, id: DbId) -> Result<(), FormError> {
        let row = self
            .lock()
            .rows
            .iter()
            .find(|row| row.id() == id)
            .cloned()
            .ok_or(CoreError::NotFound {
                entity: D::LABEL,
                id,
            })?;
        self.form.open_edit(&row)
    }

    /// Fetch the record first, then open the edit form with the fresh copy.
    pub async fn open_edit_fresh(&self, id: DbId) -> Result<(), FormError> {
        let fetched = tokio::select! {
            biased;
            _ = self.scope.cancelled() => return Err(FormError::Closed),
            r = self.resource.fetch(id) => r,
        };
        match fetched {
            Ok(entity) => self.form.open_edit(&entity),
            Err(e) => {
                let err = FormError::from(e);
                self.notices.publish(Notice::error(err.user_message()));
                Err(err)
            }
        }
    }

    /// Submit the child form; a save re-fetches the current page.
    ///
    /// Once the backend accepts the write this returns the saved entity even
    /// if the follow-up re-fetch fails; that failure lands in
    /// [`last_error`](Self::last_error) and an error notice.
    pub async fn submit(&self) -> Result<SubmitOutcome<R::Entity>, FormError> {
        let outcome = self.form.submit().await?;
        if let SubmitOutcome::Saved(entity) = &outcome {
            self.refresh_after_save(entity).await;
        }
        Ok(outcome)
    }

    /// Confirm the child form's pending gate; a save re-fetches the page.
    pub async fn confirm(&self) -> Result<R::Entity, FormError> {
        let entity = self.form.confirm().await?;
        self.refresh_after_save(&entity).await;
        Ok(entity)
    }

    /// Dismiss the child form's pending confirmation.
    pub fn decline(&self) -> bool {
        self.form.decline()
    }

    /// Reconcile after a successful write by re-fetching the current page.
    pub async fn on_saved(&self, entity: &R::Entity) -> Result<(), FormError> {
        tracing::debug!(
            resource = self.resource.name(),
            id = entity.id(),
            "Refreshing list after save",
        );
        self.load().await
    }

    async fn refresh_after_save(&self, entity: &R::Entity) {
        if let Err(err) = self.on_saved(entity).await {
            tracing::warn!(
                resource = self.resource.name(),
                id = entity.id(),
                error = %err,
                "Save succeeded but the list could not be refreshed",
            );
        }
    }

    // -----------------------------------------------------------------------
    // Row actions
    // -----------------------------------------------------------------------

    /// Stage a confirmation-gated update for one row, such as a status
    /// toggle. Nothing is sent until the returned gate is confirmed.
    pub fn request_update(&self, id: DbId, prompt: ConfirmPrompt, payload: R::Payload) -> GatedUpdate<R> {
        GatedUpdate::open(self.resource.clone(), self.notices.clone(), prompt, id, payload)
    }

    /// Confirm a staged row action and re-fetch on success. A failed
    /// re-fetch does not turn the accepted write into an error.
    pub async fn confirm_update(&self, action: &GatedUpdate<R>) -> Result<R::Entity, FormError> {
        let entity = action.confirm().await?;
        self.refresh_after_save(&entity).await;
        Ok(entity)
    }

    /// Cancel in-flight fetches and close the child form.
    pub fn unmount(&self) {
        self.scope.cancel();
        self.form.unmount();
        tracing::debug!(resource = self.resource.name(), "List view unmounted");
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn sort_rows<E: Record>(rows: &mut [E], sort: &SortOrder) {
    let key = |row: &E| {
        serde_json::to_value(row)
            .ok()
            .and_then(|v| v.get(&sort.field).cloned())
            .unwrap_or(Value::Null)
    };
    rows.sort_by(|a, b| {
        let ord = compare_values(&key(a), &key(b));
        if sort.descending {
            ord.reverse()
        } else {
            ord
        }
    });
}

/// Total order over JSON scalars: nulls first, then booleans, numbers and
/// strings (case-insensitive).
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) | Value::Object(_) => 4,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        _ => rank(a).cmp(&rank(b)),
    }
}

//! Form controller: owns one entity draft from open to close.
//!
//! Phases run `Closed -> Editing -> (Confirming) -> Submitting -> Closed` on
//! success, or `Submitting -> Editing` on failure with the draft kept intact.
//! State sits behind a synchronous mutex that is never held across an
//! `.await`; network results are applied only if the session that started
//! them is still open.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use campus_core::draft::{ConfirmPrompt, Draft, FormMode, Record};
use campus_core::error::CoreError;
use campus_core::types::DbId;
use campus_core::validation::{FieldViolation, ValidationResult};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::FormError;
use crate::gate::ConfirmationGate;
use crate::invoker::{Mutation, MutationInvoker};
use crate::notice::{Notice, NoticeBus};
use crate::resource::Resource;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Where a form is in its edit-and-submit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
    /// No draft is open.
    Closed,
    Editing,
    /// Waiting on a yes/no from the confirmation prompt.
    Confirming,
    /// A write is in flight; edits are refused.
    Submitting,
}

impl FormPhase {
    /// Stable lowercase name, used in logs and phase errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Editing => "editing",
            Self::Confirming => "confirming",
            Self::Submitting => "submitting",
        }
    }
}

/// Result of a [`FormController::submit`] call that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome<E> {
    /// The backend accepted the write; carries the server's entity.
    Saved(E),
    /// The draft is valid but needs a yes/no before it is sent.
    AwaitingConfirmation(ConfirmPrompt),
}

struct Session<D: Draft> {
    mode: FormMode,
    seed: Option<D::Entity>,
    initial: D,
    draft: D,
    touched: BTreeSet<String>,
    submit_attempted: bool,
    submitting: bool,
    gate: ConfirmationGate<()>,
    token: CancellationToken,
}

impl<D: Draft> Session<D> {
    fn phase(&self) -> FormPhase {
        if self.submitting {
            FormPhase::Submitting
        } else if self.gate.is_open() {
            FormPhase::Confirming
        } else {
            FormPhase::Editing
        }
    }

    fn target_id(&self) -> Option<DbId> {
        match self.mode {
            FormMode::Create => None,
            FormMode::Edit => self.seed.as_ref().map(Record::id),
        }
    }
}

struct FormState<D: Draft> {
    session: Option<Session<D>>,
    last_error: Option<FormError>,
}

/// Everything needed to send one write once the lock is released.
struct Prepared<P> {
    mode: FormMode,
    id: Option<DbId>,
    payload: P,
    token: CancellationToken,
}

// ---------------------------------------------------------------------------
// FormController
// ---------------------------------------------------------------------------

/// Create/edit form over one resource: owns the draft, runs validation and
/// sends at most one write at a time.
///
/// Methods take `&self`; the state lock is never held across an await, so a
/// controller can be shared behind an `Arc` between UI tasks.
pub struct FormController<D, R>
where
    R: Resource,
    D: Draft<Entity = R::Entity, Payload = R::Payload>,
{
    invoker: Arc<MutationInvoker<R>>,
    notices: NoticeBus,
    scope: CancellationToken,
    state: Mutex<FormState<D>>,
}

impl<D, R> FormController<D, R>
where
    R: Resource,
    D: Draft<Entity = R::Entity, Payload = R::Payload>,
{
    /// A controller with its own cancellation scope.
    pub fn new(resource: Arc<R>, notices: NoticeBus) -> Self {
        Self::with_scope(resource, notices, CancellationToken::new())
    }

    /// Build a controller whose lifetime is bounded by `scope`; cancelling
    /// the scope closes the form and drops any in-flight result.
    pub fn with_scope(resource: Arc<R>, notices: NoticeBus, scope: CancellationToken) -> Self {
        Self {
            invoker: Arc::new(MutationInvoker::new(resource)),
            notices,
            scope,
            state: Mutex::new(FormState {
                session: None,
                last_error: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FormState<D>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resource_name(&self) -> &str {
        self.invoker.resource().name()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Populate a fresh draft. Edit mode requires the record being edited.
    pub fn initialize(&self, mode: FormMode, seed: Option<&D::Entity>) -> Result<(), FormError> {
        if self.scope.is_cancelled() {
            return Err(FormError::Closed);
        }

        let draft = match (mode, seed) {
            (FormMode::Create, _) => D::blank(),
            (FormMode::Edit, Some(entity)) => D::from_entity(entity)?,
            (FormMode::Edit, None) => {
                return Err(CoreError::Validation(format!(
                    "{} edit form needs a record to edit",
                    D::LABEL
                ))
                .into());
            }
        };

        let mut st = self.lock();
        if let Some(previous) = &st.session {
            if previous.submitting {
                return Err(FormError::Busy);
            }
            previous.token.cancel();
        }

        st.session = Some(Session {
            mode,
            seed: match mode {
                FormMode::Create => None,
                FormMode::Edit => seed.cloned(),
            },
            initial: draft.clone(),
            draft,
            touched: BTreeSet::new(),
            submit_attempted: false,
            submitting: false,
            gate: ConfirmationGate::new(),
            token: self.scope.child_token(),
        });
        st.last_error = None;

        tracing::debug!(
            resource = self.resource_name(),
            mode = mode.as_str(),
            id = seed.map(Record::id),
            "Form opened",
        );
        Ok(())
    }

    /// Open an empty draft for a new record.
    pub fn open_create(&self) -> Result<(), FormError> {
        self.initialize(FormMode::Create, None)
    }

    /// Open a draft seeded from `entity`.
    pub fn open_edit(&self, entity: &D::Entity) -> Result<(), FormError> {
        self.initialize(FormMode::Edit, Some(entity))
    }

    /// Discard the draft and close. Never touches the network; calling it on
    /// a closed form does nothing. An in-flight submission is abandoned.
    pub fn cancel(&self) {
        let mut st = self.lock();
        if let Some(session) = st.session.take() {
            session.token.cancel();
            tracing::debug!(
                resource = self.resource_name(),
                mode = session.mode.as_str(),
                "Form cancelled",
            );
        }
        st.last_error = None;
    }

    /// Tear down for good. Later calls report [`FormError::Closed`].
    pub fn unmount(&self) {
        self.scope.cancel();
        self.cancel();
    }

    /// Restore the draft to what the form opened with.
    pub fn reset(&self) -> Result<(), FormError> {
        let mut st = self.lock();
        let session = editing_session(&mut st, "reset")?;
        session.draft = session.initial.clone();
        session.touched.clear();
        session.submit_attempted = false;
        st.last_error = None;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Editing
    // -----------------------------------------------------------------------

    /// Set one field from a UI value and re-validate.
    pub fn set_field(&self, path: &str, value: Value) -> Result<ValidationResult, FormError> {
        let mut st = self.lock();
        let session = editing_session(&mut st, "edit")?;
        let before = snapshot(&session.draft);
        session.draft.set_field(path, value)?;
        session.touched.insert(path.to_string());
        session
            .touched
            .extend(changed_fields(&before, &snapshot(&session.draft)));
        Ok(session.draft.validate_draft())
    }

    /// Apply a typed edit and re-validate. Fields whose serialized value
    /// changed are marked touched.
    pub fn edit<F>(&self, apply: F) -> Result<ValidationResult, FormError>
    where
        F: FnOnce(&mut D),
    {
        let mut st = self.lock();
        let session = editing_session(&mut st, "edit")?;
        let before = snapshot(&session.draft);
        apply(&mut session.draft);
        session
            .touched
            .extend(changed_fields(&before, &snapshot(&session.draft)));
        Ok(session.draft.validate_draft())
    }

    /// Mark a field touched without changing it (field blur).
    pub fn touch(&self, path: &str) {
        if let Some(session) = self.lock().session.as_mut() {
            session.touched.insert(path.to_string());
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Current phase; [`FormPhase::Closed`] when no draft is open.
    pub fn phase(&self) -> FormPhase {
        self.lock()
            .session
            .as_ref()
            .map_or(FormPhase::Closed, Session::phase)
    }

    pub fn mode(&self) -> Option<FormMode> {
        self.lock().session.as_ref().map(|s| s.mode)
    }

    /// A copy of the draft as it stands.
    pub fn draft(&self) -> Option<D> {
        self.lock().session.as_ref().map(|s| s.draft.clone())
    }

    /// Full validation of the current draft, or `None` when closed.
    pub fn validation(&self) -> Option<ValidationResult> {
        self.lock()
            .session
            .as_ref()
            .map(|s| s.draft.validate_draft())
    }

    /// Violations the UI should show inline: those on touched fields, or all
    /// of them once a submit has been attempted.
    pub fn visible_errors(&self) -> Vec<FieldViolation> {
        let st = self.lock();
        let Some(session) = st.session.as_ref() else {
            return Vec::new();
        };
        session
            .draft
            .validate_draft()
            .errors
            .into_iter()
            .filter(|v| session.submit_attempted || session.touched.contains(&v.field))
            .collect()
    }

    /// Whether the submit control is enabled.
    pub fn can_submit(&self) -> bool {
        let st = self.lock();
        match st.session.as_ref() {
            Some(s) => {
                s.phase() == FormPhase::Editing
                    && !self.invoker.is_pending()
                    && s.draft.validate_draft().is_valid
            }
            None => false,
        }
    }

    /// Whether the draft differs from what the form opened with.
    pub fn is_dirty(&self) -> bool {
        self.lock()
            .session
            .as_ref()
            .is_some_and(|s| s.draft != s.initial)
    }

    /// The open confirmation prompt, if any.
    pub fn prompt(&self) -> Option<ConfirmPrompt> {
        self.lock()
            .session
            .as_ref()
            .and_then(|s| s.gate.prompt().cloned())
    }

    /// The failure from the most recent submission, kept until the next
    /// edit session or reset.
    pub fn last_error(&self) -> Option<FormError> {
        self.lock().last_error.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.invoker.is_pending()
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Validate and send, or open the confirmation gate when the draft asks
    /// for one. Invalid drafts never reach the network.
    pub async fn submit(&self) -> Result<SubmitOutcome<R::Entity>, FormError> {
        let prepared = {
            let mut st = self.lock();
            let session = st.session.as_mut().ok_or(FormError::InvalidPhase {
                action: "submit",
                phase: FormPhase::Closed.as_str(),
            })?;
            match session.phase() {
                FormPhase::Editing => {}
                FormPhase::Submitting => return Err(FormError::Busy),
                phase => {
                    return Err(FormError::InvalidPhase {
                        action: "submit",
                        phase: phase.as_str(),
                    })
                }
            }
            session.submit_attempted = true;

            let result = session.draft.validate_draft();
            if !result.is_valid {
                tracing::debug!(
                    resource = self.resource_name(),
                    errors = result.errors.len(),
                    "Submit blocked by validation",
                );
                return Err(FormError::Invalid(result));
            }

            if let Some(prompt) = session.draft.confirmation(session.seed.as_ref()) {
                session.gate.open(prompt.clone(), ())?;
                return Ok(SubmitOutcome::AwaitingConfirmation(prompt));
            }

            self.prepare(&mut st)?
        };

        self.send(prepared).await.map(SubmitOutcome::Saved)
    }

    /// Proceed past the confirmation gate. Only the first call while the
    /// gate is open sends anything.
    pub async fn confirm(&self) -> Result<R::Entity, FormError> {
        let prepared = {
            let mut st = self.lock();
            let session = st.session.as_mut().ok_or(FormError::InvalidPhase {
                action: "confirm",
                phase: FormPhase::Closed.as_str(),
            })?;
            if session.gate.confirm().is_none() {
                return Err(match session.phase() {
                    FormPhase::Submitting => FormError::Busy,
                    phase => FormError::InvalidPhase {
                        action: "confirm",
                        phase: phase.as_str(),
                    },
                });
            }
            self.prepare(&mut st)?
        };

        self.send(prepared).await
    }

    /// Dismiss the confirmation gate; the draft is left exactly as it was.
    pub fn decline(&self) -> bool {
        self.lock()
            .session
            .as_mut()
            .is_some_and(|s| s.gate.cancel())
    }

    /// Build the payload and flip to `Submitting`. A payload failure is
    /// reported like a failed submission and leaves the form editable.
    fn prepare(&self, st: &mut FormState<D>) -> Result<Prepared<R::Payload>, FormError> {
        let Some(session) = st.session.as_mut() else {
            return Err(FormError::Closed);
        };
        match session.draft.to_payload() {
            Ok(payload) => {
                session.submitting = true;
                Ok(Prepared {
                    mode: session.mode,
                    id: session.target_id(),
                    payload,
                    token: session.token.clone(),
                })
            }
            Err(e) => {
                session.gate.settle(None);
                let err = FormError::from(e);
                tracing::error!(
                    resource = self.resource_name(),
                    error = %err,
                    "Failed to build submission payload",
                );
                st.last_error = Some(err.clone());
                self.notices.publish(Notice::error(err.user_message()));
                Err(err)
            }
        }
    }

    async fn send(&self, prepared: Prepared<R::Payload>) -> Result<R::Entity, FormError> {
        let Prepared {
            mode,
            id,
            payload,
            token,
        } = prepared;

        let mutation = match id {
            Some(id) => Mutation::Update {
                id,
                payload: &payload,
            },
            None => Mutation::Create(&payload),
        };

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!(resource = self.resource_name(), "Submission abandoned after close");
                return Err(FormError::Closed);
            }
            r = self.invoker.invoke(mutation) => r,
        };

        let mut st = self.lock();
        let same_session = st
            .session
            .as_ref()
            .is_some_and(|s| s.submitting && !s.token.is_cancelled());
        if token.is_cancelled() || !same_session {
            return Err(FormError::Closed);
        }

        match result {
            Ok(entity) => {
                if let Some(session) = st.session.take() {
                    session.token.cancel();
                }
                st.last_error = None;
                let verb = match mode {
                    FormMode::Create => "created",
                    FormMode::Edit => "updated",
                };
                self.notices
                    .publish(Notice::success(format!("{} {verb} successfully", D::LABEL)));
                Ok(entity)
            }
            Err(err) => {
                if let Some(session) = st.session.as_mut() {
                    session.submitting = false;
                    session.gate.settle(None);
                }
                st.last_error = Some(err.clone());
                self.notices.publish(Notice::error(err.user_message()));
                Err(err)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The open session, provided it is accepting edits.
fn editing_session<'a, D: Draft>(
    st: &'a mut FormState<D>,
    action: &'static str,
) -> Result<&'a mut Session<D>, FormError> {
    match st.session.as_mut() {
        Some(session) if session.phase() == FormPhase::Editing => Ok(session),
        Some(session) => Err(FormError::InvalidPhase {
            action,
            phase: session.phase().as_str(),
        }),
        None => Err(FormError::InvalidPhase {
            action,
            phase: FormPhase::Closed.as_str(),
        }),
    }
}

fn snapshot<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Top-level keys whose values differ between two serialized drafts.
fn changed_fields(before: &Value, after: &Value) -> Vec<String> {
    let (Some(before), Some(after)) = (before.as_object(), after.as_object()) else {
        return Vec::new();
    };
    before
        .keys()
        .chain(after.keys())
        .filter(|k| before.get(*k) != after.get(*k))
        .cloned()
        .collect()
}

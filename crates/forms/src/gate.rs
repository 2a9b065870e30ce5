//! Confirmation gate between "valid" and "sent" for irreversible actions.
//!
//! The gate yields its pending action exactly once. While that action is in
//! flight the confirm control stays disabled, so repeated clicks cannot
//! double-submit.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use campus_core::draft::ConfirmPrompt;
use campus_core::types::DbId;

use crate::error::FormError;
use crate::invoker::{Mutation, MutationInvoker};
use crate::notice::{Notice, NoticeBus};
use crate::resource::Resource;

#[derive(Debug)]
enum GateState<A> {
    Closed,
    Open { prompt: ConfirmPrompt, action: A },
    Proceeding { prompt: ConfirmPrompt },
}

/// A yes/no interstitial holding the action it guards.
#[derive(Debug)]
pub struct ConfirmationGate<A> {
    state: GateState<A>,
}

impl<A> ConfirmationGate<A> {
    pub fn new() -> Self {
        Self {
            state: GateState::Closed,
        }
    }

    /// Show the prompt. Fails with [`FormError::Busy`] while a previously
    /// confirmed action is still running.
    pub fn open(&mut self, prompt: ConfirmPrompt, action: A) -> Result<(), FormError> {
        if matches!(self.state, GateState::Proceeding { .. }) {
            return Err(FormError::Busy);
        }
        self.state = GateState::Open { prompt, action };
        Ok(())
    }

    pub fn prompt(&self) -> Option<&ConfirmPrompt> {
        match &self.state {
            GateState::Closed => None,
            GateState::Open { prompt, .. } | GateState::Proceeding { prompt } => Some(prompt),
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, GateState::Closed)
    }

    pub fn is_proceeding(&self) -> bool {
        matches!(self.state, GateState::Proceeding { .. })
    }

    /// Whether the confirm control should be clickable.
    pub fn confirm_enabled(&self) -> bool {
        matches!(self.state, GateState::Open { .. })
    }

    /// Take the guarded action. Returns `None` unless the gate is open and
    /// idle, so a second click yields nothing.
    pub fn confirm(&mut self) -> Option<A> {
        match std::mem::replace(&mut self.state, GateState::Closed) {
            GateState::Open { prompt, action } => {
                self.state = GateState::Proceeding { prompt };
                Some(action)
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Dismiss the prompt and drop the action. Has no effect while the
    /// confirmed action is running.
    pub fn cancel(&mut self) -> bool {
        match self.state {
            GateState::Open { .. } => {
                self.state = GateState::Closed;
                true
            }
            _ => false,
        }
    }

    /// Finish a confirmed action. Passing the action back re-opens the
    /// prompt so the user can retry; `None` closes the gate.
    pub fn settle(&mut self, retry: Option<A>) {
        self.state = match (std::mem::replace(&mut self.state, GateState::Closed), retry) {
            (GateState::Proceeding { prompt }, Some(action)) => GateState::Open { prompt, action },
            _ => GateState::Closed,
        };
    }
}

impl<A> Default for ConfirmationGate<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// A confirmation-gated update with no form behind it, such as a table-row
/// toggle that deactivates a quota.
pub struct GatedUpdate<R: Resource> {
    invoker: MutationInvoker<R>,
    notices: NoticeBus,
    gate: Mutex<ConfirmationGate<(DbId, R::Payload)>>,
    success_message: String,
}

impl<R: Resource> GatedUpdate<R> {
    /// Open a gate guarding `update(id, payload)`.
    pub fn open(
        resource: Arc<R>,
        notices: NoticeBus,
        prompt: ConfirmPrompt,
        id: DbId,
        payload: R::Payload,
    ) -> Self {
        let mut gate = ConfirmationGate::new();
        // A fresh gate is never proceeding.
        let _ = gate.open(prompt, (id, payload));
        Self {
            invoker: MutationInvoker::new(resource),
            notices,
            gate: Mutex::new(gate),
            success_message: "Changes saved".to_string(),
        }
    }

    pub fn with_success_message(mut self, message: impl Into<String>) -> Self {
        self.success_message = message.into();
        self
    }

    fn gate(&self) -> MutexGuard<'_, ConfirmationGate<(DbId, R::Payload)>> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn prompt(&self) -> Option<ConfirmPrompt> {
        self.gate().prompt().cloned()
    }

    pub fn is_open(&self) -> bool {
        self.gate().is_open()
    }

    pub fn confirm_enabled(&self) -> bool {
        self.gate().confirm_enabled() && !self.invoker.is_pending()
    }

    /// Confirm and send the update. Only the first call while the gate is
    /// open reaches the backend.
    pub async fn confirm(&self) -> Result<R::Entity, FormError> {
        let taken = {
            let mut gate = self.gate();
            if gate.is_proceeding() {
                return Err(FormError::Busy);
            }
            gate.confirm()
        };
        let Some((id, payload)) = taken else {
            return Err(FormError::InvalidPhase {
                action: "confirm",
                phase: "closed",
            });
        };

        let result = self
            .invoker
            .invoke(Mutation::Update {
                id,
                payload: &payload,
            })
            .await;

        match result {
            Ok(entity) => {
                self.gate().settle(None);
                self.notices.publish(Notice::success(self.success_message.clone()));
                Ok(entity)
            }
            Err(e) => {
                self.gate().settle(Some((id, payload)));
                self.notices.publish(Notice::error(e.user_message()));
                Err(e)
            }
        }
    }

    /// Dismiss without sending anything.
    pub fn cancel(&self) -> bool {
        let cancelled = self.gate().cancel();
        if cancelled {
            tracing::debug!(resource = self.invoker.resource().name(), "Gated update cancelled");
        }
        cancelled
    }
}

//! Mutation invoker: one create/update call at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use campus_core::draft::Record;
use campus_core::types::DbId;

use crate::error::FormError;
use crate::resource::Resource;

/// A single write against a backend collection.
#[derive(Debug)]
pub enum Mutation<'a, P> {
    Create(&'a P),
    Update { id: DbId, payload: &'a P },
}

impl<P> Mutation<'_, P> {
    fn kind(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Update { .. } => "update",
        }
    }
}

/// Wraps create/update calls on one resource and refuses to start a second
/// call while one is pending. Failures are returned as-is; there is no retry.
pub struct MutationInvoker<R: Resource> {
    resource: Arc<R>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when the call finishes or its future is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<R: Resource> MutationInvoker<R> {
    pub fn new(resource: Arc<R>) -> Self {
        Self {
            resource,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a call is currently pending. The UI disables its submit
    /// control while this is `true`.
    pub fn is_pending(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn resource(&self) -> &Arc<R> {
        &self.resource
    }

    /// Run one mutation and return the server's resulting entity.
    pub async fn invoke(&self, mutation: Mutation<'_, R::Payload>) -> Result<R::Entity, FormError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!(
                resource = self.resource.name(),
                kind = mutation.kind(),
                "Rejected mutation while another is in flight",
            );
            return Err(FormError::Busy);
        }
        let _guard = InFlight(&self.in_flight);

        let kind = mutation.kind();
        let started = Instant::now();
        let result = match mutation {
            Mutation::Create(payload) => self.resource.create(payload).await,
            Mutation::Update { id, payload } => self.resource.update(id, payload).await,
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(entity) => tracing::info!(
                resource = self.resource.name(),
                kind,
                id = entity.id(),
                elapsed_ms,
                "Mutation succeeded",
            ),
            Err(e) => tracing::warn!(
                resource = self.resource.name(),
                kind,
                elapsed_ms,
                error = %e,
                "Mutation failed",
            ),
        }

        result.map_err(FormError::from)
    }
}

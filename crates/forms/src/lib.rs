//! Form workflow engine.
//!
//! A [`ListView`](list::ListView) fetches a page from a [`Resource`], opens a
//! [`FormController`](controller::FormController) for create or edit, gates
//! irreversible writes behind a [`ConfirmationGate`](gate::ConfirmationGate)
//! and sends them through a [`MutationInvoker`](invoker::MutationInvoker).
//! Success and failure are published as notices on a
//! [`NoticeBus`](notice::NoticeBus).

pub mod controller;
pub mod error;
pub mod gate;
pub mod invoker;
pub mod list;
pub mod notice;
pub mod resource;

#[cfg(test)]
mod testing;

pub use controller::{FormController, FormPhase, SubmitOutcome};
pub use error::{ApiError, FormError};
pub use gate::{ConfirmationGate, GatedUpdate};
pub use invoker::{Mutation, MutationInvoker};
pub use list::{ListView, SortOrder};
pub use notice::{Notice, NoticeBus, NoticeLevel};
pub use resource::Resource;

//! Optimistic mutation layer for the provider portal.
//!
//! Applies speculative writes to a local collection before the hosted data
//! store has confirmed them, then reconciles once the remote call settles.
//!
//! # Protocol
//!
//! Every mutation ([`Coordinator::add`], [`Coordinator::update`],
//! [`Coordinator::delete`]) runs the same three steps:
//!
//! 1. **Apply**: the collection is changed in place and a pending-mutation
//!    record is opened for the affected key, before any I/O.
//! 2. **Call**: the caller's remote closure is invoked and its future is
//!    spawned on the tokio runtime.
//! 3. **Reconcile**: on success the authoritative value replaces the
//!    speculative one and the record is dropped; on failure the write is
//!    rolled back (per operation), the error is recorded, reported to the
//!    error callback and the [`Notifier`], and returned to the caller.
//!
//! Failed mutations stay on record until cleared ([`Coordinator::clear_error`])
//! or retried ([`Coordinator::retry`]).
//!
//! # Example
//!
//! ```no_run
//! use portal_model::{Entity, EntityPatch};
//! use portal_optimistic::memory::InMemoryStore;
//! use portal_optimistic::{Coordinator, CoordinatorConfig, RemoteStore};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryStore::new();
//! let patients = Coordinator::new(store.list().await?, CoordinatorConfig::default());
//!
//! let new_patient = Entity::new("patient", json!({"name": "Ada", "risk": "low"}));
//! let remote = store.clone();
//! let created = patients
//!     .add(new_patient.clone(), move || async move { remote.create(new_patient).await })
//!     .await?;
//!
//! let remote = store.clone();
//! let id = created.id.clone();
//! let patch = EntityPatch::new().set("risk", "high");
//! let sent = patch.clone();
//! patients
//!     .update(&created.id, patch, move || async move { remote.update(&id, sent).await })?
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod coordinator;
mod error;
mod event;
mod ids;
mod notify;
mod pending;
pub mod remote;

pub use config::{CoordinatorConfig, MIN_TEMP_ID_LEN};
pub use coordinator::{Coordinator, Settlement};
pub use error::{GENERIC_ERROR_MESSAGE, OptimisticError, OptimisticResult, RemoteError};
pub use event::{ChangeEvent, ChangeKind};
pub use ids::{TEMP_ID_PREFIX, is_temp_id, temp_id};
pub use notify::{Notification, Notifier, RecordingNotifier, TracingNotifier, Variant};
pub use pending::{MutationKind, PendingMutation, PendingMutations};
pub use remote::{RemoteStore, memory};

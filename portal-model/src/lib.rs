//! Record model for the provider portal.
//!
//! Defines the types the optimistic mutation layer is generic over:
//! - [`Record`] — anything with a string key field that can be stamped and
//!   shallow-merged with a partial update
//! - [`Entity`] — the portal's JSON-backed record (patients, appointments, messages)
//! - [`EntityPatch`] — a partial update to an [`Entity`]
//!
//! `serde_json::Value` also implements [`Record`], so callers holding raw
//! rows from the hosted data store can use them without wrapping.

mod entity;
mod record;

pub use entity::{Entity, EntityPatch};
pub use record::{DEFAULT_KEY_FIELD, Record};

//! Change events broadcast after every state transition.
//!
//! UI bindings subscribe to these instead of polling the coordinator.

use crate::pending::MutationKind;
use serde::{Deserialize, Serialize};

/// What happened to the collection or the pending map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "mutation", rename_all = "snake_case")]
pub enum ChangeKind {
    /// A speculative write was applied.
    Applied(MutationKind),
    /// The remote call succeeded and the authoritative value is in place.
    Committed(MutationKind),
    /// The remote call failed; the error is on record.
    Failed(MutationKind),
    /// A recorded error was cleared.
    ErrorCleared,
    /// A failed mutation was put back into flight.
    RetryStarted,
    /// A retried remote call succeeded.
    RetrySucceeded,
    /// The whole collection was replaced.
    Replaced,
}

/// A single state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Key the transition applies to. Empty for [`ChangeKind::Replaced`].
    pub id: String,
    pub kind: ChangeKind,
    /// Server-issued key that replaced a temporary key on a committed add.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_id: Option<String>,
}

impl ChangeEvent {
    pub fn new(id: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            resolved_id: None,
        }
    }

    pub(crate) fn committed_add(temp_id: impl Into<String>, resolved_id: Option<String>) -> Self {
        Self {
            id: temp_id.into(),
            kind: ChangeKind::Committed(MutationKind::Add),
            resolved_id,
        }
    }
}

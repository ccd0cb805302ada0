//! Pending-mutation bookkeeping.
//!
//! Tracks one record per key for every mutation that is in flight or has
//! failed, independently of the collection itself.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which operation produced a pending mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Add,
    Update,
    Delete,
}

/// Bookkeeping for one in-flight or failed mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMutation<R> {
    /// Key of the affected record (the temporary key for adds).
    pub id: String,
    pub kind: MutationKind,
    /// The speculative value for add/update, the removed original for delete.
    pub data: R,
    /// True while the remote operation is outstanding.
    pub pending: bool,
    /// Message of the last remote failure, if any.
    pub error: Option<String>,
}

impl<R> PendingMutation<R> {
    /// True once the remote call has settled with a failure that is still on record.
    pub fn is_failed(&self) -> bool {
        !self.pending && self.error.is_some()
    }
}

/// All pending mutations, keyed by record key.
#[derive(Debug, Clone)]
pub struct PendingMutations<R> {
    records: HashMap<String, PendingMutation<R>>,
}

impl<R> Default for PendingMutations<R> {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
        }
    }
}

impl<R: Clone> PendingMutations<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a mutation, replacing any earlier record for the key.
    pub fn begin(&mut self, id: impl Into<String>, kind: MutationKind, data: R) {
        let id = id.into();
        self.records.insert(
            id.clone(),
            PendingMutation {
                id,
                kind,
                data,
                pending: true,
                error: None,
            },
        );
    }

    /// Drops the record after a confirmed outcome.
    pub fn resolve(&mut self, id: &str) -> Option<PendingMutation<R>> {
        self.records.remove(id)
    }

    /// Marks the record as settled with a failure.
    ///
    /// A record that vanished in the meantime (for example, resolved by a
    /// later overlapping mutation on the same key) is left alone.
    pub fn fail(&mut self, id: &str, message: impl Into<String>) {
        if let Some(record) = self.records.get_mut(id) {
            record.pending = false;
            record.error = Some(message.into());
        }
    }

    /// Clears the error on a record without removing it.
    /// Returns true if an error was cleared.
    pub fn clear_error(&mut self, id: &str) -> bool {
        self.records
            .get_mut(id)
            .and_then(|record| record.error.take())
            .is_some()
    }

    /// Puts a failed record back into flight for a retry.
    /// Returns `None` if there is no failed record for the key.
    pub fn restart(&mut self, id: &str) -> Option<MutationKind> {
        let record = self.records.get_mut(id).filter(|r| r.error.is_some())?;
        record.pending = true;
        record.error = None;
        Some(record.kind)
    }

    pub fn get(&self, id: &str) -> Option<&PendingMutation<R>> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.records.get(id).is_some_and(|r| r.pending)
    }

    pub fn error(&self, id: &str) -> Option<&str> {
        self.records.get(id).and_then(|r| r.error.as_deref())
    }

    /// Keys with a remote call outstanding, sorted.
    pub fn pending_ids(&self) -> Vec<String> {
        self.sorted_ids(|r| r.pending)
    }

    /// Keys whose last remote call failed, sorted.
    pub fn failed_ids(&self) -> Vec<String> {
        self.sorted_ids(PendingMutation::is_failed)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingMutation<R>> {
        self.records.values()
    }

    fn sorted_ids(&self, keep: impl Fn(&PendingMutation<R>) -> bool) -> Vec<String> {
        let mut ids: Vec<String> = self
            .records
            .values()
            .filter(|r| keep(r))
            .map(|r| r.id.clone())
            .collect();
        ids.sort();
        ids
    }
}

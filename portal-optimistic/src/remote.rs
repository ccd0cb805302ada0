//! Remote record store abstraction.
//!
//! The portal's hosted data store is reached through this trait. The
//! coordinator itself never calls it; callers wrap store calls in the
//! closures they hand to [`Coordinator`](crate::Coordinator).

use crate::error::RemoteError;
use async_trait::async_trait;
use portal_model::Record;

/// CRUD access to a remote table of records.
#[async_trait]
pub trait RemoteStore<R: Record>: Send + Sync {
    /// Loads every record.
    async fn list(&self) -> Result<Vec<R>, RemoteError>;

    /// Persists a new record and returns it with its server-issued key.
    async fn create(&self, record: R) -> Result<R, RemoteError>;

    /// Applies a partial update and returns the stored result.
    async fn update(&self, id: &str, patch: R::Patch) -> Result<R, RemoteError>;

    /// Deletes a record.
    async fn delete(&self, id: &str) -> Result<(), RemoteError>;
}

/// An in-memory store for tests and the demo binary.
pub mod memory {
    use super::*;
    use portal_model::{DEFAULT_KEY_FIELD, Entity, EntityPatch};
    use std::collections::{HashSet, VecDeque};
    use std::sync::{Arc, Mutex, PoisonError};
    use std::time::Duration;
    use tracing::debug;

    #[derive(Debug, Default)]
    struct Inner {
        rows: VecDeque<Entity>,
        fail_next: usize,
        failing_ids: HashSet<String>,
        calls: usize,
    }

    /// A table of [`Entity`] rows held in memory.
    ///
    /// Keys are UUID v7 strings assigned on create. Failures can be injected
    /// for the next N calls or for specific keys, and every call can be
    /// delayed to simulate network latency.
    #[derive(Debug, Clone, Default)]
    pub struct InMemoryStore {
        inner: Arc<Mutex<Inner>>,
        latency: Option<Duration>,
    }

    impl InMemoryStore {
        /// Creates an empty store.
        pub fn new() -> Self {
            Self::default()
        }

        /// Creates a store holding `rows`. Rows without a key get one.
        pub fn with_rows(rows: impl IntoIterator<Item = Entity>) -> Self {
            let store = Self::new();
            {
                let mut inner = store.lock();
                for row in rows {
                    let row = if row.id.is_empty() {
                        row.with_key(DEFAULT_KEY_FIELD, &uuid::Uuid::now_v7().to_string())
                    } else {
                        row
                    };
                    inner.rows.push_back(row);
                }
            }
            store
        }

        /// Delays every call by `latency`.
        #[must_use]
        pub fn with_latency(mut self, latency: Duration) -> Self {
            self.latency = Some(latency);
            self
        }

        /// Makes the next `n` calls fail, whatever they are.
        pub fn fail_next(&self, n: usize) {
            self.lock().fail_next = n;
        }

        /// Makes every update and delete of `id` fail until [`Self::heal`].
        pub fn fail_id(&self, id: impl Into<String>) {
            self.lock().failing_ids.insert(id.into());
        }

        /// Clears all injected failures.
        pub fn heal(&self) {
            let mut inner = self.lock();
            inner.fail_next = 0;
            inner.failing_ids.clear();
        }

        /// Number of calls made so far, including failed ones.
        pub fn calls(&self) -> usize {
            self.lock().calls
        }

        /// Snapshot of the stored rows, newest first.
        pub fn rows(&self) -> Vec<Entity> {
            self.lock().rows.iter().cloned().collect()
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
            self.inner.lock().unwrap_or_else(PoisonError::into_inner)
        }

        async fn enter(&self, op: &str, id: Option<&str>) -> Result<(), RemoteError> {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            let mut inner = self.lock();
            inner.calls += 1;
            if inner.fail_next > 0 {
                inner.fail_next -= 1;
                debug!(op, "injected failure");
                return Err(RemoteError::new(format!("{op} failed: service unavailable")));
            }
            if let Some(id) = id {
                if inner.failing_ids.contains(id) {
                    debug!(op, id, "injected failure for key");
                    return Err(RemoteError::new(format!("{op} failed for {id}")));
                }
            }
            Ok(())
        }
    }

    #[async_trait]
    impl RemoteStore<Entity> for InMemoryStore {
        async fn list(&self) -> Result<Vec<Entity>, RemoteError> {
            self.enter("list", None).await?;
            Ok(self.rows())
        }

        async fn create(&self, record: Entity) -> Result<Entity, RemoteError> {
            self.enter("create", None).await?;
            let stored = record.with_key(DEFAULT_KEY_FIELD, &uuid::Uuid::now_v7().to_string());
            self.lock().rows.push_front(stored.clone());
            Ok(stored)
        }

        async fn update(&self, id: &str, patch: EntityPatch) -> Result<Entity, RemoteError> {
            self.enter("update", Some(id)).await?;
            let mut inner = self.lock();
            let row = inner
                .rows
                .iter_mut()
                .find(|row| row.id == id)
                .ok_or_else(|| RemoteError::new(format!("no row with id {id}")))?;
            *row = row.merged(&patch);
            Ok(row.clone())
        }

        async fn delete(&self, id: &str) -> Result<(), RemoteError> {
            self.enter("delete", Some(id)).await?;
            let mut inner = self.lock();
            let before = inner.rows.len();
            inner.rows.retain(|row| row.id != id);
            if inner.rows.len() == before {
                return Err(RemoteError::new(format!("no row with id {id}")));
            }
            Ok(())
        }
    }
}

//! Optimistic mutation coordinator.
//!
//! Holds an ordered collection of records and a map of pending mutations.
//! Every mutating call follows the same protocol: apply the speculative
//! write immediately, hand the remote call to the runtime, and reconcile
//! once it settles.
//!
//! Overlapping mutations on the same key are not serialized. Both
//! speculative writes land in order of issue, and both settlements are
//! applied in order of completion, so the last call to settle wins.

use crate::config::{CoordinatorConfig, MIN_TEMP_ID_LEN};
use crate::error::{OptimisticError, OptimisticResult, RemoteError};
use crate::event::{ChangeEvent, ChangeKind};
use crate::ids;
use crate::notify::{Notification, Notifier, TracingNotifier};
use crate::pending::{MutationKind, PendingMutation, PendingMutations};
use portal_model::Record;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Collisions tolerated at one temp key length before it grows.
const TEMP_ID_ATTEMPTS: usize = 8;

type SuccessCallback<R> = Arc<dyn Fn(&R) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&RemoteError) + Send + Sync>;

struct State<R> {
    items: Vec<R>,
    pending: PendingMutations<R>,
}

/// Coordinates speculative writes against a local collection.
///
/// Cloning is cheap and every clone shares the same state. Mutating calls
/// spawn their reconciliation on the ambient tokio runtime, so they must be
/// made from within one.
pub struct Coordinator<R: Record> {
    state: Arc<Mutex<State<R>>>,
    config: Arc<CoordinatorConfig>,
    notifier: Arc<dyn Notifier>,
    on_success: Option<SuccessCallback<R>>,
    on_error: Option<ErrorCallback>,
    events: broadcast::Sender<ChangeEvent>,
}

impl<R: Record> Clone for Coordinator<R> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            config: Arc::clone(&self.config),
            notifier: Arc::clone(&self.notifier),
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
            events: self.events.clone(),
        }
    }
}

/// The outcome of a mutation, resolved once its remote call settles.
///
/// Dropping a settlement does not cancel the remote call or its
/// reconciliation.
#[derive(Debug)]
pub struct Settlement<T> {
    id: String,
    handle: JoinHandle<OptimisticResult<T>>,
}

impl<T> Settlement<T> {
    /// Key the mutation was tracked under. For adds this is the temporary key.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the remote call has settled and reconciliation has run.
    pub fn is_settled(&self) -> bool {
        self.handle.is_finished()
    }
}

impl<T> Future for Settlement<T> {
    type Output = OptimisticResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(join_err)) => {
                Poll::Ready(Err(OptimisticError::TaskFailed(join_err.to_string())))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<R: Record> Coordinator<R> {
    /// Creates a coordinator over `initial`, which is kept in the given order.
    ///
    /// `temp_id_len` below [`MIN_TEMP_ID_LEN`] is raised to it. Use
    /// [`Coordinator::try_new`] to reject such a config instead.
    pub fn new(initial: Vec<R>, mut config: CoordinatorConfig) -> Self {
        config.temp_id_len = config.temp_id_len.max(MIN_TEMP_ID_LEN);
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            state: Arc::new(Mutex::new(State {
                items: initial,
                pending: PendingMutations::new(),
            })),
            config: Arc::new(config),
            notifier: Arc::new(TracingNotifier),
            on_success: None,
            on_error: None,
            events,
        }
    }

    /// Like [`Coordinator::new`], but fails on a config that does not validate.
    pub fn try_new(initial: Vec<R>, config: CoordinatorConfig) -> OptimisticResult<Self> {
        config.validate()?;
        Ok(Self::new(initial, config))
    }

    /// Sets the notification surface.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Called with the confirmed value after an add or update succeeds.
    #[must_use]
    pub fn on_success(mut self, callback: impl Fn(&R) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    /// Called with the failure after any remote call fails.
    #[must_use]
    pub fn on_error(mut self, callback: impl Fn(&RemoteError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn key_field(&self) -> &str {
        &self.config.key_field
    }

    /// Subscribes to change events. Events sent before subscribing are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    // ── Mutations ────────────────────────────────────────────────

    /// Adds `item` under a fresh temporary key, prepended to the collection.
    ///
    /// On success the temporary entry is replaced by the value the remote
    /// call returned, whatever key it carries. On failure the entry is
    /// removed and the error is recorded under the temporary key.
    pub fn add<F, Fut>(&self, item: R, remote: F) -> Settlement<R>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<R, RemoteError>> + Send + 'static,
    {
        let temp_id = {
            let mut state = self.lock();
            let temp_id = state.fresh_temp_id(&self.config);
            let stamped = item.with_key(&self.config.key_field, &temp_id);
            state.items.insert(0, stamped.clone());
            state.pending.begin(temp_id.clone(), MutationKind::Add, stamped);
            temp_id
        };
        debug!(key = %temp_id, "optimistic add applied");
        self.emit(ChangeEvent::new(&temp_id, ChangeKind::Applied(MutationKind::Add)));

        let call = remote();
        let this = self.clone();
        let id = temp_id.clone();
        let handle = tokio::spawn(async move {
            match call.await {
                Ok(confirmed) => {
                    this.commit_add(&id, &confirmed);
                    Ok(confirmed)
                }
                Err(err) => {
                    this.fail_add(&id, &err);
                    Err(OptimisticError::Remote(err))
                }
            }
        });
        Settlement { id: temp_id, handle }
    }

    /// Shallow-merges `patch` over the record at `id` and writes it in place.
    ///
    /// Returns `NotFound` without touching any state if `id` is absent.
    /// On failure the pre-mutation value is restored unless
    /// `revert_on_error` is off.
    pub fn update<F, Fut>(
        &self,
        id: &str,
        patch: R::Patch,
        remote: F,
    ) -> OptimisticResult<Settlement<R>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<R, RemoteError>> + Send + 'static,
    {
        let snapshot = {
            let mut state = self.lock();
            let index = state
                .position(&self.config.key_field, id)
                .ok_or_else(|| OptimisticError::NotFound(id.to_string()))?;
            let snapshot = state.items[index].clone();
            let speculative = snapshot.merged(&patch);
            state.items[index] = speculative.clone();
            state.pending.begin(id, MutationKind::Update, speculative);
            snapshot
        };
        debug!(key = %id, "optimistic update applied");
        self.emit(ChangeEvent::new(id, ChangeKind::Applied(MutationKind::Update)));

        let call = remote();
        let this = self.clone();
        let key = id.to_string();
        let handle = tokio::spawn(async move {
            match call.await {
                Ok(confirmed) => {
                    this.commit_update(&key, &confirmed);
                    Ok(confirmed)
                }
                Err(err) => {
                    this.fail_update(&key, snapshot, &err);
                    Err(OptimisticError::Remote(err))
                }
            }
        });
        Ok(Settlement {
            id: id.to_string(),
            handle,
        })
    }

    /// Removes the record at `id` from the collection.
    ///
    /// Returns `NotFound` without touching any state if `id` is absent.
    /// On failure the removed record is put back at the front of the
    /// collection; its original position is not kept.
    pub fn delete<F, Fut>(&self, id: &str, remote: F) -> OptimisticResult<Settlement<()>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), RemoteError>> + Send + 'static,
    {
        let original = {
            let mut state = self.lock();
            let index = state
                .position(&self.config.key_field, id)
                .ok_or_else(|| OptimisticError::NotFound(id.to_string()))?;
            let original = state.items.remove(index);
            state
                .pending
                .begin(id, MutationKind::Delete, original.clone());
            original
        };
        debug!(key = %id, "optimistic delete applied");
        self.emit(ChangeEvent::new(id, ChangeKind::Applied(MutationKind::Delete)));

        let call = remote();
        let this = self.clone();
        let key = id.to_string();
        let handle = tokio::spawn(async move {
            match call.await {
                Ok(()) => {
                    this.commit_delete(&key);
                    Ok(())
                }
                Err(err) => {
                    this.fail_delete(&key, original, &err);
                    Err(OptimisticError::Remote(err))
                }
            }
        });
        Ok(Settlement {
            id: id.to_string(),
            handle,
        })
    }

    /// Re-runs a remote call for a mutation whose last attempt failed.
    ///
    /// Only the bookkeeping is touched: the record goes back to pending, and
    /// is dropped on success or marked failed again on failure. The
    /// collection is left as the failed attempt left it; the speculative
    /// write is not re-applied.
    pub fn retry<T, F, Fut>(&self, id: &str, remote: F) -> OptimisticResult<Settlement<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>> + Send + 'static,
    {
        let kind = self
            .lock()
            .pending
            .restart(id)
            .ok_or_else(|| OptimisticError::NothingToRetry(id.to_string()))?;
        debug!(key = %id, ?kind, "retrying failed mutation");
        self.emit(ChangeEvent::new(id, ChangeKind::RetryStarted));

        let call = remote();
        let this = self.clone();
        let key = id.to_string();
        let handle = tokio::spawn(async move {
            match call.await {
                Ok(value) => {
                    this.commit_retry(&key);
                    Ok(value)
                }
                Err(err) => {
                    this.fail_retry(&key, kind, &err);
                    Err(OptimisticError::Remote(err))
                }
            }
        });
        Ok(Settlement {
            id: id.to_string(),
            handle,
        })
    }

    /// Clears the recorded error for `id`. The record itself stays.
    /// Returns true if there was an error to clear.
    pub fn clear_error(&self, id: &str) -> bool {
        let cleared = self.lock().pending.clear_error(id);
        if cleared {
            self.emit(ChangeEvent::new(id, ChangeKind::ErrorCleared));
        }
        cleared
    }

    /// Replaces the whole collection, e.g. after a fresh load from the store.
    /// Pending mutations are left as they are.
    pub fn set_items(&self, items: Vec<R>) {
        self.lock().items = items;
        self.emit(ChangeEvent::new(String::new(), ChangeKind::Replaced));
    }

    // ── Queries ──────────────────────────────────────────────────

    /// Snapshot of the collection, front first.
    pub fn items(&self) -> Vec<R> {
        self.lock().items.clone()
    }

    pub fn get(&self, id: &str) -> Option<R> {
        let state = self.lock();
        state
            .position(&self.config.key_field, id)
            .map(|i| state.items[i].clone())
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// True while a remote call for `id` is outstanding.
    pub fn is_pending(&self, id: &str) -> bool {
        self.lock().pending.is_pending(id)
    }

    /// Error message of the last failed remote call for `id`.
    pub fn get_error(&self, id: &str) -> Option<String> {
        self.lock().pending.error(id).map(str::to_string)
    }

    /// Snapshot of the pending-mutation record for `id`.
    pub fn mutation(&self, id: &str) -> Option<PendingMutation<R>> {
        self.lock().pending.get(id).cloned()
    }

    pub fn pending_ids(&self) -> Vec<String> {
        self.lock().pending.pending_ids()
    }

    pub fn failed_ids(&self) -> Vec<String> {
        self.lock().pending.failed_ids()
    }

    /// Snapshot of every pending-mutation record, sorted by key.
    pub fn mutations(&self) -> Vec<PendingMutation<R>> {
        let mut all: Vec<_> = self.lock().pending.iter().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    // ── Reconciliation ───────────────────────────────────────────

    fn commit_add(&self, temp_id: &str, confirmed: &R) {
        let resolved_id = confirmed.key(&self.config.key_field);
        {
            let mut state = self.lock();
            if let Some(index) = state.position(&self.config.key_field, temp_id) {
                state.items[index] = confirmed.clone();
            }
            state.pending.resolve(temp_id);
        }
        info!(key = %temp_id, resolved = ?resolved_id, "optimistic add committed");
        if let Some(cb) = &self.on_success {
            cb(confirmed);
        }
        self.emit(ChangeEvent::committed_add(temp_id, resolved_id));
    }

    fn fail_add(&self, temp_id: &str, err: &RemoteError) {
        {
            let mut state = self.lock();
            let key_field = &self.config.key_field;
            state
                .items
                .retain(|item| item.key(key_field).as_deref() != Some(temp_id));
            state.pending.fail(temp_id, err.message());
        }
        warn!(key = %temp_id, error = %err, "optimistic add rolled back");
        self.report_failure(err);
        self.emit(ChangeEvent::new(temp_id, ChangeKind::Failed(MutationKind::Add)));
    }

    fn commit_update(&self, id: &str, confirmed: &R) {
        {
            let mut state = self.lock();
            if let Some(index) = state.position(&self.config.key_field, id) {
                state.items[index] = confirmed.clone();
            }
            state.pending.resolve(id);
        }
        info!(key = %id, "optimistic update committed");
        if let Some(cb) = &self.on_success {
            cb(confirmed);
        }
        self.emit(ChangeEvent::new(id, ChangeKind::Committed(MutationKind::Update)));
    }

    fn fail_update(&self, id: &str, snapshot: R, err: &RemoteError) {
        let revert = self.config.revert_on_error;
        {
            let mut state = self.lock();
            if revert {
                if let Some(index) = state.position(&self.config.key_field, id) {
                    state.items[index] = snapshot;
                }
            }
            state.pending.fail(id, err.message());
        }
        warn!(key = %id, reverted = revert, error = %err, "optimistic update failed");
        self.report_failure(err);
        self.emit(ChangeEvent::new(id, ChangeKind::Failed(MutationKind::Update)));
    }

    fn commit_delete(&self, id: &str) {
        self.lock().pending.resolve(id);
        info!(key = %id, "optimistic delete committed");
        self.notifier.notify(Notification::success(
            &self.config.delete_success_title,
            &self.config.delete_success_description,
        ));
        self.emit(ChangeEvent::new(id, ChangeKind::Committed(MutationKind::Delete)));
    }

    fn fail_delete(&self, id: &str, original: R, err: &RemoteError) {
        {
            let mut state = self.lock();
            state.items.insert(0, original);
            state.pending.fail(id, err.message());
        }
        warn!(key = %id, error = %err, "optimistic delete rolled back");
        self.report_failure(err);
        self.emit(ChangeEvent::new(id, ChangeKind::Failed(MutationKind::Delete)));
    }

    fn commit_retry(&self, id: &str) {
        self.lock().pending.resolve(id);
        info!(key = %id, "retry succeeded");
        self.notifier.notify(Notification::success(
            &self.config.retry_success_title,
            format!("Changes to {id} were saved"),
        ));
        self.emit(ChangeEvent::new(id, ChangeKind::RetrySucceeded));
    }

    fn fail_retry(&self, id: &str, kind: MutationKind, err: &RemoteError) {
        self.lock().pending.fail(id, err.message());
        warn!(key = %id, ?kind, error = %err, "retry failed");
        self.report_failure(err);
        self.emit(ChangeEvent::new(id, ChangeKind::Failed(kind)));
    }

    fn report_failure(&self, err: &RemoteError) {
        if let Some(cb) = &self.on_error {
            cb(err);
        }
        self.notifier
            .notify(Notification::error(&self.config.error_title, err.message()));
    }

    fn emit(&self, event: ChangeEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, State<R>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R: Record> State<R> {
    fn position(&self, key_field: &str, id: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.key(key_field).as_deref() == Some(id))
    }

    /// Draws temp keys until one is free. Every run of collisions
    /// lengthens the key by one character, so a crowded key space cannot
    /// keep the lock held indefinitely.
    fn fresh_temp_id(&self, config: &CoordinatorConfig) -> String {
        let mut len = config.temp_id_len.max(1);
        loop {
            for _ in 0..TEMP_ID_ATTEMPTS {
                let id = ids::temp_id(len);
                if !self.pending.contains(&id) && self.position(&config.key_field, &id).is_none() {
                    return id;
                }
            }
            len += 1;
        }
    }
}

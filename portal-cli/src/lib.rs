//! Scripted session for the `portal-demo` binary.
//!
//! Seeds an in-memory patient table, drives one add, one update and one
//! delete through the coordinator, retries whatever failed once, and
//! reports the final state.

use anyhow::{Context, Result};
use portal_model::{Entity, EntityPatch, Record};
use portal_optimistic::memory::InMemoryStore;
use portal_optimistic::{
    Coordinator, CoordinatorConfig, MutationKind, Notification, PendingMutation,
    RecordingNotifier, RemoteStore,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Knobs for one session.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Number of remote calls to fail after the initial load.
    pub fail_next: usize,
    /// Delay added to every remote call.
    pub latency: Option<Duration>,
}

/// Final state of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub patients: Vec<Entity>,
    pub failed: Vec<PendingMutation<Entity>>,
    pub notifications: Vec<Notification>,
    pub store_rows: usize,
    pub remote_calls: usize,
}

/// The three patients every session starts with. Each carries an `mrn`
/// so the session also runs with `key_field = "mrn"`.
pub fn seed_patients() -> Vec<Entity> {
    vec![
        Entity::new(
            "patient",
            json!({"mrn": "MRN-1001", "name": "Ada Lovelace", "risk": "low"}),
        ),
        Entity::new(
            "patient",
            json!({"mrn": "MRN-1002", "name": "Grace Hopper", "risk": "medium"}),
        ),
        Entity::new(
            "patient",
            json!({"mrn": "MRN-1003", "name": "Alan Turing", "risk": "low"}),
        ),
    ]
}

fn new_patient() -> Entity {
    Entity::new(
        "patient",
        json!({"mrn": "MRN-1004", "name": "Marie Curie", "risk": "high"}),
    )
}

/// Coordinator key and store row id of one patient.
fn target(patient: &Entity, key_field: &str) -> Result<(String, String)> {
    let key = patient
        .key(key_field)
        .with_context(|| format!("patient {} has no `{key_field}` key", patient.id))?;
    Ok((key, patient.id.clone()))
}

/// Runs the scripted session.
pub async fn run_session(config: CoordinatorConfig, opts: &SessionOptions) -> Result<SessionReport> {
    let mut store = InMemoryStore::with_rows(seed_patients());
    if let Some(latency) = opts.latency {
        store = store.with_latency(latency);
    }
    let rows = store.list().await.context("initial load failed")?;
    info!(rows = rows.len(), "loaded patients");

    let notifier = RecordingNotifier::new();
    let coord = Coordinator::try_new(rows, config)
        .context("invalid coordinator config")?
        .with_notifier(Arc::new(notifier.clone()));
    store.fail_next(opts.fail_next);

    let items = coord.items();
    let (update_key, update_row, delete_key, delete_row) = match items.as_slice() {
        [_, second, third, ..] => {
            let (update_key, update_row) = target(second, coord.key_field())?;
            let (delete_key, delete_row) = target(third, coord.key_field())?;
            (update_key, update_row, delete_key, delete_row)
        }
        _ => anyhow::bail!("expected at least 3 seeded patients, found {}", items.len()),
    };

    let payload = new_patient();
    let remote = store.clone();
    let added = coord.add(payload.clone(), move || async move {
        remote.create(payload).await
    });

    let remote = store.clone();
    let patch = EntityPatch::new().set("risk", "high");
    let sent = patch.clone();
    let updated = coord.update(&update_key, patch, move || async move {
        remote.update(&update_row, sent).await
    })?;

    let remote = store.clone();
    let deleted =
        coord.delete(&delete_key, move || async move { remote.delete(&delete_row).await })?;

    info!(pending = coord.pending_ids().len(), "speculative writes applied");
    let (added, updated, deleted) = tokio::join!(added, updated, deleted);
    log_outcome("add", added.map(|_| ()));
    log_outcome("update", updated.map(|_| ()));
    log_outcome("delete", deleted);

    for failed in coord.failed_ids() {
        retry_once(&coord, &store, &failed).await;
    }

    Ok(SessionReport {
        patients: coord.items(),
        failed: coord.mutations(),
        notifications: notifier.notifications(),
        store_rows: store.rows().len(),
        remote_calls: store.calls(),
    })
}

async fn retry_once(coord: &Coordinator<Entity>, store: &InMemoryStore, id: &str) {
    let Some(record) = coord.mutation(id) else {
        return;
    };
    let remote = store.clone();
    let kind = record.kind;
    let row = record.data;
    let settlement = coord.retry(id, move || async move {
        match kind {
            // The recorded row carries the temp key; resend what the user entered.
            MutationKind::Add => remote.create(new_patient()).await.map(|_| ()),
            MutationKind::Update => {
                let patch = EntityPatch {
                    data: row.data.as_object().cloned().unwrap_or_default(),
                };
                remote.update(&row.id, patch).await.map(|_| ())
            }
            MutationKind::Delete => remote.delete(&row.id).await,
        }
    });
    match settlement {
        Ok(settlement) => log_outcome("retry", settlement.await),
        Err(e) => warn!(key = %id, error = %e, "retry not started"),
    }
}

fn log_outcome(op: &str, outcome: portal_optimistic::OptimisticResult<()>) {
    match outcome {
        Ok(()) => info!(op, "confirmed"),
        Err(e) => warn!(op, error = %e, "failed"),
    }
}

//! Shared test helpers for coordinator tests.

#![allow(dead_code)]

use futures::future::BoxFuture;
use portal_optimistic::{Coordinator, CoordinatorConfig, RecordingNotifier, RemoteError};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tokio::sync::oneshot;

/// A coordinator over `serde_json::Value` rows with a recording notifier.
pub fn coordinator(items: Vec<Value>) -> (Coordinator<Value>, RecordingNotifier) {
    coordinator_with(items, CoordinatorConfig::default())
}

pub fn coordinator_with(
    items: Vec<Value>,
    config: CoordinatorConfig,
) -> (Coordinator<Value>, RecordingNotifier) {
    let notifier = RecordingNotifier::new();
    let coord = Coordinator::new(items, config).with_notifier(Arc::new(notifier.clone()));
    (coord, notifier)
}

/// Three patient rows with ids "1", "2", "3".
pub fn three_patients() -> Vec<Value> {
    vec![
        json!({"id": "1", "name": "Ada", "risk": "low"}),
        json!({"id": "2", "name": "Grace", "risk": "medium"}),
        json!({"id": "3", "name": "Linus", "risk": "low"}),
    ]
}

/// Builds a patch from a JSON object literal.
pub fn patch(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("patch must be a JSON object")
}

/// Keys of the collection, front first.
pub fn ids(coord: &Coordinator<Value>) -> Vec<String> {
    coord
        .items()
        .iter()
        .map(|v| v["id"].as_str().unwrap_or_default().to_string())
        .collect()
}

/// A remote call that resolves when the returned sender fires.
pub fn gated<T: Send + 'static>() -> (
    oneshot::Sender<Result<T, RemoteError>>,
    impl FnOnce() -> BoxFuture<'static, Result<T, RemoteError>>,
) {
    let (tx, rx) = oneshot::channel();
    let call = move || -> BoxFuture<'static, Result<T, RemoteError>> {
        Box::pin(async move {
            rx.await
                .unwrap_or_else(|_| Err(RemoteError::new("gate dropped")))
        })
    };
    (tx, call)
}

/// Lets spawned reconciliation tasks run to completion.
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

/// A remote call that succeeds with `value`.
pub fn resolves<T: Send + 'static>(
    value: T,
) -> impl FnOnce() -> BoxFuture<'static, Result<T, RemoteError>> {
    move || -> BoxFuture<'static, Result<T, RemoteError>> { Box::pin(async move { Ok(value) }) }
}

/// A remote call that fails with `message`.
pub fn rejects<T: Send + 'static>(
    message: &str,
) -> impl FnOnce() -> BoxFuture<'static, Result<T, RemoteError>> {
    let err = RemoteError::new(message);
    move || -> BoxFuture<'static, Result<T, RemoteError>> { Box::pin(async move { Err(err) }) }
}

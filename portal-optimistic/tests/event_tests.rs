mod common;

use common::*;
use portal_optimistic::{ChangeEvent, ChangeKind, MutationKind, Notification, Variant};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::broadcast::error::TryRecvError;

fn drain(rx: &mut tokio::sync::broadcast::Receiver<ChangeEvent>) -> Vec<ChangeEvent> {
    let mut out = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => out.push(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return out,
            Err(TryRecvError::Lagged(_)) => continue,
        }
    }
}

#[tokio::test]
async fn add_emits_applied_then_committed_with_resolved_key() {
    let (coord, _) = coordinator(vec![]);
    let mut rx = coord.subscribe();

    let settlement = coord.add(json!({"name": "Mary"}), resolves(json!({"id": "42"})));
    let temp_id = settlement.id().to_string();
    settlement.await.unwrap();

    assert_eq!(
        drain(&mut rx),
        vec![
            ChangeEvent::new(&temp_id, ChangeKind::Applied(MutationKind::Add)),
            ChangeEvent {
                id: temp_id.clone(),
                kind: ChangeKind::Committed(MutationKind::Add),
                resolved_id: Some("42".to_string()),
            },
        ]
    );
}

#[tokio::test]
async fn failures_emit_failed() {
    let (coord, _) = coordinator(three_patients());
    let mut rx = coord.subscribe();

    coord
        .update("1", patch(json!({"risk": "high"})), rejects("boom"))
        .unwrap()
        .await
        .unwrap_err();
    coord.delete("2", rejects("boom")).unwrap().await.unwrap_err();
    coord.clear_error("2");

    let kinds: Vec<_> = drain(&mut rx).into_iter().map(|e| (e.id, e.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            ("1".to_string(), ChangeKind::Applied(MutationKind::Update)),
            ("1".to_string(), ChangeKind::Failed(MutationKind::Update)),
            ("2".to_string(), ChangeKind::Applied(MutationKind::Delete)),
            ("2".to_string(), ChangeKind::Failed(MutationKind::Delete)),
            ("2".to_string(), ChangeKind::ErrorCleared),
        ]
    );
}

#[tokio::test]
async fn not_found_emits_nothing() {
    let (coord, _) = coordinator(three_patients());
    let mut rx = coord.subscribe();

    let _ = coord.delete("missing", resolves(()));
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn set_items_emits_replaced() {
    let (coord, _) = coordinator(vec![]);
    let mut rx = coord.subscribe();

    coord.set_items(three_patients());

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, ChangeKind::Replaced);
    assert!(events[0].id.is_empty());
}

#[tokio::test]
async fn mutations_work_without_subscribers() {
    let (coord, _) = coordinator(three_patients());
    coord.delete("1", resolves(())).unwrap().await.unwrap();
    assert_eq!(coord.len(), 2);
}

#[test]
fn change_event_json_shape() {
    let event = ChangeEvent::new("1", ChangeKind::Failed(MutationKind::Update));
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(
        value,
        json!({"id": "1", "kind": {"type": "failed", "mutation": "update"}})
    );

    let cleared = serde_json::to_value(ChangeEvent::new("1", ChangeKind::ErrorCleared)).unwrap();
    assert_eq!(cleared, json!({"id": "1", "kind": {"type": "error_cleared"}}));
}

// ── Notifications ────────────────────────────────────────────────

#[tokio::test]
async fn notifications_follow_outcomes() {
    let (coord, notifier) = coordinator(three_patients());

    coord
        .update("1", patch(json!({"risk": "high"})), resolves(json!({"id": "1"})))
        .unwrap()
        .await
        .unwrap();
    assert!(
        notifier.notifications().is_empty(),
        "confirmed updates are silent"
    );

    coord.delete("2", resolves(())).unwrap().await.unwrap();
    coord.delete("3", rejects("locked")).unwrap().await.unwrap_err();

    assert_eq!(
        notifier.notifications(),
        vec![
            Notification::success("Deleted", "Item removed successfully"),
            Notification::error("Error", "locked"),
        ]
    );

    notifier.clear();
    assert!(notifier.notifications().is_empty());
}

#[tokio::test]
async fn notification_titles_come_from_config() {
    let config = portal_optimistic::CoordinatorConfig {
        error_title: "Could not save".into(),
        delete_success_title: "Patient removed".into(),
        ..Default::default()
    };
    let (coord, notifier) = coordinator_with(three_patients(), config);

    coord.delete("1", resolves(())).unwrap().await.unwrap();
    coord.delete("2", rejects("x")).unwrap().await.unwrap_err();

    let seen = notifier.notifications();
    assert_eq!(seen[0].title, "Patient removed");
    assert_eq!(seen[1].title, "Could not save");
    assert_eq!(seen[1].variant, Variant::Destructive);
}

#[test]
fn variant_serializes_lowercase() {
    let n = Notification::info("Heads up", "Sync paused");
    let value = serde_json::to_value(&n).unwrap();
    assert_eq!(
        value,
        json!({"title": "Heads up", "description": "Sync paused", "variant": "info"})
    );
    assert_eq!(Variant::default(), Variant::Default);
}

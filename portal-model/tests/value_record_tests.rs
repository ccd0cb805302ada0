use portal_model::Record;
use proptest::prelude::*;
use serde_json::{Map, Value, json};

#[test]
fn string_key_is_returned_verbatim() {
    let v = json!({"id": "42", "risk": "low"});
    assert_eq!(v.key("id"), Some("42".to_string()));
}

#[test]
fn numeric_key_is_stringified() {
    let v = json!({"id": 42});
    assert_eq!(v.key("id"), Some("42".to_string()));
}

#[test]
fn non_scalar_key_is_absent() {
    assert_eq!(json!({"id": null}).key("id"), None);
    assert_eq!(json!({"id": [1]}).key("id"), None);
    assert_eq!(json!("bare string").key("id"), None);
}

#[test]
fn with_key_on_non_object_builds_object() {
    let v = json!(7).with_key("id", "tmp-1");
    assert_eq!(v, json!({"id": "tmp-1"}));
}

#[test]
fn merged_overwrites_and_keeps() {
    let v = json!({"id": "1", "risk": "low", "name": "Ada"});
    let mut patch = Map::new();
    patch.insert("risk".into(), json!("high"));

    assert_eq!(
        v.merged(&patch),
        json!({"id": "1", "risk": "high", "name": "Ada"})
    );
}

fn small_object() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("[a-e]", any::<i32>(), 0..5).prop_map(|m| {
        m.into_iter()
            .map(|(k, v)| (k, Value::from(v)))
            .collect::<Map<String, Value>>()
    })
}

proptest! {
    #[test]
    fn merged_contains_every_patch_field(base in small_object(), patch in small_object()) {
        let merged = Value::Object(base.clone()).merged(&patch);
        for (k, v) in &patch {
            prop_assert_eq!(merged.get(k), Some(v));
        }
    }

    #[test]
    fn merged_keeps_unpatched_fields(base in small_object(), patch in small_object()) {
        let merged = Value::Object(base.clone()).merged(&patch);
        for (k, v) in &base {
            if !patch.contains_key(k) {
                prop_assert_eq!(merged.get(k), Some(v));
            }
        }
    }

    #[test]
    fn merge_with_empty_patch_is_identity(base in small_object()) {
        let v = Value::Object(base);
        prop_assert_eq!(v.merged(&Map::new()), v);
    }
}

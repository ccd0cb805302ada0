use serde_json::{Map, Value};

/// Name of the key field when none is configured.
pub const DEFAULT_KEY_FIELD: &str = "id";

/// A record held in an optimistically-updated collection.
///
/// The collection never looks inside a record except through this trait:
/// it reads the key field, stamps a temporary key onto new records, and
/// applies partial updates.
pub trait Record: Clone + Send + Sync + 'static {
    /// Partial update applied by [`Record::merged`].
    type Patch: Clone + Send + Sync + 'static;

    /// Returns the key field rendered as a string, or `None` if it is absent.
    fn key(&self, field: &str) -> Option<String>;

    /// Returns a copy with the key field set to `key`.
    fn with_key(&self, field: &str, key: &str) -> Self;

    /// Returns a copy with `patch` shallow-merged over this record.
    ///
    /// Top-level fields present in the patch replace the record's fields
    /// wholesale. Nested objects are not merged recursively.
    fn merged(&self, patch: &Self::Patch) -> Self;
}

/// Renders a JSON scalar as a key. Strings are used as-is, numbers are
/// stringified, everything else has no key.
pub(crate) fn key_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl Record for Value {
    type Patch = Map<String, Value>;

    fn key(&self, field: &str) -> Option<String> {
        self.get(field).and_then(key_from_value)
    }

    fn with_key(&self, field: &str, key: &str) -> Self {
        let mut out = match self {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        out.insert(field.to_string(), Value::String(key.to_string()));
        Value::Object(out)
    }

    fn merged(&self, patch: &Self::Patch) -> Self {
        let mut out = match self {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        for (k, v) in patch {
            out.insert(k.clone(), v.clone());
        }
        Value::Object(out)
    }
}

use crate::record::{DEFAULT_KEY_FIELD, Record, key_from_value};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A generic record shown in the portal.
///
/// Patient rows, appointments and messages all flow through this type.
/// The `data` field holds the row's JSON columns; `entity_type` names the
/// table it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub entity_type: String,
    pub data: Value,
    pub created_at: i64,
    pub modified_at: i64,
}

impl Entity {
    /// Creates an entity with an empty id and both timestamps set to now.
    /// The id is assigned later, either as a temporary id or by the store.
    pub fn new(entity_type: impl Into<String>, data: Value) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: String::new(),
            entity_type: entity_type.into(),
            data,
            created_at: now,
            modified_at: now,
        }
    }

    /// Extract a string value from `data` using a JSON pointer (e.g., "/name").
    pub fn get_str(&self, pointer: &str) -> Option<&str> {
        self.data.pointer(pointer).and_then(|v| v.as_str())
    }

    /// Extract a boolean value from `data` using a JSON pointer.
    pub fn get_bool(&self, pointer: &str) -> Option<bool> {
        self.data.pointer(pointer).and_then(|v| v.as_bool())
    }

    /// Extract a numeric value from `data` using a JSON pointer.
    pub fn get_number(&self, pointer: &str) -> Option<f64> {
        self.data.pointer(pointer).and_then(|v| v.as_f64())
    }
}

/// A partial update to an [`Entity`]'s `data` columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityPatch {
    pub data: Map<String, Value>,
}

impl EntityPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one column in the patch.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Record for Entity {
    type Patch = EntityPatch;

    fn key(&self, field: &str) -> Option<String> {
        if field == DEFAULT_KEY_FIELD {
            return (!self.id.is_empty()).then(|| self.id.clone());
        }
        self.data.get(field).and_then(key_from_value)
    }

    fn with_key(&self, field: &str, key: &str) -> Self {
        let mut out = self.clone();
        if field == DEFAULT_KEY_FIELD {
            out.id = key.to_string();
        } else {
            out.data = out.data.with_key(field, key);
        }
        out
    }

    fn merged(&self, patch: &Self::Patch) -> Self {
        let mut out = self.clone();
        out.data = out.data.merged(&patch.data);
        out.modified_at = chrono::Utc::now().timestamp_millis().max(self.modified_at);
        out
    }
}

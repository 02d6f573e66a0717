//! Documents as stored in a collection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field map of a document
pub type Fields = Map<String, Value>;

/// A single stored document
///
/// The id is assigned by the store on creation and never changes afterwards.
/// `create_time` and `update_time` are store metadata: they are not part of
/// the document's fields and are never exposed through the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl Document {
    /// Build a document stamped with the current time
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            fields,
            create_time: now,
            update_time: now,
        }
    }

    /// Read a single field
    pub fn get(&self, field: &str) -> Option<&Value> {
        if field == "id" {
            return None;
        }
        self.fields.get(field)
    }

    /// Set a single field; `id` cannot be overwritten
    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        let field = field.into();
        if field != "id" {
            self.fields.insert(field, value);
        }
    }

    /// The document as a JSON object: its fields plus `id`
    pub fn to_json(&self) -> Value {
        let mut obj = self.fields.clone();
        obj.insert("id".to_string(), Value::String(self.id.clone()));
        Value::Object(obj)
    }
}

/// Strip `id` from a payload so a write can never change a document's id
pub fn without_id(mut fields: Fields) -> Fields {
    fields.remove("id");
    fields
}

/// Interpret a JSON value as a field map
pub fn fields_from_value(value: Value) -> Option<Fields> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

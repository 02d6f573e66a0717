//! Entity descriptors and input shapes
//!
//! An [`EntityDescriptor`] is the static description of one collection's
//! document type. [`InputShape`]s describe the payloads accepted by the
//! create, edit and list operations and validate them before any resolver
//! runs.

use crate::core::error::{FieldError, ValidationError};
use crate::core::naming::{collection_name_for, uncap_first};
use serde_json::Value;

/// GraphQL-level kind of a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Id,
    String,
    Int,
    Float,
    Boolean,
    /// RFC 3339 timestamp, exposed as a string
    Timestamp,
    /// Arbitrary JSON, exposed as the `JSON` scalar
    Json,
    /// List of another kind
    List(Box<FieldKind>),
}

impl FieldKind {
    /// The GraphQL type name for this kind (without nullability)
    pub fn graphql_type(&self) -> String {
        match self {
            FieldKind::Id => "ID".to_string(),
            FieldKind::String | FieldKind::Timestamp => "String".to_string(),
            FieldKind::Int => "Int".to_string(),
            FieldKind::Float => "Float".to_string(),
            FieldKind::Boolean => "Boolean".to_string(),
            FieldKind::Json => "JSON".to_string(),
            FieldKind::List(inner) => format!("[{}]", inner.graphql_type()),
        }
    }

    /// Whether a JSON value is acceptable for this kind
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (FieldKind::Id, Value::String(_)) => true,
            (FieldKind::Id, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (FieldKind::String, Value::String(_)) => true,
            (FieldKind::Timestamp, Value::String(s)) => {
                chrono::DateTime::parse_from_rfc3339(s).is_ok()
            }
            (FieldKind::Int, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (FieldKind::Float, Value::Number(_)) => true,
            (FieldKind::Boolean, Value::Bool(_)) => true,
            (FieldKind::Json, _) => true,
            (FieldKind::List(inner), Value::Array(items)) => {
                items.iter().all(|item| inner.accepts(item))
            }
            _ => false,
        }
    }
}

/// One field of an entity or input shape
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub nullable: bool,
    pub description: Option<String>,
}

impl FieldDescriptor {
    /// A non-null field
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
            description: None,
        }
    }

    /// A nullable field
    pub fn optional(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: true,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Static description of one document collection
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    name: String,
    collection_name: String,
    fields: Vec<FieldDescriptor>,
    description: Option<String>,
}

impl EntityDescriptor {
    /// Describe an entity; the collection name defaults to the pluralized
    /// lower-camel entity name (`Widget` → `widgets`)
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let collection_name = collection_name_for(&name);
        Self {
            name,
            collection_name,
            fields: Vec::new(),
            description: None,
        }
    }

    pub fn with_collection_name(mut self, collection_name: impl Into<String>) -> Self {
        self.collection_name = collection_name.into();
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Entity (type) name, e.g. `Widget`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Collection the documents live in, e.g. `widgets`
    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// Declared fields, in declaration order (not including `id`)
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Lower-camel form of the entity name, e.g. `widget`
    pub fn singular_field_name(&self) -> String {
        uncap_first(&self.name)
    }

    /// Whether the entity declares a field with this name (`id` always exists)
    pub fn has_field(&self, name: &str) -> bool {
        name == "id" || self.fields.iter().any(|f| f.name == name)
    }
}

/// Named field set accepted by a create, edit or list operation
#[derive(Debug, Clone)]
pub struct InputShape {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl InputShape {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// The built-in list input: a single optional `limit`
    pub fn list_query() -> Self {
        Self::new("ListQueryInput").field(
            FieldDescriptor::optional("limit", FieldKind::Int)
                .with_description("The number of results to return"),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Copy of this shape with every field nullable, for partial edits
    pub fn as_partial(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: self
                .fields
                .iter()
                .cloned()
                .map(|mut f| {
                    f.nullable = true;
                    f
                })
                .collect(),
        }
    }

    /// Validate a payload against this shape
    ///
    /// Unknown fields, missing non-null fields and values of the wrong kind
    /// are all reported together.
    pub fn validate(&self, payload: &Value) -> Result<(), ValidationError> {
        let Some(obj) = payload.as_object() else {
            return Err(ValidationError::NotAnObject {
                shape: self.name.clone(),
            });
        };

        let mut errors = Vec::new();

        for key in obj.keys() {
            if !self.fields.iter().any(|f| &f.name == key) {
                errors.push(FieldError {
                    field: key.clone(),
                    message: "is not a field of this input".to_string(),
                });
            }
        }

        for field in &self.fields {
            match obj.get(&field.name) {
                None | Some(Value::Null) if !field.nullable => errors.push(FieldError {
                    field: field.name.clone(),
                    message: "is required".to_string(),
                }),
                Some(value) if !field.kind.accepts(value) => errors.push(FieldError {
                    field: field.name.clone(),
                    message: format!("expected {}", field.kind.graphql_type()),
                }),
                _ => {}
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::FieldErrors {
                shape: self.name.clone(),
                errors,
            })
        }
    }
}

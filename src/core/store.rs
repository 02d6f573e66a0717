//! The document-store port
//!
//! [`DocumentStore`] is the only outbound boundary of the crate. The
//! data-access facade translates every CRUD call into one of these methods;
//! any store client (Firestore, an in-memory map, ...) plugs in behind it.

use crate::core::document::{Document, Fields};
use crate::core::error::Result;
use crate::core::query::StoreQuery;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

const SERVER_TIMESTAMP_KEY: &str = "$serverTimestamp";

/// Sentinel value replaced by the store's commit time on create and merge
///
/// ```rust,ignore
/// let mut fields = Fields::new();
/// fields.insert("createdAt".into(), server_timestamp());
/// let log = logs.create(fields).await?;
/// assert!(log.fields["createdAt"].is_string());
/// ```
pub fn server_timestamp() -> Value {
    let mut sentinel = serde_json::Map::new();
    sentinel.insert(SERVER_TIMESTAMP_KEY.to_string(), Value::Bool(true));
    Value::Object(sentinel)
}

/// Whether a value is the [`server_timestamp`] sentinel
pub fn is_server_timestamp(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|obj| obj.len() == 1 && obj.get(SERVER_TIMESTAMP_KEY) == Some(&Value::Bool(true)))
}

/// Replace every top-level sentinel in `fields` with `now`
pub fn resolve_server_timestamps(fields: &mut Fields, now: DateTime<Utc>) {
    let stamp = Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true));
    for value in fields.values_mut() {
        if is_server_timestamp(value) {
            *value = stamp.clone();
        }
    }
}

/// A buffered write inside a transaction
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create a document; `id` is pre-allocated by the transaction
    Create { id: String, fields: Fields },
    /// Shallow-merge fields into an existing document
    Merge { id: String, fields: Fields },
    /// Delete an existing document
    Delete { id: String },
}

/// A document read inside a transaction
///
/// `update_time` is `None` when the document did not exist at read time; the
/// commit then requires it to still be absent.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadPrecondition {
    pub id: String,
    pub update_time: Option<DateTime<Utc>>,
}

/// Everything a transaction commits atomically
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    pub preconditions: Vec<ReadPrecondition>,
    pub writes: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Outbound document-store client
///
/// Implementations must be safe to share across tasks. Missing documents on
/// `merge` and `delete` are reported as
/// [`DocumentError::NotFound`](crate::core::error::DocumentError::NotFound).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name used in logs and errors
    fn backend_name(&self) -> &str;

    /// Allocate a fresh document id
    fn new_id(&self) -> String {
        new_document_id()
    }

    /// Fetch a document by id
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Run a filtered, ordered, limited query
    async fn query(&self, collection: &str, query: &StoreQuery) -> Result<Vec<Document>>;

    /// Persist a new document under a store-assigned id
    async fn create(&self, collection: &str, fields: Fields) -> Result<Document>;

    /// Shallow-merge fields into an existing document
    async fn merge(&self, collection: &str, id: &str, fields: Fields) -> Result<Document>;

    /// Remove an existing document
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Atomically verify preconditions and apply a batch of writes
    async fn commit(&self, collection: &str, batch: WriteBatch) -> Result<()>;
}

/// Generate a 20-character alphanumeric document id
pub fn new_document_id() -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let bytes = uuid::Uuid::new_v4().into_bytes();
    let extra = uuid::Uuid::new_v4().into_bytes();
    bytes
        .iter()
        .chain(extra.iter())
        .take(20)
        .map(|b| ALPHABET[(*b as usize) % ALPHABET.len()] as char)
        .collect()
}

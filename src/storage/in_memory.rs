//! In-memory implementation of DocumentStore for testing and development

use crate::core::document::{Document, Fields, without_id};
use crate::core::error::{DocGraphError, Result, StorageError};
use crate::core::query::StoreQuery;
use crate::core::store::{DocumentStore, WriteBatch, WriteOp, resolve_server_timestamps};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

type Collections = HashMap<String, IndexMap<String, Document>>;

const BACKEND: &str = "memory";

/// In-memory document store
///
/// Documents keep insertion order within a collection, which is the order
/// queries return when no explicit ordering is requested. Uses RwLock for
/// thread-safe access; clones share the same data.
#[derive(Clone)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<Collections>>,
    available: Arc<AtomicBool>,
}

impl InMemoryDocumentStore {
    /// Create a new, empty in-memory store
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Simulate an outage: while unavailable every call fails with
    /// [`StorageError::Unavailable`]
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of documents currently stored in a collection
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.get(collection).map_or(0, IndexMap::len))
            .unwrap_or(0)
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Unavailable {
                backend: BACKEND.to_string(),
            }
            .into())
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Collections>> {
        self.collections
            .read()
            .map_err(|e| lock_error(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Collections>> {
        self.collections
            .write()
            .map_err(|e| lock_error(format!("Failed to acquire write lock: {}", e)))
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_error(message: String) -> DocGraphError {
    StorageError::Backend {
        backend: BACKEND.to_string(),
        message,
    }
    .into()
}

/// A timestamp strictly after `previous`, so every write is observable
fn next_update_time(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::nanoseconds(1)
    }
}

fn insert_new(docs: &mut IndexMap<String, Document>, id: String, mut fields: Fields) -> Document {
    let now = Utc::now();
    resolve_server_timestamps(&mut fields, now);
    let doc = Document {
        id: id.clone(),
        fields: without_id(fields),
        create_time: now,
        update_time: now,
    };
    docs.insert(id, doc.clone());
    doc
}

fn merge_into(
    collection: &str,
    docs: &mut IndexMap<String, Document>,
    id: &str,
    mut fields: Fields,
) -> Result<Document> {
    let doc = docs
        .get_mut(id)
        .ok_or_else(|| DocGraphError::not_found(collection, id))?;

    let now = next_update_time(doc.update_time);
    resolve_server_timestamps(&mut fields, now);
    for (key, value) in without_id(fields) {
        doc.fields.insert(key, value);
    }
    doc.update_time = now;

    Ok(doc.clone())
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    fn backend_name(&self) -> &str {
        BACKEND
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.ensure_available()?;
        let collections = self.read()?;

        Ok(collections.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn query(&self, collection: &str, query: &StoreQuery) -> Result<Vec<Document>> {
        self.ensure_available()?;
        let collections = self.read()?;

        Ok(collections
            .get(collection)
            .map(|docs| query.apply(docs.values()))
            .unwrap_or_default())
    }

    async fn create(&self, collection: &str, fields: Fields) -> Result<Document> {
        self.ensure_available()?;
        let id = self.new_id();
        let mut collections = self.write()?;

        let docs = collections.entry(collection.to_string()).or_default();
        Ok(insert_new(docs, id, fields))
    }

    async fn merge(&self, collection: &str, id: &str, fields: Fields) -> Result<Document> {
        self.ensure_available()?;
        let mut collections = self.write()?;

        let docs = collections
            .get_mut(collection)
            .ok_or_else(|| DocGraphError::not_found(collection, id))?;
        merge_into(collection, docs, id, fields)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.ensure_available()?;
        let mut collections = self.write()?;

        collections
            .get_mut(collection)
            .and_then(|docs| docs.shift_remove(id))
            .map(|_| ())
            .ok_or_else(|| DocGraphError::not_found(collection, id))
    }

    async fn commit(&self, collection: &str, batch: WriteBatch) -> Result<()> {
        self.ensure_available()?;
        let mut collections = self.write()?;

        let current = collections.get(collection);
        for precondition in &batch.preconditions {
            let actual = current
                .and_then(|docs| docs.get(&precondition.id))
                .map(|doc| doc.update_time);
            if actual != precondition.update_time {
                return Err(StorageError::TransactionConflict {
                    collection: collection.to_string(),
                    id: precondition.id.clone(),
                }
                .into());
            }
        }

        // Apply to a copy so a failing write leaves the collection untouched
        let mut docs = current.cloned().unwrap_or_default();
        for write in batch.writes {
            match write {
                WriteOp::Create { id, fields } => {
                    insert_new(&mut docs, id, fields);
                }
                WriteOp::Merge { id, fields } => {
                    merge_into(collection, &mut docs, &id, fields)?;
                }
                WriteOp::Delete { id } => {
                    docs.shift_remove(&id)
                        .ok_or_else(|| DocGraphError::not_found(collection, &id))?;
                }
            }
        }
        collections.insert(collection.to_string(), docs);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::document::fields_from_value;
    use crate::core::query::{Filter, FilterOp, OrderBy};
    use crate::core::store::{ReadPrecondition, server_timestamp};
    use serde_json::{Value, json};

    fn fields(value: Value) -> Fields {
        fields_from_value(value).expect("object")
    }

    #[tokio::test]
    async fn test_create_assigns_id() {
        let store = InMemoryDocumentStore::new();
        let doc = store
            .create("widgets", fields(json!({"name": "bolt"})))
            .await
            .unwrap();

        assert_eq!(doc.id.len(), 20);
        assert_eq!(doc.fields["name"], "bolt");
        assert_eq!(store.count("widgets"), 1);
    }

    #[tokio::test]
    async fn test_create_ignores_id_in_payload() {
        let store = InMemoryDocumentStore::new();
        let doc = store
            .create("widgets", fields(json!({"id": "mine", "name": "bolt"})))
            .await
            .unwrap();

        assert_ne!(doc.id, "mine");
        assert!(!doc.fields.contains_key("id"));
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let store = InMemoryDocumentStore::new();
        assert!(store.get("widgets", "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_merge_updates_fields() {
        let store = InMemoryDocumentStore::new();
        let doc = store
            .create("widgets", fields(json!({"name": "bolt", "size": 1})))
            .await
            .unwrap();

        let merged = store
            .merge("widgets", &doc.id, fields(json!({"size": 2})))
            .await
            .unwrap();

        assert_eq!(merged.fields["name"], "bolt");
        assert_eq!(merged.fields["size"], 2);
        assert!(merged.update_time > doc.update_time);
        assert_eq!(merged.create_time, doc.create_time);
    }

    #[tokio::test]
    async fn test_merge_missing_is_not_found() {
        let store = InMemoryDocumentStore::new();
        let err = store
            .merge("widgets", "nope", fields(json!({"size": 2})))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_removes_and_reports_missing() {
        let store = InMemoryDocumentStore::new();
        let doc = store
            .create("widgets", fields(json!({"name": "bolt"})))
            .await
            .unwrap();

        store.delete("widgets", &doc.id).await.unwrap();
        assert!(store.get("widgets", &doc.id).await.unwrap().is_none());

        let err = store.delete("widgets", &doc.id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_query_filters_and_orders() {
        let store = InMemoryDocumentStore::new();
        for size in [3, 1, 2, 5] {
            store
                .create("widgets", fields(json!({"size": size})))
                .await
                .unwrap();
        }

        let docs = store
            .query(
                "widgets",
                &StoreQuery {
                    filters: vec![Filter::new("size", FilterOp::LessThan, 5)],
                    order_by: Some(OrderBy::ascending("size")),
                    limit: Some(2),
                },
            )
            .await
            .unwrap();

        let sizes: Vec<&Value> = docs.iter().map(|d| &d.fields["size"]).collect();
        assert_eq!(sizes, vec![&json!(1), &json!(2)]);
    }

    #[tokio::test]
    async fn test_query_keeps_insertion_order() {
        let store = InMemoryDocumentStore::new();
        for name in ["c", "a", "b"] {
            store
                .create("widgets", fields(json!({"name": name})))
                .await
                .unwrap();
        }
        let first = store
            .query("widgets", &StoreQuery::default())
            .await
            .unwrap()
            .remove(0);
        store.delete("widgets", &first.id).await.unwrap();

        let names: Vec<String> = store
            .query("widgets", &StoreQuery::default())
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.fields["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_server_timestamp_resolved_on_create() {
        let store = InMemoryDocumentStore::new();
        let doc = store
            .create("logs", fields(json!({"createdAt": server_timestamp()})))
            .await
            .unwrap();
        assert!(doc.fields["createdAt"].is_string());
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let store = InMemoryDocumentStore::new();
        store.set_available(false);

        let err = store.get("widgets", "x").await.unwrap_err();
        assert_eq!(err.error_code(), "STORAGE_UNAVAILABLE");
        assert!(store.create("widgets", Fields::new()).await.is_err());

        store.set_available(true);
        assert!(store.get("widgets", "x").await.is_ok());
    }

    #[tokio::test]
    async fn test_commit_applies_writes_atomically() {
        let store = InMemoryDocumentStore::new();
        let doc = store
            .create("widgets", fields(json!({"stock": 1})))
            .await
            .unwrap();

        let batch = WriteBatch {
            preconditions: vec![ReadPrecondition {
                id: doc.id.clone(),
                update_time: Some(doc.update_time),
            }],
            writes: vec![
                WriteOp::Merge {
                    id: doc.id.clone(),
                    fields: fields(json!({"stock": 0})),
                },
                WriteOp::Create {
                    id: "order1".to_string(),
                    fields: fields(json!({"widget": doc.id.clone()})),
                },
            ],
        };
        store.commit("widgets", batch).await.unwrap();

        let updated = store.get("widgets", &doc.id).await.unwrap().unwrap();
        assert_eq!(updated.fields["stock"], 0);
        assert!(store.get("widgets", "order1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_commit_rejects_stale_read() {
        let store = InMemoryDocumentStore::new();
        let doc = store
            .create("widgets", fields(json!({"stock": 1})))
            .await
            .unwrap();
        store
            .merge("widgets", &doc.id, fields(json!({"stock": 5})))
            .await
            .unwrap();

        let batch = WriteBatch {
            preconditions: vec![ReadPrecondition {
                id: doc.id.clone(),
                update_time: Some(doc.update_time),
            }],
            writes: vec![WriteOp::Merge {
                id: doc.id.clone(),
                fields: fields(json!({"stock": 0})),
            }],
        };
        let err = store.commit("widgets", batch).await.unwrap_err();
        assert_eq!(err.error_code(), "TRANSACTION_CONFLICT");

        let current = store.get("widgets", &doc.id).await.unwrap().unwrap();
        assert_eq!(current.fields["stock"], 5);
    }

    #[tokio::test]
    async fn test_commit_failing_write_leaves_collection_untouched() {
        let store = InMemoryDocumentStore::new();
        let doc = store
            .create("widgets", fields(json!({"stock": 1})))
            .await
            .unwrap();

        let batch = WriteBatch {
            preconditions: vec![],
            writes: vec![
                WriteOp::Merge {
                    id: doc.id.clone(),
                    fields: fields(json!({"stock": 0})),
                },
                WriteOp::Delete {
                    id: "missing".to_string(),
                },
            ],
        };
        assert!(store.commit("widgets", batch).await.unwrap_err().is_not_found());

        let current = store.get("widgets", &doc.id).await.unwrap().unwrap();
        assert_eq!(current.fields["stock"], 1);
    }
}

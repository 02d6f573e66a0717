//! Data-access facade over a single collection
//!
//! [`Collection`] is the only thing resolvers and hooks talk to. It is built
//! from an explicitly injected store handle, so tests and several stores can
//! coexist in one process.

use crate::core::document::{Document, Fields, without_id};
use crate::core::error::{DocGraphError, Result};
use crate::core::query::{DEFAULT_LIST_LIMIT, Filter, FilterOp, OrderBy, StoreQuery};
use crate::core::store::{DocumentStore, ReadPrecondition, WriteBatch, WriteOp};
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;

/// Handle on one collection of a [`DocumentStore`]
#[derive(Clone)]
pub struct Collection {
    store: Arc<dyn DocumentStore>,
    name: String,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("backend", &self.store.backend_name())
            .finish()
    }
}

impl Collection {
    pub fn new(store: Arc<dyn DocumentStore>, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
        }
    }

    /// Name of the underlying collection
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The store this collection reads from and writes to
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Fetch a document by id; `None` when it does not exist
    pub async fn find(&self, id: &str) -> Result<Option<Document>> {
        tracing::debug!(collection = %self.name, id, "find");
        self.store.get(&self.name, id).await
    }

    /// Fetch up to `limit` documents in store order
    pub async fn list(&self, limit: Option<usize>) -> Result<Vec<Document>> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
        tracing::debug!(collection = %self.name, limit, "list");
        self.store
            .query(
                &self.name,
                &StoreQuery {
                    limit: Some(limit),
                    ..Default::default()
                },
            )
            .await
    }

    /// Persist a new document; the store assigns its id
    pub async fn create(&self, fields: Fields) -> Result<Document> {
        let doc = self.store.create(&self.name, without_id(fields)).await?;
        tracing::debug!(collection = %self.name, id = %doc.id, "created document");
        Ok(doc)
    }

    /// Merge fields into an existing document
    ///
    /// An `id` key in the payload is ignored.
    pub async fn update(&self, id: &str, fields: Fields) -> Result<Document> {
        let doc = self.store.merge(&self.name, id, without_id(fields)).await?;
        tracing::debug!(collection = %self.name, id, "updated document");
        Ok(doc)
    }

    /// Delete a document and return its last state
    pub async fn delete(&self, id: &str) -> Result<Document> {
        let snapshot = self
            .find(id)
            .await?
            .ok_or_else(|| DocGraphError::not_found(&self.name, id))?;
        self.remove(id).await?;
        Ok(snapshot)
    }

    /// Delete a document without reading it first
    pub async fn remove(&self, id: &str) -> Result<()> {
        self.store.delete(&self.name, id).await?;
        tracing::debug!(collection = %self.name, id, "deleted document");
        Ok(())
    }

    pub fn where_equal_to(&self, field: &str, value: impl Into<Value>) -> QueryBuilder {
        self.query().where_equal_to(field, value)
    }

    pub fn where_greater_than(&self, field: &str, value: impl Into<Value>) -> QueryBuilder {
        self.query().where_greater_than(field, value)
    }

    pub fn where_less_than(&self, field: &str, value: impl Into<Value>) -> QueryBuilder {
        self.query().where_less_than(field, value)
    }

    pub fn where_less_or_equal_than(&self, field: &str, value: impl Into<Value>) -> QueryBuilder {
        self.query().where_less_or_equal_than(field, value)
    }

    pub fn where_array_contains(&self, field: &str, value: impl Into<Value>) -> QueryBuilder {
        self.query().where_array_contains(field, value)
    }

    pub fn order_by_ascending(&self, field: &str) -> QueryBuilder {
        self.query().order_by_ascending(field)
    }

    pub fn order_by_descending(&self, field: &str) -> QueryBuilder {
        self.query().order_by_descending(field)
    }

    pub fn limit(&self, limit: usize) -> QueryBuilder {
        self.query().limit(limit)
    }

    /// Run a prepared list of predicates
    pub async fn execute(
        &self,
        filters: Vec<Filter>,
        limit: Option<usize>,
        order_by: Option<OrderBy>,
    ) -> Result<Vec<Document>> {
        let query = StoreQuery {
            filters,
            order_by,
            limit,
        };
        tracing::debug!(collection = %self.name, filters = query.filters.len(), "execute query");
        self.store.query(&self.name, &query).await
    }

    /// Run `executor` inside a transaction
    ///
    /// Reads made through the [`Transaction`] become commit preconditions and
    /// writes are buffered. Everything is committed atomically once the
    /// executor returns `Ok`; an `Err` discards the buffered writes. A read
    /// document that changed in the meantime aborts the commit with
    /// [`StorageError::TransactionConflict`](crate::core::error::StorageError::TransactionConflict).
    ///
    /// ```rust,ignore
    /// let stock = widgets
    ///     .run_transaction(|tx| {
    ///         Box::pin(async move {
    ///             let widget = tx.get("abc").await?.ok_or_else(|| DocGraphError::not_found("widgets", "abc"))?;
    ///             let stock = widget.fields["stock"].as_i64().unwrap_or(0) - 1;
    ///             tx.update("abc", fields_from_value(json!({"stock": stock})).unwrap_or_default());
    ///             Ok(stock)
    ///         })
    ///     })
    ///     .await?;
    /// ```
    pub async fn run_transaction<T, F>(&self, executor: F) -> Result<T>
    where
        F: for<'t> FnOnce(&'t mut Transaction) -> BoxFuture<'t, Result<T>>,
    {
        let mut tx = Transaction::new(self.store.clone(), self.name.clone());
        let value = executor(&mut tx).await?;

        let batch = tx.into_batch();
        if !batch.is_empty() {
            tracing::debug!(
                collection = %self.name,
                writes = batch.writes.len(),
                reads = batch.preconditions.len(),
                "commit transaction"
            );
            self.store.commit(&self.name, batch).await?;
        }
        Ok(value)
    }

    fn query(&self) -> QueryBuilder {
        QueryBuilder {
            collection: self.clone(),
            query: StoreQuery::default(),
        }
    }
}

/// Chained query over a [`Collection`]; filters combine conjunctively
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    collection: Collection,
    query: StoreQuery,
}

impl QueryBuilder {
    fn filter(mut self, field: &str, op: FilterOp, value: impl Into<Value>) -> Self {
        self.query.filters.push(Filter::new(field, op, value));
        self
    }

    pub fn where_equal_to(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Equal, value)
    }

    pub fn where_greater_than(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::GreaterThan, value)
    }

    pub fn where_less_than(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::LessThan, value)
    }

    pub fn where_less_or_equal_than(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::LessOrEqual, value)
    }

    pub fn where_array_contains(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::ArrayContains, value)
    }

    pub fn order_by_ascending(mut self, field: &str) -> Self {
        self.query.order_by = Some(OrderBy::ascending(field));
        self
    }

    pub fn order_by_descending(mut self, field: &str) -> Self {
        self.query.order_by = Some(OrderBy::descending(field));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// The query built so far
    pub fn as_query(&self) -> &StoreQuery {
        &self.query
    }

    /// Run the query
    pub async fn find(self) -> Result<Vec<Document>> {
        let StoreQuery {
            filters,
            limit,
            order_by,
        } = self.query;
        self.collection.execute(filters, limit, order_by).await
    }

    /// Run the query and keep only the first match
    pub async fn find_one(self) -> Result<Option<Document>> {
        Ok(self.limit(1).find().await?.into_iter().next())
    }
}

/// Read-then-write unit of work handed to a transaction executor
pub struct Transaction {
    store: Arc<dyn DocumentStore>,
    collection: String,
    batch: WriteBatch,
}

impl Transaction {
    fn new(store: Arc<dyn DocumentStore>, collection: String) -> Self {
        Self {
            store,
            collection,
            batch: WriteBatch::default(),
        }
    }

    /// Read a document and pin its current version for the commit
    pub async fn get(&mut self, id: &str) -> Result<Option<Document>> {
        let doc = self.store.get(&self.collection, id).await?;
        if !self.batch.preconditions.iter().any(|p| p.id == id) {
            self.batch.preconditions.push(ReadPrecondition {
                id: id.to_string(),
                update_time: doc.as_ref().map(|d| d.update_time),
            });
        }
        Ok(doc)
    }

    /// Buffer a create; returns the id the document will get
    pub fn create(&mut self, fields: Fields) -> String {
        let id = self.store.new_id();
        self.batch.writes.push(WriteOp::Create {
            id: id.clone(),
            fields: without_id(fields),
        });
        id
    }

    /// Buffer a merge into an existing document
    pub fn update(&mut self, id: &str, fields: Fields) {
        self.batch.writes.push(WriteOp::Merge {
            id: id.to_string(),
            fields: without_id(fields),
        });
    }

    /// Buffer a delete
    pub fn delete(&mut self, id: &str) {
        self.batch.writes.push(WriteOp::Delete { id: id.to_string() });
    }

    fn into_batch(self) -> WriteBatch {
        self.batch
    }
}

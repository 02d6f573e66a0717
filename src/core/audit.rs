//! Audit trail of executed root fields

use crate::core::document::Fields;
use crate::core::error::Result;
use crate::core::facade::Collection;
use crate::core::resolver::RootType;
use crate::core::store::{DocumentStore, server_timestamp};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Collection the [`DocumentAuditSink`] writes to by default
pub const DEFAULT_LOG_COLLECTION: &str = "logs";

/// One completed query or mutation field
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub referrer: Option<String>,
    pub operation_type: RootType,
    pub name: String,
    /// Request variables, serialized as JSON
    pub input: String,
    /// Field result, serialized as JSON
    pub output: String,
    pub resolve_time_ms: u64,
}

impl AuditRecord {
    /// Fields persisted for this record, with a server-assigned `createdAt`
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert(
            "referrer".to_string(),
            self.referrer.clone().map_or(Value::Null, Value::String),
        );
        fields.insert("type".to_string(), Value::String(self.operation_type.to_string()));
        fields.insert("name".to_string(), Value::String(self.name.clone()));
        fields.insert("input".to_string(), Value::String(self.input.clone()));
        fields.insert("output".to_string(), Value::String(self.output.clone()));
        fields.insert("resolveTime".to_string(), Value::from(self.resolve_time_ms));
        fields.insert("createdAt".to_string(), server_timestamp());
        fields
    }
}

/// Receives a record after every completed root field
///
/// Failures are logged by the caller and never fail the request.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: &AuditRecord) -> Result<()>;
}

/// Sink that only emits a tracing event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<()> {
        tracing::info!(
            referrer = record.referrer.as_deref().unwrap_or(""),
            "{}.{} [{} ms]",
            record.operation_type,
            record.name,
            record.resolve_time_ms
        );
        Ok(())
    }
}

/// Sink persisting every record as a document
pub struct DocumentAuditSink {
    logs: Collection,
}

impl DocumentAuditSink {
    /// Write into the `logs` collection of `store`
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_collection(store, DEFAULT_LOG_COLLECTION)
    }

    pub fn with_collection(store: Arc<dyn DocumentStore>, collection: &str) -> Self {
        Self {
            logs: Collection::new(store, collection),
        }
    }
}

#[async_trait]
impl AuditSink for DocumentAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<()> {
        let log = self.logs.create(record.to_fields()).await?;
        tracing::info!(
            "{} - {}.{} [{} ms]",
            log.id,
            record.operation_type,
            record.name,
            record.resolve_time_ms
        );
        Ok(())
    }
}

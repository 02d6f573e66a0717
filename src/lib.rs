//! # docgraph
//!
//! Generic CRUD resolvers for document collections, exposed over GraphQL.
//!
//! ## Features
//!
//! - **Resolver factory**: one entity configuration yields find, list, add,
//!   edit and delete operations with conventional names
//! - **Lifecycle hooks**: before/after hooks per operation, with veto and
//!   replacement semantics
//! - **Per-operation authorization**: role lists checked by a pluggable
//!   [`AuthChecker`](core::auth::AuthChecker)
//! - **Audit trail**: every resolved root field is recorded with its timing
//! - **Document store seam**: an in-memory store ships with the crate
//! - **Schema emission**: the generated SDL can be written at startup
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docgraph::prelude::*;
//!
//! let widget = EntityDescriptor::new("Widget")
//!     .field(FieldDescriptor::required("name", FieldKind::String));
//! let input = InputShape::new("WidgetInput")
//!     .field(FieldDescriptor::required("name", FieldKind::String));
//!
//! ServerBuilder::new()
//!     .with_store(InMemoryDocumentStore::new())
//!     .register(ResolverConfig::new(widget).with_input(input))
//!     .serve("127.0.0.1:4000")
//!     .await?;
//! ```

pub mod config;
pub mod core;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        audit::{AuditRecord, AuditSink, DocumentAuditSink, TracingAuditSink},
        auth::{AllowAll, AuthChecker, Claims, RequestContext, RoleAuthChecker, StaticTokenVerifier, TokenVerifier},
        descriptor::{EntityDescriptor, FieldDescriptor, FieldKind, InputShape},
        document::{Document, Fields},
        error::{DocGraphError, Result as DocGraphResult},
        facade::{Collection, QueryBuilder, Transaction},
        hooks::{HookContext, HookOutcome, Hooks},
        query::{ListInput, StoreQuery},
        resolver::{CrudResolver, OperationKind, Outcome, ResolverConfig, ResolverFactory, ResolverRegistry},
        store::{DocumentStore, server_timestamp},
    };

    // === Storage ===
    pub use crate::storage::InMemoryDocumentStore;

    // === Config ===
    pub use crate::config::AppConfig;

    // === Server ===
    pub use crate::server::{ServerBuilder, ServerHost};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use futures::future::{BoxFuture, FutureExt};
    pub use serde_json::{Value, json};

    // === Axum ===
    pub use axum::{Router, routing::get};
}

//! Core module containing the document model, the resolver factory and its
//! collaborators

pub mod audit;
pub mod auth;
pub mod descriptor;
pub mod document;
pub mod error;
pub mod facade;
pub mod hooks;
pub mod naming;
pub mod query;
pub mod resolver;
pub mod store;

pub use audit::{AuditRecord, AuditSink, DocumentAuditSink, TracingAuditSink};
pub use auth::{AllowAll, AuthChecker, Claims, RequestContext, RoleAuthChecker, StaticTokenVerifier, TokenVerifier};
pub use descriptor::{EntityDescriptor, FieldDescriptor, FieldKind, InputShape};
pub use document::{Document, Fields};
pub use error::{DocGraphError, Result};
pub use facade::{Collection, QueryBuilder, Transaction};
pub use hooks::{HookContext, HookOutcome, Hooks, Interface};
pub use naming::Pluralizer;
pub use query::{Direction, Filter, FilterOp, ListInput, OrderBy, StoreQuery};
pub use resolver::{
    CrudResolver, OperationKind, OperationSpec, Outcome, ResolvedConfig, ResolverConfig,
    ResolverFactory, ResolverRegistry, ResolverShape, RootType,
};
pub use store::{DocumentStore, WriteBatch, WriteOp, server_timestamp};

//! Server host for transport-agnostic API exposure
//!
//! `ServerHost` holds everything needed to serve the generated operations:
//! the injected store, the resolver registry, the auth and audit
//! collaborators and the application configuration. Exposures (GraphQL,
//! health routes) only ever read from it.

use crate::config::AppConfig;
use crate::core::audit::AuditSink;
use crate::core::auth::AuthChecker;
use crate::core::resolver::{CrudResolver, ResolverRegistry};
use crate::core::store::DocumentStore;
use std::sync::Arc;

/// Host context containing all framework state
///
/// # Example
///
/// ```rust,ignore
/// let host = Arc::new(builder.build_host()?);
/// let graphql_app = GraphQLExposure::build_router(host.clone())?;
/// let health_app = RestExposure::build_router(host, vec![])?;
/// ```
pub struct ServerHost {
    /// Application configuration
    pub config: Arc<AppConfig>,

    /// Store every resolver and the audit sink write to
    pub store: Arc<dyn DocumentStore>,

    /// Generated operations, indexed by name
    pub resolvers: Arc<ResolverRegistry>,

    /// Authorization collaborator
    pub auth: Arc<dyn AuthChecker>,

    /// Audit collaborator
    pub audit: Arc<dyn AuditSink>,
}

impl ServerHost {
    /// Build the host from builder components
    pub fn from_builder_components(
        config: AppConfig,
        store: Arc<dyn DocumentStore>,
        resolvers: ResolverRegistry,
        auth: Arc<dyn AuthChecker>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            resolvers: Arc::new(resolvers),
            auth,
            audit,
        }
    }

    /// Entity type names registered in the host
    pub fn entity_types(&self) -> Vec<&str> {
        self.resolvers
            .resolvers()
            .iter()
            .map(|r| r.config().descriptor().name())
            .collect()
    }

    /// Resolver of one entity
    pub fn resolver(&self, entity: &str) -> Option<&CrudResolver> {
        self.resolvers.by_entity(entity)
    }

    /// Whether at least one resolver is registered
    pub fn is_ready(&self) -> bool {
        !self.resolvers.is_empty()
    }
}

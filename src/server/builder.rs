//! ServerBuilder for fluent API to build HTTP servers

use super::exposure::{GraphQLExposure, RestExposure};
use super::host::ServerHost;
use crate::config::AppConfig;
use crate::core::audit::{AuditSink, DocumentAuditSink, TracingAuditSink};
use crate::core::auth::{AllowAll, AuthChecker};
use crate::core::resolver::{ResolverConfig, ResolverFactory, ResolverRegistry};
use crate::core::store::DocumentStore;
use crate::server::exposure::graphql::SchemaGenerator;
use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Builder for creating the GraphQL server
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_store(InMemoryDocumentStore::new())
///     .register(ResolverConfig::new(widget).with_input(widget_input))
///     .build()?;
/// ```
pub struct ServerBuilder {
    store: Option<Arc<dyn DocumentStore>>,
    configs: Vec<ResolverConfig>,
    auth: Option<Arc<dyn AuthChecker>>,
    audit: Option<Arc<dyn AuditSink>>,
    document_audit: bool,
    config: AppConfig,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder
    pub fn new() -> Self {
        Self {
            store: None,
            configs: Vec::new(),
            auth: None,
            audit: None,
            document_audit: false,
            config: AppConfig::default(),
            custom_routes: Vec::new(),
        }
    }

    /// Set the document store (required)
    pub fn with_store(mut self, store: impl DocumentStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Set an already shared document store
    pub fn with_shared_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Register an entity's resolver configuration
    ///
    /// Configurations are resolved in `build_host`, so invalid or clashing
    /// names surface there.
    pub fn register(mut self, config: ResolverConfig) -> Self {
        self.configs.push(config);
        self
    }

    /// Set the authorization collaborator (defaults to [`AllowAll`])
    pub fn with_auth_checker(mut self, auth: impl AuthChecker + 'static) -> Self {
        self.auth = Some(Arc::new(auth));
        self
    }

    /// Set the audit collaborator (defaults to [`TracingAuditSink`])
    pub fn with_audit_sink(mut self, audit: impl AuditSink + 'static) -> Self {
        self.audit = Some(Arc::new(audit));
        self.document_audit = false;
        self
    }

    /// Persist audit records into the store's `logs` collection
    pub fn with_document_audit(mut self) -> Self {
        self.audit = None;
        self.document_audit = true;
        self
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Add custom routes to the server
    ///
    /// Use this for endpoints outside the generated API, for example a
    /// hand-written list query for an entity registered with
    /// `with_custom_list_query`.
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Build the transport-agnostic host
    ///
    /// Resolves every registered configuration, binds it to the store and
    /// writes the SDL to disk when `graphql.schema.emit` is set.
    pub fn build_host(mut self) -> Result<ServerHost> {
        let store = self
            .store
            .take()
            .ok_or_else(|| anyhow::anyhow!("DocumentStore is required. Call .with_store()"))?;

        let factory = ResolverFactory::new(store.clone());
        let mut registry = ResolverRegistry::new();
        for config in self.configs {
            let entity = config.descriptor().name().to_string();
            let resolver = factory
                .create(config)
                .with_context(|| format!("Invalid resolver configuration for '{}'", entity))?;
            registry
                .register(resolver)
                .with_context(|| format!("Cannot register resolver for '{}'", entity))?;
        }

        let auth = self.auth.unwrap_or_else(|| Arc::new(AllowAll));
        let audit: Arc<dyn AuditSink> = match (self.audit, self.document_audit) {
            (Some(audit), _) => audit,
            (None, true) => Arc::new(DocumentAuditSink::new(store.clone())),
            (None, false) => Arc::new(TracingAuditSink),
        };

        let host = ServerHost::from_builder_components(self.config, store, registry, auth, audit);

        if host.config.graphql.schema.emit {
            let path = host.config.graphql.schema.path.clone();
            SchemaGenerator::new(&host.resolvers)
                .emit(&path)
                .with_context(|| format!("Failed to emit schema to {}", path.display()))?;
            tracing::info!("Schema written to {}", path.display());
        }

        Ok(host)
    }

    /// Build the final router
    ///
    /// This generates:
    /// - `POST /graphql`, `GET /graphql/playground`, `GET /graphql/schema`
    /// - health routes
    /// - custom routes
    pub fn build(mut self) -> Result<Router> {
        let custom_routes = std::mem::take(&mut self.custom_routes);
        let host = Arc::new(self.build_host()?);

        let app = RestExposure::build_router(host.clone(), custom_routes)?
            .merge(GraphQLExposure::build_router(host)?)
            .layer(TraceLayer::new_for_http());
        Ok(app)
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to the provided address
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    ///
    /// # Example
    ///
    /// ```ignore
    /// ServerBuilder::new()
    ///     .with_store(store)
    ///     .register(config)
    ///     .serve("127.0.0.1:4000").await?;
    /// ```
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::descriptor::{EntityDescriptor, FieldDescriptor, FieldKind, InputShape};
    use crate::core::resolver::OperationKind;
    use crate::storage::InMemoryDocumentStore;

    fn widget() -> ResolverConfig {
        ResolverConfig::new(
            EntityDescriptor::new("Widget").field(FieldDescriptor::required("name", FieldKind::String)),
        )
        .with_input(InputShape::new("WidgetInput").field(FieldDescriptor::required("name", FieldKind::String)))
    }

    // ── build_host ──────────────────────────────────────────────────────

    #[test]
    fn test_build_host_without_store_fails() {
        let result = ServerBuilder::new().register(widget()).build_host();
        let err = result.err().expect("store is required");
        assert!(err.to_string().contains("DocumentStore is required"));
    }

    #[test]
    fn test_build_host_registers_resolvers() {
        let host = ServerBuilder::new()
            .with_store(InMemoryDocumentStore::new())
            .register(widget())
            .build_host()
            .expect("valid builder");

        assert_eq!(host.entity_types(), vec!["Widget"]);
        assert!(host.resolvers.lookup("addWidget").is_ok());
    }

    #[test]
    fn test_build_host_rejects_clashing_names() {
        let clash = ResolverConfig::new(EntityDescriptor::new("Gadget"))
            .with_name(OperationKind::Find, "widget");
        let err = ServerBuilder::new()
            .with_store(InMemoryDocumentStore::new())
            .register(widget())
            .register(clash)
            .build_host()
            .err()
            .expect("duplicate name");
        assert!(err.to_string().contains("Gadget"));
    }

    #[test]
    fn test_build_host_emits_schema() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("schema.graphql");
        let mut config = AppConfig::default();
        config.graphql.schema.emit = true;
        config.graphql.schema.path = path.clone();

        ServerBuilder::new()
            .with_store(InMemoryDocumentStore::new())
            .with_config(config)
            .register(widget())
            .build_host()
            .expect("valid builder");

        let sdl = std::fs::read_to_string(path).expect("schema written");
        assert!(sdl.contains("type Widget"));
        assert!(sdl.contains("addWidget(data: WidgetInput!): Widget"));
    }

    #[test]
    fn test_build_router() {
        let result = ServerBuilder::new()
            .with_store(InMemoryDocumentStore::new())
            .with_document_audit()
            .with_custom_routes(Router::new())
            .register(widget())
            .build();
        assert!(result.is_ok());
    }
}

//! Widget catalogue served over GraphQL
//!
//! This demo shows:
//! - An entity with a create input and a partial edit input
//! - A before-write hook that stamps documents
//! - A before-delete hook that vetoes deleting locked widgets
//! - Role checks on mutations with a static token table
//! - Audit records persisted to the `logs` collection
//!
//! ```sh
//! DOCGRAPH_ENV=local cargo run --example widget_server
//! ```

use docgraph::config::ENV_VAR;
use docgraph::prelude::*;
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn widget_config() -> ResolverConfig {
    let widget = EntityDescriptor::new("Widget")
        .with_description("An item in the catalogue")
        .field(FieldDescriptor::required("name", FieldKind::String))
        .field(FieldDescriptor::optional("size", FieldKind::Int))
        .field(FieldDescriptor::optional("locked", FieldKind::Boolean))
        .field(FieldDescriptor::optional("slug", FieldKind::String));

    let input = InputShape::new("WidgetInput")
        .field(FieldDescriptor::required("name", FieldKind::String))
        .field(FieldDescriptor::optional("size", FieldKind::Int))
        .field(FieldDescriptor::optional("locked", FieldKind::Boolean));

    let hooks = Hooks::new()
        .on_before_write(|mut data, _ctx| async move {
            if let Some(name) = data.get("name").and_then(Value::as_str) {
                let slug = name.to_lowercase().replace(' ', "-");
                data.insert("slug".to_string(), json!(slug));
            }
            data.insert("updatedAt".to_string(), server_timestamp());
            Ok(HookOutcome::Continue(data))
        })
        .on_before_delete(|doc, _ctx| async move {
            if doc.get("locked") == Some(&Value::Bool(true)) {
                tracing::info!(id = %doc.id, "refusing to delete locked widget");
                return Ok(HookOutcome::Veto);
            }
            Ok(HookOutcome::Continue(()))
        });

    ResolverConfig::new(widget)
        .with_edit_input(input.as_partial("WidgetEditInput"))
        .with_input(input)
        .with_hooks(hooks)
        .authorize(OperationKind::Add, ["editor", "admin"])
        .authorize(OperationKind::Edit, ["editor", "admin"])
        .authorize(OperationKind::Delete, ["admin"])
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = if Path::new("docgraph.yaml").exists() {
        AppConfig::from_yaml_file("docgraph.yaml")?
    } else {
        AppConfig::default()
    }
    .with_env_override(std::env::var(ENV_VAR).ok());
    config.validate()?;

    let tokens = StaticTokenVerifier::new()
        .with_token(
            "editor-token",
            Claims {
                uid: "ed".to_string(),
                role: Some("editor".to_string()),
            },
        )
        .with_token(
            "admin-token",
            Claims {
                uid: "root".to_string(),
                role: Some("admin".to_string()),
            },
        );

    let addr = format!("0.0.0.0:{}", config.graphql.port);
    tracing::info!(env = %config.env, "starting widget server");
    tracing::info!("Playground: http://{}/graphql/playground", addr);

    ServerBuilder::new()
        .with_store(InMemoryDocumentStore::new())
        .with_config(config)
        .with_auth_checker(RoleAuthChecker::new(tokens))
        .with_document_audit()
        .register(widget_config())
        .serve(&addr)
        .await
}

//! Core GraphQL executor orchestration

use graphql_parser::query::{
    Definition, Document, Field, OperationDefinition, Selection, parse_query,
};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Instant;

use super::field_resolver::{Fragments, Projection};
use super::utils::{field_arguments, resolve_variables, response_key, should_include};
use crate::core::audit::AuditRecord;
use crate::core::auth::RequestContext;
use crate::core::error::{AuthError, DocGraphError, GraphQLError};
use crate::core::hooks::HookContext;
use crate::core::resolver::RootType;
use crate::server::host::ServerHost;

/// GraphQL executor dispatching root fields to the generated operations
pub struct GraphQLExecutor {
    host: Arc<ServerHost>,
}

/// An error attached to one root field
struct FieldFailure {
    key: String,
    line: usize,
    column: usize,
    error: DocGraphError,
}

impl FieldFailure {
    fn to_json(&self) -> Value {
        json!({
            "message": self.error.to_string(),
            "locations": [{ "line": self.line, "column": self.column }],
            "path": [self.key],
            "extensions": { "code": self.error.error_code() },
        })
    }
}

pub(crate) fn request_error(error: DocGraphError) -> Value {
    json!({
        "data": null,
        "errors": [{
            "message": error.to_string(),
            "extensions": { "code": error.error_code() },
        }],
    })
}

impl GraphQLExecutor {
    /// Create a new executor with the given host
    pub fn new(host: Arc<ServerHost>) -> Self {
        Self { host }
    }

    /// Execute a GraphQL document and return the response as JSON
    ///
    /// The response always has a `data` member; failures of individual root
    /// fields are listed under `errors` with their `path` while the field
    /// itself resolves to `null`.
    pub async fn execute(
        &self,
        query: &str,
        variables: Option<Map<String, Value>>,
        operation_name: Option<&str>,
        ctx: &RequestContext,
    ) -> Value {
        let doc = match parse_query::<String>(query) {
            Ok(doc) => doc,
            Err(e) => {
                return request_error(
                    GraphQLError::Parse {
                        message: e.to_string(),
                    }
                    .into(),
                );
            }
        };

        match self
            .execute_document(&doc, variables.unwrap_or_default(), operation_name, ctx)
            .await
        {
            Ok(response) => response,
            Err(e) => request_error(e),
        }
    }

    async fn execute_document(
        &self,
        doc: &Document<'_, String>,
        variables: Map<String, Value>,
        operation_name: Option<&str>,
        ctx: &RequestContext,
    ) -> Result<Value, DocGraphError> {
        let fragments: Fragments = doc
            .definitions
            .iter()
            .filter_map(|def| match def {
                Definition::Fragment(f) => Some((f.name.as_str(), f)),
                Definition::Operation(_) => None,
            })
            .collect();

        let operation = select_operation(doc, operation_name)?;

        let (root, definitions, selections) = match operation {
            OperationDefinition::Query(q) => (
                RootType::Query,
                q.variable_definitions.as_slice(),
                q.selection_set.items.as_slice(),
            ),
            OperationDefinition::Mutation(m) => (
                RootType::Mutation,
                m.variable_definitions.as_slice(),
                m.selection_set.items.as_slice(),
            ),
            OperationDefinition::SelectionSet(s) => (RootType::Query, &[][..], s.items.as_slice()),
            OperationDefinition::Subscription(_) => {
                return Err(GraphQLError::Execution {
                    message: "Subscriptions are not supported".to_string(),
                }
                .into());
            }
        };

        let variables = resolve_variables(definitions, variables)?;
        let projection = Projection {
            fragments: &fragments,
            variables: &variables,
        };

        let mut fields = Vec::new();
        collect_root_fields(selections, &fragments, &variables, &mut fields);

        let mut data = Map::new();
        let mut errors = Vec::new();

        // Root fields run one after another; mutations must stay in order
        for field in fields {
            let key = response_key(field).to_string();
            if field.name == "__typename" {
                data.insert(key, Value::String(root.to_string()));
                continue;
            }

            match self
                .resolve_root_field(root, field, &variables, &projection, ctx)
                .await
            {
                Ok(value) => {
                    data.insert(key, value);
                }
                Err(error) => {
                    tracing::debug!(field = %field.name, error = %error, "root field failed");
                    errors.push(FieldFailure {
                        key: key.clone(),
                        line: field.position.line,
                        column: field.position.column,
                        error,
                    });
                    data.insert(key, Value::Null);
                }
            }
        }

        let mut response = Map::new();
        response.insert("data".to_string(), Value::Object(data));
        if !errors.is_empty() {
            response.insert(
                "errors".to_string(),
                Value::Array(errors.iter().map(FieldFailure::to_json).collect()),
            );
        }
        Ok(Value::Object(response))
    }

    /// Authorize, run, audit and project one root field
    async fn resolve_root_field(
        &self,
        root: RootType,
        field: &Field<'_, String>,
        variables: &Map<String, Value>,
        projection: &Projection<'_, '_, '_>,
        ctx: &RequestContext,
    ) -> Result<Value, DocGraphError> {
        let (resolver, spec) = self.host.resolvers.lookup(&field.name).map_err(|_| {
            GraphQLError::Execution {
                message: format!("Cannot query field '{}' on type '{}'", field.name, root),
            }
        })?;
        if spec.root != root {
            return Err(GraphQLError::Execution {
                message: format!("Cannot query field '{}' on type '{}'", field.name, root),
            }
            .into());
        }

        if let Some(roles) = &spec.roles {
            if !self.host.auth.check(ctx, roles).await? {
                return Err(AuthError::Forbidden {
                    operation: spec.name.clone(),
                }
                .into());
            }
        }

        let args = field_arguments(field, variables);
        let start = Instant::now();
        let raw = resolver
            .dispatch(spec.kind, &args, &HookContext::graphql())
            .await?;
        let resolve_time_ms = start.elapsed().as_millis() as u64;

        let value = projection.project(
            raw,
            &field.selection_set.items,
            resolver.config().descriptor().name(),
        );

        self.audit(root, &spec.name, &args, &value, resolve_time_ms, ctx)
            .await;

        Ok(value)
    }

    async fn audit(
        &self,
        root: RootType,
        name: &str,
        args: &Map<String, Value>,
        output: &Value,
        resolve_time_ms: u64,
        ctx: &RequestContext,
    ) {
        let record = AuditRecord {
            referrer: ctx.referrer.clone(),
            operation_type: root,
            name: name.to_string(),
            input: Value::Object(args.clone()).to_string(),
            output: output.to_string(),
            resolve_time_ms,
        };
        if let Err(e) = self.host.audit.record(&record).await {
            tracing::warn!(operation = name, error = %e, "Error creating audit log");
        }
    }
}

/// Pick the operation to run
fn select_operation<'d, 'a>(
    doc: &'d Document<'a, String>,
    operation_name: Option<&str>,
) -> Result<&'d OperationDefinition<'a, String>, GraphQLError> {
    let mut operations = doc.definitions.iter().filter_map(|def| match def {
        Definition::Operation(op) => Some(op),
        Definition::Fragment(_) => None,
    });

    match operation_name {
        Some(wanted) => operations
            .find(|op| operation_name_of(op) == Some(wanted))
            .ok_or_else(|| GraphQLError::Execution {
                message: format!("Unknown operation named '{}'", wanted),
            }),
        None => {
            let first = operations.next().ok_or_else(|| GraphQLError::Execution {
                message: "No operation found in query".to_string(),
            })?;
            if operations.next().is_some() {
                return Err(GraphQLError::Execution {
                    message: "Must provide operation name if query contains multiple operations"
                        .to_string(),
                });
            }
            Ok(first)
        }
    }
}

fn operation_name_of<'d>(op: &'d OperationDefinition<'_, String>) -> Option<&'d str> {
    match op {
        OperationDefinition::Query(q) => q.name.as_deref(),
        OperationDefinition::Mutation(m) => m.name.as_deref(),
        OperationDefinition::Subscription(s) => s.name.as_deref(),
        OperationDefinition::SelectionSet(_) => None,
    }
}

/// Flatten root-level fragments and drop skipped fields
fn collect_root_fields<'d, 'a>(
    selections: &'d [Selection<'a, String>],
    fragments: &Fragments<'d, 'a>,
    variables: &Map<String, Value>,
    out: &mut Vec<&'d Field<'a, String>>,
) {
    for selection in selections {
        match selection {
            Selection::Field(field) => {
                if should_include(&field.directives, variables) {
                    out.push(field);
                }
            }
            Selection::FragmentSpread(spread) => {
                if !should_include(&spread.directives, variables) {
                    continue;
                }
                if let Some(fragment) = fragments.get(spread.fragment_name.as_str()) {
                    collect_root_fields(&fragment.selection_set.items, fragments, variables, out);
                }
            }
            Selection::InlineFragment(inline) => {
                if should_include(&inline.directives, variables) {
                    collect_root_fields(&inline.selection_set.items, fragments, variables, out);
                }
            }
        }
    }
}

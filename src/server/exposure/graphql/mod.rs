//! GraphQL API exposure
//!
//! Routes GraphQL requests into the resolver registry. The transport only
//! builds the [`RequestContext`] from headers; everything else happens in
//! the executor.

mod executor;
mod schema_generator;

pub use executor::GraphQLExecutor;
pub use schema_generator::SchemaGenerator;

use crate::core::auth::RequestContext;
use crate::core::error::GraphQLError;
use crate::server::host::ServerHost;
use anyhow::Result;
use async_graphql::http::{GraphQLPlaygroundConfig, playground_source};
use axum::{
    Json, Router,
    body::Bytes,
    extract::Extension,
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct GraphQLRequestBody {
    query: String,
    #[serde(default)]
    variables: Option<Map<String, Value>>,
    #[serde(default, rename = "operationName")]
    operation_name: Option<String>,
}

/// GraphQL API exposure implementation
pub struct GraphQLExposure;

impl GraphQLExposure {
    /// Build the GraphQL router from a host
    ///
    /// Returns a router with:
    /// - `POST /graphql` for queries and mutations
    /// - `GET /graphql/playground`
    /// - `GET /graphql/schema` (404 when introspection is disabled)
    pub fn build_router(host: Arc<ServerHost>) -> Result<Router> {
        let router = Router::new()
            .route("/graphql", post(graphql_handler))
            .route("/graphql/playground", get(graphql_playground))
            .route("/graphql/schema", get(graphql_schema))
            .layer(Extension(host));

        Ok(router)
    }
}

/// Build the per-request context from the incoming headers
fn request_context(host: &ServerHost, headers: &HeaderMap) -> RequestContext {
    let mut ctx = RequestContext::new(host.config.env.clone());
    if let Some(referrer) = headers.get(header::REFERER).and_then(|v| v.to_str().ok()) {
        ctx = ctx.with_referrer(referrer);
    }
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| host.config.extract_token(v))
    {
        ctx = ctx.with_token(token);
    }
    ctx
}

/// Decode a request body, answering undecodable bodies with a parse error
fn parse_request_body(body: &[u8]) -> std::result::Result<GraphQLRequestBody, Value> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "rejected graphql request body");
        executor::request_error(
            GraphQLError::Parse {
                message: format!("invalid request body: {e}"),
            }
            .into(),
        )
    })
}

/// Handler for GraphQL queries and mutations
async fn graphql_handler(
    Extension(host): Extension<Arc<ServerHost>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    let request = match parse_request_body(&body) {
        Ok(request) => request,
        Err(response) => return Json(response),
    };
    let ctx = request_context(&host, &headers);
    let executor = GraphQLExecutor::new(host);
    let response = executor
        .execute(
            &request.query,
            request.variables,
            request.operation_name.as_deref(),
            &ctx,
        )
        .await;
    Json(response)
}

/// Handler for GraphQL playground UI
async fn graphql_playground() -> impl IntoResponse {
    Html(playground_source(GraphQLPlaygroundConfig::new("/graphql")))
}

/// Handler for GraphQL schema SDL export
async fn graphql_schema(Extension(host): Extension<Arc<ServerHost>>) -> Response {
    if !host.config.graphql.introspection {
        return StatusCode::NOT_FOUND.into_response();
    }
    let sdl = SchemaGenerator::new(&host.resolvers).generate_sdl();
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], sdl).into_response()
}

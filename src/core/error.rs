//! Typed error handling for docgraph
//!
//! Every failure that can leave the core (facade, resolvers, executor) is a
//! [`DocGraphError`]. The variants follow the taxonomy the API layer cares
//! about:
//!
//! - [`DocumentError`]: missing documents and unknown operations
//! - [`ValidationError`]: payloads that do not match an input shape
//! - [`StorageError`]: store outages and transaction conflicts
//! - [`AuthError`]: requests rejected by the authorization collaborator
//! - [`GraphQLError`]: documents that cannot be parsed or executed
//! - [`ConfigError`]: invalid resolver or application configuration
//!
//! A vetoed operation is *not* an error; see
//! [`Outcome`](crate::core::resolver::Outcome).
//!
//! # Example
//!
//! ```rust,ignore
//! match widgets.update("abc", fields).await {
//!     Ok(doc) => println!("updated {}", doc.id),
//!     Err(DocGraphError::Document(DocumentError::NotFound { id, .. })) => {
//!         println!("{} does not exist", id);
//!     }
//!     Err(e) => return Err(e),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Result alias used throughout the core
pub type Result<T> = std::result::Result<T, DocGraphError>;

/// The main error type for docgraph
#[derive(Debug, Error)]
pub enum DocGraphError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    GraphQL(#[from] GraphQLError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A lifecycle hook failed with its own error
    #[error("Hook '{hook}' failed: {message}")]
    Hook { hook: String, message: String },

    /// Internal errors (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response structure for HTTP and GraphQL `errors` entries
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl DocGraphError {
    /// Shorthand for [`DocumentError::NotFound`]
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        DocGraphError::Document(DocumentError::NotFound {
            collection: collection.into(),
            id: id.into(),
        })
    }

    /// Wrap an arbitrary hook failure
    pub fn hook(hook: impl Into<String>, err: impl std::fmt::Display) -> Self {
        DocGraphError::Hook {
            hook: hook.into(),
            message: err.to_string(),
        }
    }

    /// Whether this error signals a missing document
    pub fn is_not_found(&self) -> bool {
        matches!(self, DocGraphError::Document(DocumentError::NotFound { .. }))
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            DocGraphError::Document(e) => e.status_code(),
            DocGraphError::Validation(_) => StatusCode::BAD_REQUEST,
            DocGraphError::Storage(e) => e.status_code(),
            DocGraphError::Auth(e) => e.status_code(),
            DocGraphError::GraphQL(e) => e.status_code(),
            DocGraphError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DocGraphError::Hook { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            DocGraphError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            DocGraphError::Document(e) => e.error_code(),
            DocGraphError::Validation(_) => "VALIDATION_ERROR",
            DocGraphError::Storage(e) => e.error_code(),
            DocGraphError::Auth(e) => e.error_code(),
            DocGraphError::GraphQL(e) => e.error_code(),
            DocGraphError::Config(_) => "CONFIG_ERROR",
            DocGraphError::Hook { .. } => "HOOK_FAILED",
            DocGraphError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            DocGraphError::Document(DocumentError::NotFound { collection, id }) => {
                Some(serde_json::json!({ "collection": collection, "id": id }))
            }
            DocGraphError::Validation(ValidationError::FieldErrors { shape, errors }) => {
                Some(serde_json::json!({ "shape": shape, "fields": errors }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for DocGraphError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

impl From<serde_json::Error> for DocGraphError {
    fn from(err: serde_json::Error) -> Self {
        DocGraphError::Internal(format!("JSON error: {}", err))
    }
}

// =============================================================================
// Document Errors
// =============================================================================

/// Errors related to individual documents and operations on them
#[derive(Debug, Error)]
pub enum DocumentError {
    /// No document with this id in the collection
    #[error("Document '{id}' not found in collection '{collection}'")]
    NotFound { collection: String, id: String },

    /// No operation is registered under this name
    #[error("Unknown operation: {name}")]
    UnknownOperation { name: String },
}

impl DocumentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DocumentError::NotFound { .. } => StatusCode::NOT_FOUND,
            DocumentError::UnknownOperation { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            DocumentError::NotFound { .. } => "DOCUMENT_NOT_FOUND",
            DocumentError::UnknownOperation { .. } => "UNKNOWN_OPERATION",
        }
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// A single field-level validation failure
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Errors raised when a payload does not match its input shape
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The payload is not an object at all
    #[error("Input for '{shape}' must be an object")]
    NotAnObject { shape: String },

    /// One or more fields failed validation
    #[error("Invalid input for '{shape}': {}", format_field_errors(errors))]
    FieldErrors {
        shape: String,
        errors: Vec<FieldError>,
    },

    /// A required argument was not supplied
    #[error("Missing required argument '{argument}'")]
    MissingArgument { argument: String },
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors surfaced by a document store
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store cannot be reached
    #[error("Storage backend '{backend}' is unavailable")]
    Unavailable { backend: String },

    /// A transaction's read set changed before commit
    #[error("Transaction aborted: document '{id}' in '{collection}' changed since it was read")]
    TransactionConflict { collection: String, id: String },

    /// Any other backend failure
    #[error("{backend} error: {message}")]
    Backend { backend: String, message: String },
}

impl StorageError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            StorageError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            StorageError::TransactionConflict { .. } => StatusCode::CONFLICT,
            StorageError::Backend { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            StorageError::Unavailable { .. } => "STORAGE_UNAVAILABLE",
            StorageError::TransactionConflict { .. } => "TRANSACTION_CONFLICT",
            StorageError::Backend { .. } => "STORAGE_ERROR",
        }
    }
}

// =============================================================================
// Auth Errors
// =============================================================================

/// Errors raised by the authorization collaborator
#[derive(Debug, Error)]
pub enum AuthError {
    /// The bearer token could not be verified
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// The caller may not run this operation
    #[error("Access denied for operation '{operation}'")]
    Forbidden { operation: String },
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Unauthorized { .. } => "UNAUTHORIZED",
            AuthError::Forbidden { .. } => "FORBIDDEN",
        }
    }
}

// =============================================================================
// GraphQL Errors
// =============================================================================

/// Errors related to GraphQL documents
#[derive(Debug, Error)]
pub enum GraphQLError {
    /// The document could not be parsed
    #[error("GraphQL parse error: {message}")]
    Parse { message: String },

    /// The document parsed but cannot be executed
    #[error("GraphQL execution error: {message}")]
    Execution { message: String },
}

impl GraphQLError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GraphQLError::Parse { .. } => StatusCode::BAD_REQUEST,
            GraphQLError::Execution { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            GraphQLError::Parse { .. } => "GRAPHQL_PARSE_ERROR",
            GraphQLError::Execution { .. } => "GRAPHQL_EXECUTION_ERROR",
        }
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors raised while resolving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An operation name is not a valid GraphQL name
    #[error("Invalid operation name '{name}'")]
    InvalidName { name: String },

    /// Two operations resolve to the same exposed name
    #[error("Duplicate operation name '{name}'")]
    DuplicateName { name: String },

    /// Any other configuration problem
    #[error("Configuration error: {message}")]
    Invalid { message: String },
}

//! Tests for the typed error handling system
//!
//! These tests verify that:
//! - Errors map to the expected HTTP status codes
//! - Error codes are stable for clients
//! - Error responses are properly formatted
//! - Conversions into `DocGraphError` keep the original message

use axum::http::StatusCode;
use axum::response::IntoResponse;
use docgraph::core::error::{
    AuthError, ConfigError, DocumentError, FieldError, GraphQLError, StorageError, ValidationError,
};
use docgraph::prelude::*;

// =============================================================================
// HTTP Status Code Tests
// =============================================================================

mod status_code_tests {
    use super::*;

    #[test]
    fn test_document_not_found_returns_404() {
        let err = DocGraphError::not_found("widgets", "abc");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(err.is_not_found());
    }

    #[test]
    fn test_unknown_operation_returns_400() {
        let err = DocGraphError::Document(DocumentError::UnknownOperation {
            name: "fooWidget".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_validation_error_returns_400() {
        let err = DocGraphError::Validation(ValidationError::MissingArgument {
            argument: "id".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_storage_errors() {
        let unavailable = DocGraphError::Storage(StorageError::Unavailable {
            backend: "memory".to_string(),
        });
        assert_eq!(unavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let conflict = DocGraphError::Storage(StorageError::TransactionConflict {
            collection: "widgets".to_string(),
            id: "abc".to_string(),
        });
        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_auth_errors() {
        let unauthorized = DocGraphError::Auth(AuthError::Unauthorized {
            message: "invalid token".to_string(),
        });
        assert_eq!(unauthorized.status_code(), StatusCode::UNAUTHORIZED);

        let forbidden = DocGraphError::Auth(AuthError::Forbidden {
            operation: "addWidget".to_string(),
        });
        assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_hook_and_internal_errors_return_500() {
        assert_eq!(
            DocGraphError::hook("on_before_add", "boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            DocGraphError::Internal("oops".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

// =============================================================================
// Error Code Tests
// =============================================================================

mod error_code_tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let cases: Vec<(DocGraphError, &str)> = vec![
            (DocGraphError::not_found("widgets", "1"), "DOCUMENT_NOT_FOUND"),
            (
                ValidationError::NotAnObject {
                    shape: "WidgetInput".to_string(),
                }
                .into(),
                "VALIDATION_ERROR",
            ),
            (
                StorageError::Backend {
                    backend: "memory".to_string(),
                    message: "poisoned".to_string(),
                }
                .into(),
                "STORAGE_ERROR",
            ),
            (
                GraphQLError::Parse {
                    message: "unexpected end".to_string(),
                }
                .into(),
                "GRAPHQL_PARSE_ERROR",
            ),
            (
                ConfigError::DuplicateName {
                    name: "widget".to_string(),
                }
                .into(),
                "CONFIG_ERROR",
            ),
            (DocGraphError::hook("on_after_find", "boom"), "HOOK_FAILED"),
        ];

        for (err, code) in cases {
            assert_eq!(err.error_code(), code, "{err}");
        }
    }
}

// =============================================================================
// Response Format Tests
// =============================================================================

mod response_tests {
    use super::*;

    #[test]
    fn test_not_found_response_has_details() {
        let response = DocGraphError::not_found("widgets", "abc").to_response();
        assert_eq!(response.code, "DOCUMENT_NOT_FOUND");
        assert!(response.message.contains("abc"));
        assert_eq!(
            response.details,
            Some(json!({ "collection": "widgets", "id": "abc" }))
        );
    }

    #[test]
    fn test_field_errors_are_listed() {
        let err = DocGraphError::Validation(ValidationError::FieldErrors {
            shape: "WidgetInput".to_string(),
            errors: vec![
                FieldError {
                    field: "name".to_string(),
                    message: "is required".to_string(),
                },
                FieldError {
                    field: "size".to_string(),
                    message: "expected Int".to_string(),
                },
            ],
        });

        assert_eq!(
            err.to_string(),
            "Invalid input for 'WidgetInput': name: is required, size: expected Int"
        );
        let response = err.to_response();
        assert_eq!(response.details.unwrap()["fields"][1]["field"], "size");
    }

    #[test]
    fn test_into_response_uses_status_code() {
        let response = DocGraphError::Auth(AuthError::Forbidden {
            operation: "deleteWidget".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}

// =============================================================================
// Conversion Tests
// =============================================================================

mod conversion_tests {
    use super::*;

    #[test]
    fn test_json_error_becomes_internal() {
        let json_err = serde_json::from_str::<Value>("{").unwrap_err();
        let err: DocGraphError = json_err.into();
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
        assert!(err.to_string().starts_with("Internal error: JSON error"));
    }

    #[test]
    fn test_transparent_display() {
        let err: DocGraphError = GraphQLError::Execution {
            message: "Unknown operation named 'B'".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "GraphQL execution error: Unknown operation named 'B'"
        );
    }

    #[test]
    fn test_errors_convert_into_anyhow() {
        fn fails() -> anyhow::Result<()> {
            Err(DocGraphError::not_found("widgets", "abc"))?
        }
        let err = fails().unwrap_err();
        assert!(err.downcast_ref::<DocGraphError>().is_some_and(|e| e.is_not_found()));
    }
}

//! GraphQL executor module
//!
//! Executes parsed documents against the resolver registry.
//!
//! - `core`: operation selection, root-field dispatch, errors and audit
//! - `field_resolver`: selection-set projection of resolved values
//! - `utils`: argument, variable and directive helpers

mod core;
mod field_resolver;
mod utils;

pub use self::core::GraphQLExecutor;
pub(crate) use self::core::request_error;

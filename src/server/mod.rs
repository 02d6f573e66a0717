//! Server module for building HTTP servers around the resolver registry
//!
//! `ServerBuilder` resolves every registered entity configuration into a
//! transport-agnostic `ServerHost`, which the exposures turn into routes:
//! - GraphQL endpoint, playground and SDL export
//! - Health checks and custom routes

pub mod builder;
pub mod exposure;
pub mod host;

pub use builder::ServerBuilder;
pub use exposure::{GraphQLExposure, RestExposure};
pub use host::ServerHost;

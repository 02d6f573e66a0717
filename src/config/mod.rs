//! Configuration loading and management

use crate::core::error::ConfigError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable overriding [`AppConfig::env`]
pub const ENV_VAR: &str = "DOCGRAPH_ENV";

/// Top-level application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Deployment environment; `local` bypasses authorization
    #[serde(default = "default_env")]
    pub env: String,

    /// Name reported by the health endpoint
    #[serde(default = "default_service_name")]
    pub service_name: String,

    #[serde(default)]
    pub graphql: GraphQLConfig,
}

/// Settings of the GraphQL endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLConfig {
    /// Port the server listens on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Read the bearer token from the `Authorization` header
    #[serde(default = "default_true")]
    pub token_auth: bool,

    /// Prefix stripped from the `Authorization` header
    #[serde(default = "default_token_prefix")]
    pub token_prefix: String,

    /// Serve the SDL at `/graphql/schema`
    #[serde(default = "default_true")]
    pub introspection: bool,

    #[serde(default)]
    pub schema: SchemaConfig,
}

/// SDL emission at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub emit: bool,

    #[serde(default = "default_schema_path")]
    pub path: PathBuf,
}

fn default_env() -> String {
    "production".to_string()
}

fn default_service_name() -> String {
    "docgraph".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_true() -> bool {
    true
}

fn default_token_prefix() -> String {
    "Bearer ".to_string()
}

fn default_schema_path() -> PathBuf {
    PathBuf::from("schema.graphql")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env: default_env(),
            service_name: default_service_name(),
            graphql: GraphQLConfig::default(),
        }
    }
}

impl Default for GraphQLConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            token_auth: true,
            token_prefix: default_token_prefix(),
            introspection: true,
            schema: SchemaConfig::default(),
        }
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            emit: false,
            path: default_schema_path(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file, then apply `DOCGRAPH_ENV`
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string, then apply `DOCGRAPH_ENV`
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        let config = config.with_env_override(std::env::var(ENV_VAR).ok());
        config.validate()?;
        Ok(config)
    }

    /// Replace `env` when an override is present and non-empty
    pub fn with_env_override(mut self, value: Option<String>) -> Self {
        if let Some(env) = value.filter(|v| !v.trim().is_empty()) {
            self.env = env;
        }
        self
    }

    /// Check values serde cannot enforce
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.graphql.port == 0 {
            return Err(ConfigError::Invalid {
                message: "graphql.port must not be 0".to_string(),
            });
        }
        if self.graphql.schema.emit && self.graphql.schema.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                message: "graphql.schema.path is required when emit is enabled".to_string(),
            });
        }
        Ok(())
    }

    /// Strip the configured prefix from an `Authorization` header value
    ///
    /// Returns `None` when token auth is disabled or the header is empty.
    pub fn extract_token(&self, header: &str) -> Option<String> {
        if !self.graphql.token_auth {
            return None;
        }
        let token = header
            .strip_prefix(self.graphql.token_prefix.as_str())
            .unwrap_or(header)
            .trim();
        (!token.is_empty()).then(|| token.to_string())
    }
}

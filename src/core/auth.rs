//! Authorization of generated operations
//!
//! An [`AuthChecker`] decides, once per operation and before the operation
//! body runs, whether the caller described by a [`RequestContext`] may run
//! an operation restricted to a role list.

use crate::core::error::{AuthError, Result};
use async_trait::async_trait;
use std::collections::HashMap;

/// Environment name under which every check passes
pub const LOCAL_ENV: &str = "local";

/// Per-request information extracted by the transport
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Value of the `Referer` header
    pub referrer: Option<String>,
    /// Bearer token, already stripped of its prefix
    pub token: Option<String>,
    /// Deployment environment, e.g. `local` or `production`
    pub env: String,
}

impl RequestContext {
    pub fn new(env: impl Into<String>) -> Self {
        Self {
            env: env.into(),
            ..Default::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    /// Whether the request runs in the trusted local environment
    pub fn is_local(&self) -> bool {
        self.env == LOCAL_ENV
    }
}

/// Decides whether a request may run an operation
#[async_trait]
pub trait AuthChecker: Send + Sync {
    /// `Ok(false)` denies the call; errors propagate as field errors
    async fn check(&self, ctx: &RequestContext, roles: &[String]) -> Result<bool>;
}

/// Checker that lets every request through
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl AuthChecker for AllowAll {
    async fn check(&self, _ctx: &RequestContext, _roles: &[String]) -> Result<bool> {
        Ok(true)
    }
}

/// Verified identity carried by a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub uid: String,
    /// Custom `role` claim
    pub role: Option<String>,
}

/// Verifies identity tokens
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Decode a token, failing with [`AuthError::Unauthorized`] when invalid
    async fn verify(&self, token: &str) -> Result<Claims>;
}

/// Verifier backed by a fixed token table, for tests and local setups
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, Claims>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, claims: Claims) -> Self {
        self.tokens.insert(token.into(), claims);
        self
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Claims> {
        self.tokens.get(token).cloned().ok_or_else(|| {
            AuthError::Unauthorized {
                message: "invalid token".to_string(),
            }
            .into()
        })
    }
}

/// Role-based checker
///
/// - the `local` environment is always allowed
/// - a request without a token is denied
/// - the token must verify
/// - an empty role list allows any verified caller
/// - otherwise the caller's `role` claim must be listed
pub struct RoleAuthChecker<V: TokenVerifier> {
    verifier: V,
}

impl<V: TokenVerifier> RoleAuthChecker<V> {
    pub fn new(verifier: V) -> Self {
        Self { verifier }
    }
}

#[async_trait]
impl<V: TokenVerifier> AuthChecker for RoleAuthChecker<V> {
    async fn check(&self, ctx: &RequestContext, roles: &[String]) -> Result<bool> {
        if ctx.is_local() {
            return Ok(true);
        }
        let Some(token) = ctx.token.as_deref() else {
            return Ok(false);
        };

        let claims = self.verifier.verify(token).await?;
        if roles.is_empty() {
            return Ok(true);
        }
        Ok(claims
            .role
            .as_ref()
            .is_some_and(|role| roles.iter().any(|r| r == role)))
    }
}

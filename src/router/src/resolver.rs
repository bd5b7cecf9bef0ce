//! Initial data resolvers
//!
//! A resolver produces data that must be available before a route may
//! render. Resolvers are bound to route nodes under a context key and only
//! run for nodes on the matched path.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::Serialize;
use thiserror::Error;

use crate::context::NavigationContext;

/// Resolver failure
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolveError {
    /// The resolver did not finish within the effective deadline
    #[error("resolver timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// The data source reported a failure
    #[error("resolver failed: {message}")]
    Failed { message: String },

    /// The navigation was superseded while the resolver ran
    #[error("navigation cancelled")]
    Cancelled,
}

impl ResolveError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Initial data resolver contract
#[async_trait]
pub trait DataResolver: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Produce the data for this navigation
    ///
    /// `ctx` already contains every value resolved by ancestor nodes.
    async fn resolve(&self, ctx: &NavigationContext) -> Result<serde_json::Value, ResolveError>;
}

/// Resolver returning a fixed value
#[derive(Debug, Clone)]
pub struct StaticResolver {
    name: String,
    value: serde_json::Value,
}

impl StaticResolver {
    pub fn new(name: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[async_trait]
impl DataResolver for StaticResolver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self, _ctx: &NavigationContext) -> Result<serde_json::Value, ResolveError> {
        Ok(self.value.clone())
    }
}

type ResolveFn =
    dyn Fn(&NavigationContext) -> BoxFuture<'static, Result<serde_json::Value, ResolveError>>
        + Send
        + Sync;

/// Resolver backed by an async closure
///
/// The closure receives the context by reference and must copy whatever it
/// needs into the returned future.
pub struct FnResolver {
    name: String,
    resolve: Box<ResolveFn>,
}

impl FnResolver {
    pub fn new<F>(name: impl Into<String>, resolve: F) -> Self
    where
        F: Fn(&NavigationContext) -> BoxFuture<'static, Result<serde_json::Value, ResolveError>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            resolve: Box::new(resolve),
        }
    }
}

#[async_trait]
impl DataResolver for FnResolver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self, ctx: &NavigationContext) -> Result<serde_json::Value, ResolveError> {
        (self.resolve)(ctx).await
    }
}

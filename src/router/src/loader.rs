//! Deferred module loading
//!
//! The engine does not know how feature modules are fetched. It asks a
//! [`ModuleLoader`] for an [`Artifact`] by [`ModuleId`]; loads are expected to
//! be idempotent, so callers may wrap any loader in a [`CachingLoader`].

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tracing::debug;

use crate::tree::RouteTree;
use crate::types::ModuleId;

/// A loaded feature module
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artifact {
    /// Module identifier
    pub module: ModuleId,

    /// Opaque loader payload (entry point, chunk url, ...)
    pub payload: serde_json::Value,
}

impl Artifact {
    pub fn new(module: ModuleId, payload: serde_json::Value) -> Self {
        Self { module, payload }
    }
}

/// Loader failure
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoadError {
    /// The load did not finish within the effective deadline
    #[error("module load timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// The loader does not know this module
    #[error("unknown module: {module}")]
    UnknownModule { module: ModuleId },

    /// Transport or evaluation failure
    #[error("module load failed: {message}")]
    Failed { message: String },

    /// The navigation was superseded while loading
    #[error("navigation cancelled")]
    Cancelled,
}

/// Deferred artifact loader keyed by module id
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(&self, id: &ModuleId) -> Result<Artifact, LoadError>;
}

/// Loader serving a fixed module manifest
#[derive(Debug, Clone, Default)]
pub struct StaticLoader {
    modules: HashMap<ModuleId, serde_json::Value>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every module referenced by the tree with a `{"module": id}` payload
    pub fn from_tree(tree: &RouteTree) -> Self {
        let mut loader = Self::new();
        for module in tree.modules() {
            let payload = serde_json::json!({ "module": module.as_str() });
            loader.modules.insert(module, payload);
        }
        loader
    }

    pub fn with_module(mut self, id: impl Into<String>, payload: serde_json::Value) -> Self {
        self.modules.insert(ModuleId::new(id), payload);
        self
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[async_trait]
impl ModuleLoader for StaticLoader {
    async fn load(&self, id: &ModuleId) -> Result<Artifact, LoadError> {
        self.modules
            .get(id)
            .map(|payload| Artifact::new(id.clone(), payload.clone()))
            .ok_or_else(|| LoadError::UnknownModule { module: id.clone() })
    }
}

/// Statistics about loader cache performance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderCacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

impl LoaderCacheStats {
    /// Calculates the cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Caches successful loads by module id
///
/// Failures are never cached, so a retry after a load error reaches the
/// inner loader again.
pub struct CachingLoader<L> {
    inner: L,
    cache: DashMap<ModuleId, Artifact>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<L: ModuleLoader> CachingLoader<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn stats(&self) -> LoaderCacheStats {
        LoaderCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.len(),
        }
    }

    /// Drop every cached artifact
    pub fn clear(&self) {
        self.cache.clear();
    }
}

#[async_trait]
impl<L: ModuleLoader> ModuleLoader for CachingLoader<L> {
    async fn load(&self, id: &ModuleId) -> Result<Artifact, LoadError> {
        if let Some(artifact) = self.cache.get(id) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(module = %id, "module cache hit");
            return Ok(artifact.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let artifact = self.inner.load(id).await?;
        self.cache.insert(id.clone(), artifact.clone());
        Ok(artifact)
    }
}

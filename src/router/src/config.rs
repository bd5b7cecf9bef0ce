//! Route file loading
//!
//! A route file is TOML with an `[engine]` section and a nested list of
//! `[[routes]]`. Guards and resolvers are referenced by name and looked up
//! in a [`Registry`] when the tree is built.
//!
//! ```toml
//! [engine]
//! max_redirects = 8
//! auth_enforcement = "enforced"
//!
//! [[routes]]
//! path = ""
//! redirect_to = "home"
//!
//! [[routes]]
//! path = "home"
//! guards = ["auth"]
//! load = "LandingHomeModule"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::engine::EngineConfig;
use crate::error::{Result, RouterError};
use crate::guard::Guard;
use crate::resolver::DataResolver;
use crate::tree::{AuthEnforcement, RouteNode, RouteTree};

/// Complete route file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSection {
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    #[serde(default = "default_resolver_timeout")]
    pub resolver_timeout_ms: u64,
    #[serde(default = "default_loader_timeout")]
    pub loader_timeout_ms: u64,
    #[serde(default = "default_true")]
    pub follow_redirects: bool,
    #[serde(default = "default_true")]
    pub enable_metrics: bool,
    #[serde(default)]
    pub auth_enforcement: AuthEnforcement,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            max_redirects: default_max_redirects(),
            resolver_timeout_ms: default_resolver_timeout(),
            loader_timeout_ms: default_loader_timeout(),
            follow_redirects: true,
            enable_metrics: true,
            auth_enforcement: AuthEnforcement::default(),
        }
    }
}

/// One route node as written in a route file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Path segment ("" for layout nodes and the root alias)
    #[serde(default)]
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,

    /// Guard names evaluated when this node is the terminal match
    #[serde(default)]
    pub guards: Vec<String>,

    /// Guard names evaluated when navigating into a descendant
    #[serde(default)]
    pub child_guards: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,

    /// Context key -> resolver name
    #[serde(default)]
    pub resolve: BTreeMap<String, String>,

    #[serde(default)]
    pub requires: Vec<String>,

    /// Module id of the deferred loader
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load: Option<String>,

    #[serde(default)]
    pub always_load: bool,

    #[serde(default)]
    pub data: BTreeMap<String, serde_json::Value>,

    #[serde(default)]
    pub children: Vec<RouteConfig>,
}

fn default_true() -> bool { true }
fn default_max_redirects() -> usize { 8 }
fn default_resolver_timeout() -> u64 { 10_000 }
fn default_loader_timeout() -> u64 { 30_000 }

/// Named guards and resolvers available to route files
#[derive(Default, Clone)]
pub struct Registry {
    guards: HashMap<String, Arc<dyn Guard>>,
    resolvers: HashMap<String, Arc<dyn DataResolver>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_guard(&mut self, name: impl Into<String>, guard: Arc<dyn Guard>) {
        self.guards.insert(name.into(), guard);
    }

    pub fn register_resolver(&mut self, name: impl Into<String>, resolver: Arc<dyn DataResolver>) {
        self.resolvers.insert(name.into(), resolver);
    }

    pub fn with_guard(mut self, name: impl Into<String>, guard: Arc<dyn Guard>) -> Self {
        self.register_guard(name, guard);
        self
    }

    pub fn with_resolver(mut self, name: impl Into<String>, resolver: Arc<dyn DataResolver>) -> Self {
        self.register_resolver(name, resolver);
        self
    }

    pub fn guard(&self, name: &str) -> Result<Arc<dyn Guard>> {
        self.guards
            .get(name)
            .cloned()
            .ok_or_else(|| RouterError::UnknownGuard(name.to_string()))
    }

    pub fn resolver(&self, name: &str) -> Result<Arc<dyn DataResolver>> {
        self.resolvers
            .get(name)
            .cloned()
            .ok_or_else(|| RouterError::UnknownResolver(name.to_string()))
    }
}

impl RouterConfig {
    /// Parse and validate a route file
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RouterConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a route file from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.as_ref().display(), routes = config.routes.len(), "route file loaded");
        Ok(config)
    }

    /// Validate engine settings
    pub fn validate(&self) -> Result<()> {
        if self.engine.resolver_timeout_ms == 0 {
            return Err(RouterError::Config(
                "resolver_timeout_ms must be greater than zero".to_string(),
            ));
        }

        if self.engine.loader_timeout_ms == 0 {
            return Err(RouterError::Config(
                "loader_timeout_ms must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_redirects: self.engine.max_redirects,
            resolver_timeout: Duration::from_millis(self.engine.resolver_timeout_ms),
            loader_timeout: Duration::from_millis(self.engine.loader_timeout_ms),
            follow_redirects: self.engine.follow_redirects,
            enable_metrics: self.engine.enable_metrics,
        }
    }

    /// Build the route tree, resolving guard and resolver names through `registry`
    pub fn build_tree(&self, registry: &Registry) -> Result<RouteTree> {
        let routes = self
            .routes
            .iter()
            .map(|route| build_node(route, registry))
            .collect::<Result<Vec<_>>>()?;

        RouteTree::build(routes, self.engine.auth_enforcement)
    }
}

fn build_node(route: &RouteConfig, registry: &Registry) -> Result<RouteNode> {
    let mut node = match &route.redirect_to {
        Some(target) => RouteNode::redirect(&route.path, target),
        None => RouteNode::new(&route.path),
    };

    for name in &route.guards {
        node = node.guard(registry.guard(name)?);
    }
    for name in &route.child_guards {
        node = node.child_guard(registry.guard(name)?);
    }
    if let Some(roles) = &route.roles {
        node = node.roles(roles.iter().map(String::as_str));
    }
    for (key, name) in &route.resolve {
        node = node.resolve(key, registry.resolver(name)?);
    }
    for key in &route.requires {
        node = node.requires(key);
    }
    if let Some(module) = &route.load {
        node = node.load(module);
    }
    if route.always_load {
        node = node.always_load();
    }
    for (key, value) in &route.data {
        node = node.data(key, value.clone());
    }
    for child in &route.children {
        node = node.child(build_node(child, registry)?);
    }

    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::{AuthGuard, PrincipalAuthState};
    use crate::resolver::StaticResolver;
    use serde_json::json;

    const ROUTES: &str = r#"
[engine]
max_redirects = 4
resolver_timeout_ms = 500

[[routes]]
path = ""
redirect_to = "apps/usuarios"

[[routes]]
path = "apps"
child_guards = ["auth"]
resolve = { navigation = "navigation" }
data = { layout = "classic" }

[[routes.children]]
path = "usuarios"
requires = ["navigation"]
load = "UsersModule"

[[routes.children]]
path = "organizaciones"
roles = ["SuperAdmin"]
load = "OrganizacionModule"
"#;

    fn registry() -> Registry {
        Registry::new()
            .with_guard("auth", Arc::new(AuthGuard::new(Arc::new(PrincipalAuthState))))
            .with_resolver(
                "navigation",
                Arc::new(StaticResolver::new("navigation", json!([]))),
            )
    }

    #[test]
    fn test_parse_route_file() {
        let config = RouterConfig::from_toml_str(ROUTES).unwrap();

        assert_eq!(config.engine.max_redirects, 4);
        assert_eq!(config.engine.loader_timeout_ms, 30_000);
        assert_eq!(config.engine.auth_enforcement, AuthEnforcement::Enforced);
        assert_eq!(config.routes.len(), 2);
        assert_eq!(config.routes[1].children.len(), 2);
        assert_eq!(config.routes[1].data.get("layout"), Some(&json!("classic")));

        let engine = config.engine_config();
        assert_eq!(engine.resolver_timeout, Duration::from_millis(500));
        assert!(engine.follow_redirects);
    }

    #[test]
    fn test_build_tree() {
        let config = RouterConfig::from_toml_str(ROUTES).unwrap();
        let tree = config.build_tree(&registry()).unwrap();

        assert_eq!(tree.len(), 4);
        assert_eq!(
            tree.redirect_table().get(""),
            Some(&"apps/usuarios".to_string())
        );
        assert_eq!(tree.modules().len(), 2);
    }

    #[test]
    fn test_unknown_guard() {
        let config = RouterConfig::from_toml_str(ROUTES).unwrap();
        let result = config.build_tree(&Registry::new());
        assert!(matches!(result, Err(RouterError::UnknownGuard(name)) if name == "auth"));
    }

    #[test]
    fn test_unknown_resolver() {
        let config = RouterConfig::from_toml_str(ROUTES).unwrap();
        let registry = Registry::new()
            .with_guard("auth", Arc::new(AuthGuard::new(Arc::new(PrincipalAuthState))));
        let result = config.build_tree(&registry);
        assert!(matches!(result, Err(RouterError::UnknownResolver(name)) if name == "navigation"));
    }

    #[test]
    fn test_disabled_enforcement_from_file() {
        let content = ROUTES.replace(
            "max_redirects = 4",
            "max_redirects = 4\nauth_enforcement = \"disabled\"",
        );
        let config = RouterConfig::from_toml_str(&content).unwrap();
        let tree = config.build_tree(&registry()).unwrap();

        assert_eq!(tree.auth_enforcement(), AuthEnforcement::Disabled);
        let apps = &tree.root().children()[1];
        assert!(apps.child_guards().is_empty());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = RouterConfig::from_toml_str("[engine]\nloader_timeout_ms = 0\n");
        assert!(matches!(result, Err(RouterError::Config(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let result = RouterConfig::from_toml_str("[[routes]\npath = ");
        assert!(matches!(result, Err(RouterError::Toml(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = RouterConfig::from_file("/nonexistent/routes.toml");
        assert!(matches!(result, Err(RouterError::Io(_))));
    }
}

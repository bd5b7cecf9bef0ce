//! Immutable route tree
//!
//! The tree is built once at startup from [`RouteNode`] builders, validated,
//! and then only ever read. Engines share it through an `Arc`.

mod matcher;
mod node;
mod path;

pub use matcher::RouteMatch;
pub use node::RouteNode;
pub use path::RoutePath;

pub(crate) use node::join_path;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{info, warn};

use crate::error::{Result, RouterError};
use crate::guard::GuardKind;
use crate::types::ModuleId;

/// Whether authentication guards are active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEnforcement {
    /// Authentication guards run as declared
    #[default]
    Enforced,

    /// Authentication guards are removed while the tree is built
    Disabled,
}

/// Validated, read-only route tree
#[derive(Debug)]
pub struct RouteTree {
    root: RouteNode,
    enforcement: AuthEnforcement,
}

impl RouteTree {
    /// Build a tree with authentication enforced
    pub fn new(routes: Vec<RouteNode>) -> Result<Self> {
        Self::build(routes, AuthEnforcement::Enforced)
    }

    /// Build a tree from top-level routes
    ///
    /// Fails with [`RouterError::InvalidTree`] when a structural invariant is
    /// violated.
    pub fn build(routes: Vec<RouteNode>, enforcement: AuthEnforcement) -> Result<Self> {
        let mut root = RouteNode::new("").children_from(routes);

        if enforcement == AuthEnforcement::Disabled {
            warn!("authentication enforcement disabled for this route tree");
            root.drop_guards(GuardKind::Authentication, "");
        }

        let mut bound = Vec::new();
        for child in root.children() {
            validate(child, "", &mut bound)?;
        }
        validate_siblings(root.children(), "/")?;

        let tree = Self { root, enforcement };
        info!(
            routes = tree.len(),
            modules = tree.modules().len(),
            aliases = tree.redirect_table().len(),
            enforcement = ?enforcement,
            "route tree built"
        );
        Ok(tree)
    }

    /// Implicit root node ("/")
    pub fn root(&self) -> &RouteNode {
        &self.root
    }

    pub fn auth_enforcement(&self) -> AuthEnforcement {
        self.enforcement
    }

    /// Match a parsed path
    pub fn match_path(&self, path: &RoutePath) -> RouteMatch<'_> {
        matcher::match_segments(&self.root, path.segments())
    }

    /// Alias map derived from every redirect node (alias path -> target)
    pub fn redirect_table(&self) -> BTreeMap<String, String> {
        let mut table = BTreeMap::new();
        collect_redirects(&self.root, "", &mut table);
        table
    }

    /// Every module referenced by a loader, sorted and deduplicated
    pub fn modules(&self) -> Vec<ModuleId> {
        let mut modules = BTreeSet::new();
        collect_modules(&self.root, &mut modules);
        modules.into_iter().collect()
    }

    /// Number of route nodes, excluding the root
    pub fn len(&self) -> usize {
        self.root.count() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.root.children().is_empty()
    }
}

fn invalid(path: &str, message: impl std::fmt::Display) -> RouterError {
    let path = if path.is_empty() { "/" } else { path };
    RouterError::InvalidTree(format!("{}: {}", path, message))
}

/// Validate `node` and its subtree; `bound` holds resolver keys of ancestors
fn validate(node: &RouteNode, parent: &str, bound: &mut Vec<String>) -> Result<()> {
    let path = join_path(parent, node.segment());

    if node.segment().contains('/') {
        return Err(invalid(
            &path,
            format!("segment '{}' must not contain '/'", node.segment()),
        ));
    }

    if node.is_redirect() && (node.loader().is_some() || !node.children().is_empty()) {
        return Err(invalid(&path, "redirect alias cannot have a loader or children"));
    }

    if node.required_roles().is_some_and(<[_]>::is_empty) {
        return Err(invalid(&path, "required role set is empty"));
    }

    if node.is_always_loaded() && node.loader().is_none() {
        return Err(invalid(&path, "always_load set without a loader"));
    }

    let mut keys = HashSet::new();
    for (key, _) in node.resolvers() {
        if !keys.insert(key.as_str()) {
            return Err(invalid(&path, format!("resolver key '{}' bound twice", key)));
        }
    }

    for key in node.required_keys() {
        if !bound.iter().any(|k| k == key) {
            return Err(invalid(
                &path,
                format!("required key '{}' is not resolved by any ancestor", key),
            ));
        }
    }

    validate_siblings(node.children(), &path)?;

    let depth = bound.len();
    bound.extend(node.resolvers().iter().map(|(key, _)| key.clone()));
    for child in node.children() {
        validate(child, &path, bound)?;
    }
    bound.truncate(depth);

    Ok(())
}

fn validate_siblings(children: &[RouteNode], path: &str) -> Result<()> {
    let mut seen = HashSet::new();
    for child in children.iter().filter(|c| !c.is_index()) {
        if !seen.insert(child.segment()) {
            return Err(invalid(
                path,
                format!("duplicate child segment '{}'", child.segment()),
            ));
        }
    }
    Ok(())
}

fn collect_redirects(node: &RouteNode, path: &str, table: &mut BTreeMap<String, String>) {
    for child in node.children() {
        let child_path = join_path(path, child.segment());
        if let Some(target) = child.redirect_target() {
            table.insert(child_path.clone(), target.to_string());
        }
        collect_redirects(child, &child_path, table);
    }
}

fn collect_modules(node: &RouteNode, modules: &mut BTreeSet<ModuleId>) {
    if let Some(module) = node.loader() {
        modules.insert(module.clone());
    }
    for child in node.children() {
        collect_modules(child, modules);
    }
}

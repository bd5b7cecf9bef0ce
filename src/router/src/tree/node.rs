//! Route node definition

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use crate::guard::{Guard, GuardKind, RoleGuard};
use crate::resolver::DataResolver;
use crate::types::{ModuleId, RoleToken};

/// One element of the route tree
///
/// Built with chained constructors and frozen once handed to
/// [`crate::RouteTree`]. A node with an empty segment consumes no path token
/// and acts as a layout/grouping node or, with a redirect target, as the
/// alias for its parent's path.
///
/// # Example
///
/// ```rust
/// use portal_router::RouteNode;
///
/// let apps = RouteNode::new("apps")
///     .child(RouteNode::new("usuarios").load("UsersModule"))
///     .child(
///         RouteNode::new("organizaciones")
///             .roles(["SuperAdmin"])
///             .load("OrganizacionModule"),
///     );
/// assert_eq!(apps.children().len(), 2);
/// ```
pub struct RouteNode {
    segment: String,
    redirect_to: Option<String>,
    guards: Vec<Arc<dyn Guard>>,
    child_guards: Vec<Arc<dyn Guard>>,
    required_roles: Option<Vec<RoleToken>>,
    role_guard: Option<Arc<dyn Guard>>,
    resolvers: Vec<(String, Arc<dyn DataResolver>)>,
    requires: Vec<String>,
    loader: Option<ModuleId>,
    always_load: bool,
    data: BTreeMap<String, serde_json::Value>,
    children: Vec<RouteNode>,
}

impl RouteNode {
    /// Create a node for a path segment ("" for layout nodes)
    pub fn new(segment: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            redirect_to: None,
            guards: Vec::new(),
            child_guards: Vec::new(),
            required_roles: None,
            role_guard: None,
            resolvers: Vec::new(),
            requires: Vec::new(),
            loader: None,
            always_load: false,
            data: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Create a redirect alias; matches only when no path remains
    pub fn redirect(segment: impl Into<String>, target: impl Into<String>) -> Self {
        let mut node = Self::new(segment);
        node.redirect_to = Some(target.into());
        node
    }

    /// Append a guard evaluated when this node is the terminal match
    pub fn guard(mut self, guard: Arc<dyn Guard>) -> Self {
        self.guards.push(guard);
        self
    }

    /// Append a guard evaluated when navigating into any descendant
    pub fn child_guard(mut self, guard: Arc<dyn Guard>) -> Self {
        self.child_guards.push(guard);
        self
    }

    /// Require the principal's role to be one of `roles`
    ///
    /// Adds an implicit [`RoleGuard`] after the node's own guards.
    pub fn roles<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<RoleToken>,
    {
        let roles: Vec<RoleToken> = roles.into_iter().map(Into::into).collect();
        self.role_guard = if roles.is_empty() {
            None
        } else {
            Some(Arc::new(RoleGuard::new(roles.clone())))
        };
        self.required_roles = Some(roles);
        self
    }

    /// Bind a resolver whose result is stored under `key`
    pub fn resolve(mut self, key: impl Into<String>, resolver: Arc<dyn DataResolver>) -> Self {
        self.resolvers.push((key.into(), resolver));
        self
    }

    /// Declare that this node's guards read `key` from resolved data
    pub fn requires(mut self, key: impl Into<String>) -> Self {
        self.requires.push(key.into());
        self
    }

    /// Bind a deferred module loaded when this node is the terminal match
    pub fn load(mut self, module: impl Into<String>) -> Self {
        self.loader = Some(ModuleId::new(module));
        self
    }

    /// Load this node's module whenever a navigation commits through it
    pub fn always_load(mut self) -> Self {
        self.always_load = true;
        self
    }

    /// Attach static route data
    pub fn data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    pub fn child(mut self, child: RouteNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn children_from(mut self, children: impl IntoIterator<Item = RouteNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// Empty-segment node (layout, grouping or root alias)
    pub fn is_index(&self) -> bool {
        self.segment.is_empty()
    }

    pub fn redirect_target(&self) -> Option<&str> {
        self.redirect_to.as_deref()
    }

    pub fn is_redirect(&self) -> bool {
        self.redirect_to.is_some()
    }

    pub fn guards(&self) -> &[Arc<dyn Guard>] {
        &self.guards
    }

    pub fn child_guards(&self) -> &[Arc<dyn Guard>] {
        &self.child_guards
    }

    pub fn required_roles(&self) -> Option<&[RoleToken]> {
        self.required_roles.as_deref()
    }

    pub fn resolvers(&self) -> &[(String, Arc<dyn DataResolver>)] {
        &self.resolvers
    }

    pub fn required_keys(&self) -> &[String] {
        &self.requires
    }

    pub fn loader(&self) -> Option<&ModuleId> {
        self.loader.as_ref()
    }

    pub fn is_always_loaded(&self) -> bool {
        self.always_load
    }

    pub fn route_data(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.data
    }

    pub fn children(&self) -> &[RouteNode] {
        &self.children
    }

    /// Whether a navigation may end at this node
    pub fn is_routable(&self) -> bool {
        self.is_redirect() || self.loader.is_some() || self.children.is_empty()
    }

    /// Guards that apply at this node, in evaluation order
    ///
    /// A node on the way to a deeper match contributes its child guards; the
    /// terminal node contributes its own guards. The role check follows
    /// either list, so a role set also covers every descendant.
    pub fn entry_guards(&self, terminal: bool) -> Vec<&Arc<dyn Guard>> {
        let guards = if terminal {
            &self.guards
        } else {
            &self.child_guards
        };
        guards.iter().chain(self.role_guard.iter()).collect()
    }

    /// Remove every guard of `kind` in this subtree, logging each removal
    pub(crate) fn drop_guards(&mut self, kind: GuardKind, path: &str) {
        let route = if path.is_empty() { "/" } else { path };
        for list in [&mut self.guards, &mut self.child_guards] {
            list.retain(|guard| {
                let keep = guard.kind() != kind;
                if !keep {
                    warn!(
                        route,
                        guard = guard.name(),
                        "authentication enforcement disabled, guard dropped"
                    );
                }
                keep
            });
        }

        for child in &mut self.children {
            let child_path = join_path(path, &child.segment);
            child.drop_guards(kind, &child_path);
        }
    }

    /// Number of nodes in this subtree, including this one
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(RouteNode::count).sum::<usize>()
    }
}

impl fmt::Debug for RouteNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |guards: &[Arc<dyn Guard>]| -> Vec<String> {
            guards.iter().map(|g| g.name().to_string()).collect()
        };

        f.debug_struct("RouteNode")
            .field("segment", &self.segment)
            .field("redirect_to", &self.redirect_to)
            .field("guards", &names(&self.guards))
            .field("child_guards", &names(&self.child_guards))
            .field("required_roles", &self.required_roles)
            .field(
                "resolvers",
                &self.resolvers.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            )
            .field("loader", &self.loader)
            .field("children", &self.children)
            .finish()
    }
}

/// Join a parent path and a segment, skipping empty segments
pub(crate) fn join_path(parent: &str, segment: &str) -> String {
    match (parent.is_empty(), segment.is_empty()) {
        (_, true) => parent.to_string(),
        (true, false) => segment.to_string(),
        (false, false) => format!("{}/{}", parent, segment),
    }
}

//! Navigation outcome types

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::loader::{Artifact, LoadError};
use crate::resolver::ResolveError;
use crate::types::{ModuleId, RoleToken};

/// Final result of a navigation
///
/// Every variant other than `Committed` carries enough information for the
/// UI shell to pick a view: sign-in flow, forbidden page, retryable error or
/// not-found page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NavigationOutcome {
    /// Guards passed, data resolved and modules loaded
    Committed(ResolvedNavigation),

    /// The caller should navigate to `to` (only when redirects are not followed)
    Redirected { from: String, to: String },

    /// A guard, resolver or loader refused the navigation
    Denied { path: String, cause: DenyCause },

    /// No route matches the whole path
    NotFound {
        path: String,
        unmatched: Vec<String>,
    },

    /// The redirect cap was exceeded; always a route configuration bug
    FatalRedirectLoop { trail: Vec<String> },

    /// Superseded by a newer navigation of the same session
    Cancelled { path: String },
}

impl NavigationOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }

    pub fn committed(&self) -> Option<&ResolvedNavigation> {
        match self {
            Self::Committed(navigation) => Some(navigation),
            _ => None,
        }
    }

    pub fn deny_cause(&self) -> Option<&DenyCause> {
        match self {
            Self::Denied { cause, .. } => Some(cause),
            _ => None,
        }
    }

    /// Short outcome name used in logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Committed(_) => "committed",
            Self::Redirected { .. } => "redirected",
            Self::Denied { .. } => "denied",
            Self::NotFound { .. } => "not_found",
            Self::FatalRedirectLoop { .. } => "fatal_redirect_loop",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

/// Why a navigation was denied
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DenyCause {
    /// No valid session
    AuthRequired { guard: String },

    /// Authenticated, but the role is not allowed on this route
    InsufficientRole {
        guard: String,
        required: Vec<RoleToken>,
        actual: RoleToken,
    },

    /// An application guard refused with its own reason
    Guard { guard: String, reason: String },

    /// An initial data resolver failed or timed out
    ResolverFailure { key: String, cause: ResolveError },

    /// A deferred module could not be loaded
    LoaderFailure { module: ModuleId, cause: LoadError },
}

/// Summary of one matched route node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSummary {
    /// Node segment ("" for layout nodes)
    pub segment: String,

    /// Full path of the node
    pub path: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<ModuleId>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<RoleToken>,

    /// Guards evaluated at this node, in order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub guards: Vec<String>,
}

/// Descriptor of a committed navigation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedNavigation {
    /// Unique navigation ID
    pub id: Uuid,

    /// Effective path after redirects
    pub path: String,

    /// Path originally requested
    pub requested: String,

    /// Paths visited through redirects, in order
    pub redirects: Vec<String>,

    /// Matched nodes from the top-level route to the terminal node
    pub chain: Vec<RouteSummary>,

    /// Resolved initial data by context key
    pub data: BTreeMap<String, serde_json::Value>,

    /// Static route data merged root first
    pub route_data: BTreeMap<String, serde_json::Value>,

    /// Loaded modules, ancestors first
    pub artifacts: Vec<Artifact>,

    pub committed_at: DateTime<Utc>,
}

impl ResolvedNavigation {
    /// Module of the terminal node, if it declares one
    pub fn module(&self) -> Option<&ModuleId> {
        self.chain.last().and_then(|node| node.module.as_ref())
    }

    /// Loaded artifact for a module
    pub fn artifact(&self, module: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.module.as_str() == module)
    }

    /// Chain of node paths, comparable across equivalent navigations
    pub fn chain_paths(&self) -> Vec<&str> {
        self.chain.iter().map(|node| node.path.as_str()).collect()
    }
}

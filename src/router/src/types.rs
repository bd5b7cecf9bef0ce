//! Core navigation types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::time::Instant;

/// Opaque role token (e.g., "SuperAdmin")
///
/// Role values are defined by the identity backend; the router only compares
/// them for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleToken(String);

impl RoleToken {
    /// Create a role token
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Raw token value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoleToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Stable identifier of a lazily loaded feature module (e.g., "AnalyticsModule")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(String);

impl ModuleId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Logical UI session; navigations sharing a session supersede each other
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Authenticated principal (user, service account)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Principal identifier (e.g., "user:alice@example.com")
    pub id: String,

    /// Principal's role token
    pub role: RoleToken,

    /// Additional attributes (e.g., organization, display name)
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl Principal {
    /// Create a new principal with a single role
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: RoleToken::new(role),
            attributes: HashMap::new(),
        }
    }

    /// Add an attribute to the principal
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Incoming navigation request
///
/// Supplied by the UI shell on user action or deep link. The path may carry a
/// `?query` suffix which is merged into [`NavigationRequest::metadata`].
#[derive(Debug, Clone)]
pub struct NavigationRequest {
    /// Requested path (e.g., "apps/organizaciones")
    pub path: String,

    /// Current principal; `None` means unauthenticated
    pub principal: Option<Principal>,

    /// Session used for supersession and SSO bookkeeping
    pub session: Option<SessionId>,

    /// Free-form navigation metadata (query parameters, SSO tickets)
    pub metadata: HashMap<String, String>,

    /// Caller deadline for resolvers and loaders
    pub deadline: Option<Instant>,
}

impl NavigationRequest {
    /// Create an anonymous request for a path
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            principal: None,
            session: None,
            metadata: HashMap::new(),
            deadline: None,
        }
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(SessionId::new(session));
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

//! Per-navigation context shared with guards and resolvers

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tokio::time::Instant;
use uuid::Uuid;

use crate::tree::RoutePath;
use crate::types::{NavigationRequest, Principal, SessionId};

/// Resolution state of a navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationState {
    Matching,
    GuardEvaluating,
    Resolving,
    Loading,
    Committed,
    Redirected,
    Denied,
    NotFound,
}

impl NavigationState {
    /// Returns whether no further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Committed | Self::Redirected | Self::Denied | Self::NotFound
        )
    }
}

/// Navigation context
///
/// Created fresh for every resolution attempt (including restarts after a
/// redirect) and never shared between navigations. Guards and resolvers
/// receive it by shared reference; only the engine mutates it.
#[derive(Debug, Clone)]
pub struct NavigationContext {
    id: Uuid,
    path: RoutePath,
    principal: Option<Principal>,
    session: Option<SessionId>,
    metadata: HashMap<String, String>,
    resolved: BTreeMap<String, serde_json::Value>,
    deadline: Option<Instant>,
    state: NavigationState,
    started_at: DateTime<Utc>,
}

impl NavigationContext {
    /// Create a context for `path` carrying the request's principal, session and metadata
    pub fn new(path: RoutePath, request: &NavigationRequest) -> Self {
        let mut metadata = request.metadata.clone();
        for (key, value) in path.query() {
            metadata.insert(key.clone(), value.clone());
        }

        Self {
            id: Uuid::new_v4(),
            path,
            principal: request.principal.clone(),
            session: request.session.clone(),
            metadata,
            resolved: BTreeMap::new(),
            deadline: request.deadline,
            state: NavigationState::Matching,
            started_at: Utc::now(),
        }
    }

    /// Unique id of this resolution attempt
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &RoutePath {
        &self.path
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn session(&self) -> Option<&SessionId> {
        self.session.as_ref()
    }

    /// Metadata value (query parameters override request metadata)
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Data produced by a resolver that already completed
    pub fn resolved(&self, key: &str) -> Option<&serde_json::Value> {
        self.resolved.get(key)
    }

    pub fn resolved_data(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.resolved
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn state(&self) -> NavigationState {
        self.state
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub(crate) fn transition(&mut self, next: NavigationState) {
        tracing::trace!(navigation = %self.id, from = ?self.state, to = ?next, "state transition");
        self.state = next;
    }

    pub(crate) fn insert_resolved(&mut self, key: String, value: serde_json::Value) {
        self.resolved.insert(key, value);
    }

    pub(crate) fn into_resolved(self) -> BTreeMap<String, serde_json::Value> {
        self.resolved
    }
}

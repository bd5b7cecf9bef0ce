//! Navigation guards
//!
//! A guard answers "may this navigation proceed" for one route node. Guards
//! are plain trait objects kept in ordered lists on the route nodes; the
//! engine evaluates them strictly in order and stops at the first result
//! that is not [`GuardOutcome::Allow`].
//!
//! # Provided guards
//!
//! - [`AuthGuard`]: requires a valid session
//! - [`NoAuthGuard`]: requires the absence of a valid session (guest pages)
//! - [`SsoGuard`]: requires a validated single-sign-on session
//! - [`RoleGuard`]: requires the principal's role to be in a set
//! - [`FnGuard`]: wraps a closure for application specific checks

pub mod chain;
pub mod role;
pub mod session;

pub use chain::{evaluate_chain, ChainVerdict};
pub use role::RoleGuard;
pub use session::{
    AuthGuard, AuthStateProvider, NoAuthGuard, PrincipalAuthState, SsoGuard, SsoValidator,
    TicketSsoValidator, SSO_TICKET_KEY,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::NavigationContext;
use crate::types::RoleToken;

/// Result of a single guard evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum GuardOutcome {
    /// Navigation may continue
    Allow,

    /// Navigation is refused
    Deny(DenyReason),

    /// Navigation restarts at another path
    RedirectTo(String),
}

impl GuardOutcome {
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Why a guard refused a navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DenyReason {
    /// No valid session
    AuthRequired,

    /// Authenticated, but the role is not in the required set
    InsufficientRole {
        required: Vec<RoleToken>,
        actual: RoleToken,
    },

    /// Application specific refusal
    Rejected { reason: String },
}

/// Guard category
///
/// Used when building the tree: with [`crate::AuthEnforcement::Disabled`]
/// every `Authentication` guard is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardKind {
    Authentication,
    Guest,
    Sso,
    Role,
    Custom,
}

/// Guard predicate contract
///
/// Implementations must not touch the route tree. They may read or write
/// session state held outside the tree (e.g., consume a single-use token).
#[async_trait]
pub trait Guard: Send + Sync {
    /// Name used in logs and denial causes
    fn name(&self) -> &str;

    fn kind(&self) -> GuardKind {
        GuardKind::Custom
    }

    /// Decide whether the navigation may proceed
    async fn evaluate(&self, ctx: &NavigationContext) -> GuardOutcome;
}

/// Guard backed by a synchronous closure
pub struct FnGuard<F> {
    name: String,
    kind: GuardKind,
    check: F,
}

impl<F> FnGuard<F>
where
    F: Fn(&NavigationContext) -> GuardOutcome + Send + Sync,
{
    pub fn new(name: impl Into<String>, check: F) -> Self {
        Self {
            name: name.into(),
            kind: GuardKind::Custom,
            check,
        }
    }

    pub fn with_kind(mut self, kind: GuardKind) -> Self {
        self.kind = kind;
        self
    }
}

#[async_trait]
impl<F> Guard for FnGuard<F>
where
    F: Fn(&NavigationContext) -> GuardOutcome + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> GuardKind {
        self.kind
    }

    async fn evaluate(&self, ctx: &NavigationContext) -> GuardOutcome {
        (self.check)(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::RoutePath;
    use crate::types::NavigationRequest;

    #[tokio::test]
    async fn test_fn_guard_reads_metadata() {
        let guard = FnGuard::new("FeatureFlag", |ctx: &NavigationContext| {
            if ctx.metadata("beta") == Some("1") {
                GuardOutcome::Allow
            } else {
                GuardOutcome::Deny(DenyReason::Rejected {
                    reason: "beta only".to_string(),
                })
            }
        });

        let request = NavigationRequest::new("x");
        let ctx = NavigationContext::new(RoutePath::parse("x?beta=1"), &request);
        assert_eq!(guard.evaluate(&ctx).await, GuardOutcome::Allow);

        let ctx = NavigationContext::new(RoutePath::parse("x"), &request);
        assert!(!guard.evaluate(&ctx).await.is_allow());
        assert_eq!(guard.kind(), GuardKind::Custom);
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(GuardOutcome::RedirectTo("home".into())).unwrap();
        assert_eq!(json, serde_json::json!({"type": "redirect_to", "value": "home"}));
    }
}

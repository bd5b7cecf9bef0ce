//! Role authorization check

use async_trait::async_trait;

use super::{DenyReason, Guard, GuardKind, GuardOutcome};
use crate::context::NavigationContext;
use crate::types::RoleToken;

/// Requires the principal's role to be one of a fixed set
///
/// Attached implicitly to every route node that declares required roles.
/// A missing principal is reported as [`DenyReason::AuthRequired`], an
/// authenticated principal outside the set as
/// [`DenyReason::InsufficientRole`]. Neither case redirects.
#[derive(Debug, Clone)]
pub struct RoleGuard {
    required: Vec<RoleToken>,
}

impl RoleGuard {
    /// Create a role guard; duplicate tokens are collapsed, order is kept
    pub fn new(required: impl IntoIterator<Item = RoleToken>) -> Self {
        let mut roles: Vec<RoleToken> = Vec::new();
        for role in required {
            if !roles.contains(&role) {
                roles.push(role);
            }
        }
        Self { required: roles }
    }

    pub fn required(&self) -> &[RoleToken] {
        &self.required
    }

    /// Check a role against the required set
    pub fn permits(&self, role: &RoleToken) -> bool {
        self.required.contains(role)
    }
}

#[async_trait]
impl Guard for RoleGuard {
    fn name(&self) -> &str {
        "RoleGuard"
    }

    fn kind(&self) -> GuardKind {
        GuardKind::Role
    }

    async fn evaluate(&self, ctx: &NavigationContext) -> GuardOutcome {
        match ctx.principal() {
            None => GuardOutcome::Deny(DenyReason::AuthRequired),
            Some(principal) if self.permits(&principal.role) => GuardOutcome::Allow,
            Some(principal) => GuardOutcome::Deny(DenyReason::InsufficientRole {
                required: self.required.clone(),
                actual: principal.role.clone(),
            }),
        }
    }
}

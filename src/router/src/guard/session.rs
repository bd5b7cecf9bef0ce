//! Session guards: authentication, guest-only pages and single sign-on
//!
//! The session backends are external collaborators reached through
//! [`AuthStateProvider`] and [`SsoValidator`]. The bundled implementations
//! cover the common case and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::{DenyReason, Guard, GuardKind, GuardOutcome};
use crate::context::NavigationContext;
use crate::types::SessionId;

/// Metadata key carrying a single-use SSO ticket
pub const SSO_TICKET_KEY: &str = "sso_ticket";

/// Answers whether the navigation runs under a valid session
#[async_trait]
pub trait AuthStateProvider: Send + Sync {
    /// Is there a valid session
    async fn has_valid_session(&self, ctx: &NavigationContext) -> bool;

    /// Is there not a valid session
    async fn has_no_valid_session(&self, ctx: &NavigationContext) -> bool {
        !self.has_valid_session(ctx).await
    }
}

/// Treats a navigation carrying a principal as authenticated
#[derive(Debug, Clone, Copy, Default)]
pub struct PrincipalAuthState;

#[async_trait]
impl AuthStateProvider for PrincipalAuthState {
    async fn has_valid_session(&self, ctx: &NavigationContext) -> bool {
        ctx.principal().is_some()
    }
}

/// Allows only authenticated navigations
pub struct AuthGuard {
    provider: Arc<dyn AuthStateProvider>,
}

impl AuthGuard {
    pub fn new(provider: Arc<dyn AuthStateProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Guard for AuthGuard {
    fn name(&self) -> &str {
        "AuthGuard"
    }

    fn kind(&self) -> GuardKind {
        GuardKind::Authentication
    }

    async fn evaluate(&self, ctx: &NavigationContext) -> GuardOutcome {
        if self.provider.has_valid_session(ctx).await {
            GuardOutcome::Allow
        } else {
            GuardOutcome::Deny(DenyReason::AuthRequired)
        }
    }
}

/// Allows only anonymous navigations; signed-in users are sent elsewhere
pub struct NoAuthGuard {
    provider: Arc<dyn AuthStateProvider>,
    redirect_to: String,
}

impl NoAuthGuard {
    /// Redirects authenticated users to the root path
    pub fn new(provider: Arc<dyn AuthStateProvider>) -> Self {
        Self::with_redirect(provider, "")
    }

    pub fn with_redirect(provider: Arc<dyn AuthStateProvider>, redirect_to: impl Into<String>) -> Self {
        Self {
            provider,
            redirect_to: redirect_to.into(),
        }
    }
}

#[async_trait]
impl Guard for NoAuthGuard {
    fn name(&self) -> &str {
        "NoAuthGuard"
    }

    fn kind(&self) -> GuardKind {
        GuardKind::Guest
    }

    async fn evaluate(&self, ctx: &NavigationContext) -> GuardOutcome {
        if self.provider.has_no_valid_session(ctx).await {
            GuardOutcome::Allow
        } else {
            GuardOutcome::RedirectTo(self.redirect_to.clone())
        }
    }
}

/// Single-sign-on session validator
#[async_trait]
pub trait SsoValidator: Send + Sync {
    /// Is the SSO session behind this navigation valid
    async fn validate(&self, ctx: &NavigationContext) -> bool;
}

/// Ticket based SSO validator
///
/// The identity provider hands out single-use tickets bound to a session
/// (see [`TicketSsoValidator::issue_ticket`]). The first navigation that
/// presents a ticket in its `sso_ticket` metadata consumes it and marks the
/// session as validated; later navigations of that session pass without a
/// ticket until the session is revoked.
#[derive(Debug, Default)]
pub struct TicketSsoValidator {
    /// Outstanding tickets (ticket -> session)
    tickets: DashMap<String, SessionId>,
    /// Validated sessions with validation time
    validated: DashMap<SessionId, DateTime<Utc>>,
}

impl TicketSsoValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a single-use ticket for a session
    pub fn issue_ticket(&self, session: &SessionId) -> String {
        let ticket = Uuid::new_v4().to_string();
        self.tickets.insert(ticket.clone(), session.clone());
        ticket
    }

    /// Mark a session as validated without a ticket
    pub fn mark_validated(&self, session: &SessionId) {
        self.validated.insert(session.clone(), Utc::now());
    }

    /// Forget a validated session
    pub fn revoke(&self, session: &SessionId) -> bool {
        self.validated.remove(session).is_some()
    }

    pub fn is_validated(&self, session: &SessionId) -> bool {
        self.validated.contains_key(session)
    }
}

#[async_trait]
impl SsoValidator for TicketSsoValidator {
    async fn validate(&self, ctx: &NavigationContext) -> bool {
        let Some(session) = ctx.session() else {
            return false;
        };

        if self.validated.contains_key(session) {
            return true;
        }

        let Some(ticket) = ctx.metadata(SSO_TICKET_KEY) else {
            return false;
        };

        // Tickets are consumed only by the session they were issued to
        match self.tickets.remove_if(ticket, |_, owner| owner == session) {
            Some(_) => {
                info!(session = %session, "SSO ticket consumed, session validated");
                self.validated.insert(session.clone(), Utc::now());
                true
            }
            None => {
                debug!(session = %session, "SSO ticket rejected");
                false
            }
        }
    }
}

/// Requires a valid single-sign-on session
pub struct SsoGuard {
    validator: Arc<dyn SsoValidator>,
}

impl SsoGuard {
    pub fn new(validator: Arc<dyn SsoValidator>) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl Guard for SsoGuard {
    fn name(&self) -> &str {
        "SsoGuard"
    }

    fn kind(&self) -> GuardKind {
        GuardKind::Sso
    }

    async fn evaluate(&self, ctx: &NavigationContext) -> GuardOutcome {
        if self.validator.validate(ctx).await {
            GuardOutcome::Allow
        } else {
            GuardOutcome::Deny(DenyReason::AuthRequired)
        }
    }
}

//! Portal application route table
//!
//! The same table is available in code ([`app_routes`]) and as a route file
//! ([`PORTAL_ROUTES_TOML`], loaded through [`portal_config`]).

use serde_json::json;
use std::sync::Arc;

use crate::config::{Registry, RouterConfig};
use crate::error::Result;
use crate::guard::{
    AuthGuard, AuthStateProvider, Guard, NoAuthGuard, PrincipalAuthState, SsoGuard, SsoValidator,
    TicketSsoValidator,
};
use crate::resolver::{DataResolver, StaticResolver};
use crate::tree::{AuthEnforcement, RouteNode, RouteTree};

/// Bundled portal route file
pub const PORTAL_ROUTES_TOML: &str = include_str!("../config/portal.toml");

/// Landing page for the empty path and after sign-in
pub const DEFAULT_ROUTE: &str = "dashboards/analytics";

/// Context key of the admin layout's initial data
pub const INITIAL_DATA_KEY: &str = "initialData";

pub const AUTH_GUARD: &str = "auth";
pub const NO_AUTH_GUARD: &str = "no-auth";
pub const SSO_GUARD: &str = "sso";
pub const INITIAL_DATA_RESOLVER: &str = "initial-data";

/// External collaborators behind the portal guards and resolver
#[derive(Clone)]
pub struct PortalCollaborators {
    pub auth_state: Arc<dyn AuthStateProvider>,
    pub sso: Arc<dyn SsoValidator>,
    pub initial_data: Arc<dyn DataResolver>,
}

impl PortalCollaborators {
    pub fn new(
        auth_state: Arc<dyn AuthStateProvider>,
        sso: Arc<dyn SsoValidator>,
        initial_data: Arc<dyn DataResolver>,
    ) -> Self {
        Self {
            auth_state,
            sso,
            initial_data,
        }
    }
}

impl Default for PortalCollaborators {
    /// Principal-based auth state, ticket SSO and an empty navigation menu
    fn default() -> Self {
        Self::new(
            Arc::new(PrincipalAuthState),
            Arc::new(TicketSsoValidator::new()),
            Arc::new(StaticResolver::new(
                "InitialDataResolver",
                json!({ "navigation": [] }),
            )),
        )
    }
}

/// Guard and resolver names used by the portal route file
pub fn portal_registry(collab: &PortalCollaborators) -> Registry {
    Registry::new()
        .with_guard(AUTH_GUARD, Arc::new(AuthGuard::new(collab.auth_state.clone())))
        .with_guard(
            NO_AUTH_GUARD,
            Arc::new(NoAuthGuard::new(collab.auth_state.clone())),
        )
        .with_guard(SSO_GUARD, Arc::new(SsoGuard::new(collab.sso.clone())))
        .with_resolver(INITIAL_DATA_RESOLVER, collab.initial_data.clone())
}

/// Parse the bundled portal route file
pub fn portal_config() -> Result<RouterConfig> {
    RouterConfig::from_toml_str(PORTAL_ROUTES_TOML)
}

/// Build the portal route tree in code
pub fn app_routes(collab: &PortalCollaborators, enforcement: AuthEnforcement) -> Result<RouteTree> {
    let auth: Arc<dyn Guard> = Arc::new(AuthGuard::new(collab.auth_state.clone()));
    let no_auth: Arc<dyn Guard> = Arc::new(NoAuthGuard::new(collab.auth_state.clone()));
    let sso: Arc<dyn Guard> = Arc::new(SsoGuard::new(collab.sso.clone()));
    let empty_layout = || RouteNode::new("").data("layout", json!("empty"));

    let routes = vec![
        RouteNode::redirect("", DEFAULT_ROUTE),
        RouteNode::redirect("signed-in-redirect", DEFAULT_ROUTE),
        // Auth routes for guests
        empty_layout()
            .guard(no_auth.clone())
            .child_guard(no_auth)
            .child(RouteNode::new("confirmation-required").load("AuthConfirmationRequiredModule"))
            .child(RouteNode::new("sso").load("SsoModule"))
            .child(RouteNode::new("sign-up").load("AuthSignUpModule")),
        // Auth routes for authenticated users
        empty_layout()
            .guard(auth.clone())
            .child_guard(auth.clone())
            .child(RouteNode::new("sign-out").load("AuthSignOutModule")),
        // Landing routes
        empty_layout().child(RouteNode::new("home").load("LandingHomeModule")),
        // Admin routes
        RouteNode::new("")
            .guard(auth.clone())
            .child_guard(auth)
            .child_guard(sso)
            .resolve(INITIAL_DATA_KEY, collab.initial_data.clone())
            .child(
                RouteNode::new("dashboards")
                    .child(RouteNode::new("analytics").load("AnalyticsModule")),
            )
            .child(admin_apps())
            .child(admin_pages()),
    ];

    RouteTree::build(routes, enforcement)
}

fn admin_apps() -> RouteNode {
    RouteNode::new("apps")
        .child(
            RouteNode::new("portal-manager")
                .roles(["SuperAdmin", "Admin"])
                .load("PortalManagerModule"),
        )
        .child(
            RouteNode::new("organizaciones")
                .roles(["SuperAdmin"])
                .load("OrganizacionModule"),
        )
        .child(RouteNode::new("usuarios").load("UsersModule"))
        .child(
            RouteNode::new("file-manager")
                .roles(["SuperAdmin", "Admin"])
                .load("FileManagerModule"),
        )
        .child(
            RouteNode::new("network-manager")
                .roles(["SuperAdmin"])
                .load("NetworkManagerModule"),
        )
        .child(
            RouteNode::new("network-viewer")
                .roles(["Admin"])
                .load("NetworkViewerModule"),
        )
}

fn admin_pages() -> RouteNode {
    RouteNode::new("pages")
        .child(
            RouteNode::new("settings")
                .roles(["SuperAdmin", "Admin"])
                .load("SettingsModule"),
        )
        .child(RouteNode::new("coming-soon").load("ComingSoonModule"))
        .child(
            RouteNode::new("error")
                .child(RouteNode::new("404").load("Error404Module"))
                .child(RouteNode::new("500").load("Error500Module")),
        )
}

//! # Portal Router
//!
//! Navigation-authorization engine for the portal single-page application.
//!
//! ## Features
//!
//! - **Immutable route tree** built once at startup and shared by reference
//! - **Guard composition** evaluated root-to-leaf with short-circuiting
//! - **Role checks** attached to route nodes as opaque role tokens
//! - **Initial data resolvers** ordered by tree depth, concurrent within a node
//! - **Deferred module loaders** with an optional identifier cache
//! - **Session supersession** via cooperative cancellation tokens
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use portal_router::{
//!     EngineConfig, NavigationRequest, Principal, ResolutionEngine, RouteNode, RouteTree,
//!     loader::StaticLoader,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tree = Arc::new(RouteTree::new(vec![
//!     RouteNode::redirect("", "home"),
//!     RouteNode::new("home").load("HomeModule"),
//! ])?);
//! let loader = Arc::new(StaticLoader::from_tree(&tree));
//! let engine = ResolutionEngine::new(tree, loader, EngineConfig::default());
//!
//! let outcome = engine
//!     .navigate(NavigationRequest::new("").with_principal(Principal::new("alice", "Admin")))
//!     .await;
//! assert!(outcome.is_committed());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod guard;
pub mod loader;
pub mod portal;
pub mod resolver;
pub mod tree;
pub mod types;

// Re-export commonly used types
pub use context::{NavigationContext, NavigationState};
pub use engine::{
    DenyCause, EngineConfig, NavigationOutcome, ResolutionEngine, ResolvedNavigation,
    SessionNavigator,
};
pub use error::{Result, RouterError};
pub use guard::{Guard, GuardKind, GuardOutcome};
pub use loader::{Artifact, LoadError, ModuleLoader};
pub use resolver::{DataResolver, ResolveError};
pub use tree::{AuthEnforcement, RouteNode, RoutePath, RouteTree};
pub use types::{ModuleId, NavigationRequest, Principal, RoleToken, SessionId};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! portal-route: resolve one navigation against the portal route table
//!
//! Prints the navigation outcome as JSON on stdout; logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use portal_router::config::RouterConfig;
use portal_router::guard::TicketSsoValidator;
use portal_router::loader::{CachingLoader, StaticLoader};
use portal_router::portal::{portal_config, portal_registry, PortalCollaborators};
use portal_router::{
    AuthEnforcement, NavigationRequest, Principal, ResolutionEngine, SessionId,
};

/// Portal route resolver CLI
#[derive(Parser)]
#[command(name = "portal-route")]
#[command(about = "Resolve a navigation against the portal route table")]
#[command(version)]
struct Cli {
    /// Path to resolve (e.g., apps/organizaciones)
    path: String,

    /// Route file (defaults to the bundled portal table)
    #[arg(short, long, env = "PORTAL_ROUTES")]
    config: Option<PathBuf>,

    /// Principal id; anonymous when omitted
    #[arg(long, env = "PORTAL_PRINCIPAL")]
    principal: Option<String>,

    /// Principal role token
    #[arg(long, default_value = "Admin", env = "PORTAL_ROLE")]
    role: String,

    /// Session id
    #[arg(long, default_value = "cli", env = "PORTAL_SESSION")]
    session: String,

    /// Treat the session as SSO-validated
    #[arg(long)]
    sso: bool,

    /// Drop authentication guards while building the tree
    #[arg(long)]
    disable_auth: bool,

    /// Print Prometheus metrics after the outcome
    #[arg(long)]
    metrics: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},portal_router={}", log_level, log_level).into()),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let sso = Arc::new(TicketSsoValidator::new());
    if cli.sso {
        sso.mark_validated(&SessionId::new(cli.session.as_str()));
    }
    let collab = PortalCollaborators {
        sso: sso.clone(),
        ..PortalCollaborators::default()
    };

    let mut config = match &cli.config {
        Some(path) => RouterConfig::from_file(path)
            .with_context(|| format!("Failed to load route file {}", path.display()))?,
        None => portal_config().context("Failed to parse bundled route table")?,
    };
    if cli.disable_auth {
        config.engine.auth_enforcement = AuthEnforcement::Disabled;
    }

    let tree = Arc::new(
        config
            .build_tree(&portal_registry(&collab))
            .context("Failed to build route tree")?,
    );
    let loader = Arc::new(CachingLoader::new(StaticLoader::from_tree(&tree)));
    let engine = ResolutionEngine::new(tree, loader, config.engine_config());

    let mut request = NavigationRequest::new(cli.path.as_str()).with_session(cli.session.as_str());
    if let Some(id) = cli.principal {
        request = request.with_principal(Principal::new(id, cli.role));
    }

    let outcome = engine.navigate(request).await;
    info!(outcome = outcome.label(), "navigation resolved");

    let json = serde_json::to_string_pretty(&outcome).context("Failed to serialize outcome")?;
    println!("{}", json);

    if cli.metrics {
        if let Some(metrics) = engine.export_prometheus().await {
            println!("{}", metrics);
        }
    }

    Ok(())
}

//! Resolution engine
//!
//! Walks the route tree for a requested path, evaluates guards root-to-leaf,
//! runs initial data resolvers and deferred loaders, and reports a
//! [`NavigationOutcome`].

pub mod metrics;
pub mod outcome;
pub mod session;

pub use metrics::{MetricsCollector, NavigationMetrics};
pub use outcome::{DenyCause, NavigationOutcome, ResolvedNavigation, RouteSummary};
pub use session::SessionNavigator;

use chrono::Utc;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::context::{NavigationContext, NavigationState};
use crate::guard::{evaluate_chain, ChainVerdict, DenyReason};
use crate::loader::{Artifact, LoadError, ModuleLoader};
use crate::resolver::{DataResolver, ResolveError};
use crate::tree::{join_path, RouteNode, RoutePath, RouteTree};
use crate::types::{ModuleId, NavigationRequest};

/// Resolution engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of redirects followed by one navigation
    pub max_redirects: usize,

    /// Upper bound for a single resolver call
    pub resolver_timeout: Duration,

    /// Upper bound for a single module load
    pub loader_timeout: Duration,

    /// Restart internally on redirects instead of returning them
    pub follow_redirects: bool,

    /// Enable metrics collection
    pub enable_metrics: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_redirects: 8,
            resolver_timeout: Duration::from_secs(10),
            loader_timeout: Duration::from_secs(30),
            follow_redirects: true,
            enable_metrics: true,
        }
    }
}

/// Result of one resolution attempt
enum Step {
    Done(NavigationOutcome),
    Redirect { from: String, to: String },
}

/// Navigation resolution engine
///
/// # Pipeline
///
/// ```text
/// Request → Matching → GuardEvaluating → Resolving → Loading → Committed
///              ↓              ↓               ↓          ↓
///          NotFound   Denied / Redirect    Denied     Denied
///                            ↓
///                    restart at target (bounded)
/// ```
///
/// The engine holds no per-navigation state; any number of navigations may
/// run concurrently against one instance.
pub struct ResolutionEngine {
    tree: Arc<RouteTree>,
    loader: Arc<dyn ModuleLoader>,
    metrics: Option<Arc<MetricsCollector>>,
    config: EngineConfig,
}

impl ResolutionEngine {
    pub fn new(tree: Arc<RouteTree>, loader: Arc<dyn ModuleLoader>, config: EngineConfig) -> Self {
        let metrics = if config.enable_metrics {
            Some(Arc::new(MetricsCollector::new()))
        } else {
            None
        };

        info!(
            routes = tree.len(),
            max_redirects = config.max_redirects,
            follow_redirects = config.follow_redirects,
            metrics = config.enable_metrics,
            "ResolutionEngine initialized"
        );

        Self {
            tree,
            loader,
            metrics,
            config,
        }
    }

    pub fn tree(&self) -> &Arc<RouteTree> {
        &self.tree
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolve a navigation that cannot be superseded
    pub async fn navigate(&self, request: NavigationRequest) -> NavigationOutcome {
        self.navigate_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Resolve a navigation, giving up as soon as `cancel` fires
    ///
    /// A cancelled navigation reports [`NavigationOutcome::Cancelled`] and
    /// never invokes a loader after the cancellation was observed.
    pub async fn navigate_with_cancel(
        &self,
        request: NavigationRequest,
        cancel: CancellationToken,
    ) -> NavigationOutcome {
        let start = Instant::now();
        let outcome = self.run(&request, &cancel).await;

        match &outcome {
            NavigationOutcome::Committed(navigation) => info!(
                navigation = %navigation.id,
                requested = %request.path,
                path = %navigation.path,
                redirects = navigation.redirects.len(),
                artifacts = navigation.artifacts.len(),
                "navigation committed"
            ),
            NavigationOutcome::Cancelled { path } => {
                warn!(requested = %request.path, path = %path, "navigation cancelled")
            }
            other => debug!(requested = %request.path, outcome = other.label(), "navigation finished"),
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_outcome(&outcome).await;
            metrics.record_latency(start.elapsed()).await;
        }

        outcome
    }

    /// Get engine metrics
    pub async fn get_metrics(&self) -> Option<NavigationMetrics> {
        match &self.metrics {
            Some(metrics) => Some(metrics.get_metrics().await),
            None => None,
        }
    }

    /// Export metrics in Prometheus text format
    pub async fn export_prometheus(&self) -> Option<String> {
        match &self.metrics {
            Some(metrics) => Some(metrics.export_prometheus().await),
            None => None,
        }
    }

    async fn run(&self, request: &NavigationRequest, cancel: &CancellationToken) -> NavigationOutcome {
        let mut path = RoutePath::parse(&request.path);
        let mut trail: Vec<String> = Vec::new();

        loop {
            match self.attempt(path, request, &trail, cancel).await {
                Step::Done(outcome) => return outcome,
                Step::Redirect { from, to } => {
                    if !self.config.follow_redirects {
                        return NavigationOutcome::Redirected { from, to };
                    }

                    trail.push(from);
                    if trail.len() > self.config.max_redirects {
                        trail.push(to);
                        error!(
                            requested = %request.path,
                            trail = ?trail,
                            max_redirects = self.config.max_redirects,
                            "redirect loop detected"
                        );
                        return NavigationOutcome::FatalRedirectLoop { trail };
                    }

                    debug!(to = %to, hops = trail.len(), "following redirect");
                    path = RoutePath::parse(&to);
                }
            }
        }
    }

    /// One pass through the state machine with a fresh context
    async fn attempt(
        &self,
        path: RoutePath,
        request: &NavigationRequest,
        trail: &[String],
        cancel: &CancellationToken,
    ) -> Step {
        let mut ctx = NavigationContext::new(path, request);
        let current = ctx.path().as_str().to_string();

        if cancel.is_cancelled() {
            return Step::Done(cancelled(&current));
        }

        let matched = self.tree.match_path(ctx.path());
        if !matched.is_resolved() {
            ctx.transition(NavigationState::NotFound);
            return Step::Done(NavigationOutcome::NotFound {
                path: current,
                unmatched: matched.leftover().to_vec(),
            });
        }

        if let Some(target) = matched.terminal().redirect_target() {
            ctx.transition(NavigationState::Redirected);
            debug!(from = %current, to = target, "redirect alias matched");
            return Step::Redirect {
                from: current,
                to: target.to_string(),
            };
        }

        let chain = matched.chain();
        let terminal = chain.len() - 1;

        // Guards, pulling ancestor resolvers forward for nodes that need their keys
        ctx.transition(NavigationState::GuardEvaluating);
        let mut resolved_upto = 0;
        for (depth, node) in chain.iter().enumerate() {
            if !node.required_keys().is_empty() && resolved_upto < depth {
                ctx.transition(NavigationState::Resolving);
                if let Err(outcome) = self
                    .resolve_nodes(&chain[resolved_upto..depth], &mut ctx, cancel)
                    .await
                {
                    return Step::Done(outcome);
                }
                resolved_upto = depth;
                ctx.transition(NavigationState::GuardEvaluating);
            }

            match evaluate_chain(node.entry_guards(depth == terminal), &ctx, cancel).await {
                ChainVerdict::Pass => {}
                ChainVerdict::Cancelled => return Step::Done(cancelled(&current)),
                ChainVerdict::Redirect { guard, to } => {
                    ctx.transition(NavigationState::Redirected);
                    debug!(from = %current, to = %to, guard = %guard, "guard redirected");
                    return Step::Redirect { from: current, to };
                }
                ChainVerdict::Deny { guard, reason } => {
                    let cause = deny_cause(guard, reason);
                    ctx.transition(NavigationState::Denied);
                    info!(path = %current, cause = ?cause, "navigation denied by guard");
                    return Step::Done(NavigationOutcome::Denied {
                        path: current,
                        cause,
                    });
                }
            }
        }

        ctx.transition(NavigationState::Resolving);
        if let Err(outcome) = self
            .resolve_nodes(&chain[resolved_upto..], &mut ctx, cancel)
            .await
        {
            return Step::Done(outcome);
        }

        ctx.transition(NavigationState::Loading);
        let mut artifacts = Vec::new();
        for (depth, node) in chain.iter().enumerate() {
            let Some(module) = node.loader() else {
                continue;
            };
            if depth != terminal && !node.is_always_loaded() {
                continue;
            }
            if cancel.is_cancelled() {
                return Step::Done(cancelled(&current));
            }

            match self.load_module(module, &ctx, cancel).await {
                Ok(artifact) => artifacts.push(artifact),
                Err(LoadError::Cancelled) => return Step::Done(cancelled(&current)),
                Err(cause) => {
                    ctx.transition(NavigationState::Denied);
                    warn!(path = %current, module = %module, error = %cause, "module load failed");
                    return Step::Done(NavigationOutcome::Denied {
                        path: current,
                        cause: DenyCause::LoaderFailure {
                            module: module.clone(),
                            cause,
                        },
                    });
                }
            }
        }

        // A navigation superseded during the last load must not commit
        if cancel.is_cancelled() {
            return Step::Done(cancelled(&current));
        }

        ctx.transition(NavigationState::Committed);
        let summaries = summarize(chain);
        let route_data = chain.iter().fold(BTreeMap::new(), |mut merged, node| {
            merged.extend(node.route_data().clone());
            merged
        });

        Step::Done(NavigationOutcome::Committed(ResolvedNavigation {
            id: ctx.id(),
            path: current,
            requested: request.path.clone(),
            redirects: trail.to_vec(),
            chain: summaries,
            data: ctx.into_resolved(),
            route_data,
            artifacts,
            committed_at: Utc::now(),
        }))
    }

    /// Run the resolvers of `nodes` in depth order, concurrently within a node
    async fn resolve_nodes(
        &self,
        nodes: &[&RouteNode],
        ctx: &mut NavigationContext,
        cancel: &CancellationToken,
    ) -> std::result::Result<(), NavigationOutcome> {
        for node in nodes {
            if node.resolvers().is_empty() {
                continue;
            }
            if cancel.is_cancelled() {
                return Err(cancelled(ctx.path().as_str()));
            }

            let results = {
                let shared = &*ctx;
                join_all(node.resolvers().iter().map(|(key, resolver)| async move {
                    (key, self.run_resolver(key, resolver.as_ref(), shared, cancel).await)
                }))
                .await
            };

            for (key, result) in results {
                match result {
                    Ok(value) => ctx.insert_resolved(key.clone(), value),
                    Err(ResolveError::Cancelled) => return Err(cancelled(ctx.path().as_str())),
                    Err(cause) => {
                        ctx.transition(NavigationState::Denied);
                        warn!(path = %ctx.path(), key = %key, error = %cause, "resolver failed");
                        return Err(NavigationOutcome::Denied {
                            path: ctx.path().as_str().to_string(),
                            cause: DenyCause::ResolverFailure {
                                key: key.clone(),
                                cause,
                            },
                        });
                    }
                }
            }
        }

        Ok(())
    }

    async fn run_resolver(
        &self,
        key: &str,
        resolver: &dyn DataResolver,
        ctx: &NavigationContext,
        cancel: &CancellationToken,
    ) -> std::result::Result<serde_json::Value, ResolveError> {
        let limit = effective_timeout(self.config.resolver_timeout, ctx);
        debug!(navigation = %ctx.id(), key, resolver = resolver.name(), "resolver started");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ResolveError::Cancelled),
            result = tokio::time::timeout(limit, resolver.resolve(ctx)) => match result {
                Ok(result) => result,
                Err(_) => Err(ResolveError::Timeout {
                    after_ms: limit.as_millis() as u64,
                }),
            },
        }
    }

    async fn load_module(
        &self,
        module: &ModuleId,
        ctx: &NavigationContext,
        cancel: &CancellationToken,
    ) -> std::result::Result<Artifact, LoadError> {
        let limit = effective_timeout(self.config.loader_timeout, ctx);
        debug!(navigation = %ctx.id(), module = %module, "loading module");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(LoadError::Cancelled),
            result = tokio::time::timeout(limit, self.loader.load(module)) => match result {
                Ok(result) => result,
                Err(_) => Err(LoadError::Timeout {
                    after_ms: limit.as_millis() as u64,
                }),
            },
        }
    }
}

fn cancelled(path: &str) -> NavigationOutcome {
    NavigationOutcome::Cancelled {
        path: path.to_string(),
    }
}

fn deny_cause(guard: String, reason: DenyReason) -> DenyCause {
    match reason {
        DenyReason::AuthRequired => DenyCause::AuthRequired { guard },
        DenyReason::InsufficientRole { required, actual } => DenyCause::InsufficientRole {
            guard,
            required,
            actual,
        },
        DenyReason::Rejected { reason } => DenyCause::Guard { guard, reason },
    }
}

/// Configured timeout tightened by the caller's deadline
fn effective_timeout(configured: Duration, ctx: &NavigationContext) -> Duration {
    match ctx.deadline() {
        Some(deadline) => configured.min(deadline.saturating_duration_since(tokio::time::Instant::now())),
        None => configured,
    }
}

/// Summaries of the matched nodes below the root
fn summarize(chain: &[&RouteNode]) -> Vec<RouteSummary> {
    let terminal = chain.len() - 1;
    let mut path = String::new();

    chain
        .iter()
        .enumerate()
        .skip(1)
        .map(|(depth, node)| {
            path = join_path(&path, node.segment());
            RouteSummary {
                segment: node.segment().to_string(),
                path: path.clone(),
                module: node.loader().cloned(),
                roles: node.required_roles().map(<[_]>::to_vec).unwrap_or_default(),
                guards: node
                    .entry_guards(depth == terminal)
                    .iter()
                    .map(|guard| guard.name().to_string())
                    .collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::{FnGuard, GuardOutcome};
    use crate::loader::StaticLoader;
    use crate::resolver::StaticResolver;
    use crate::types::Principal;
    use serde_json::json;

    fn engine(routes: Vec<RouteNode>, config: EngineConfig) -> ResolutionEngine {
        let tree = Arc::new(RouteTree::new(routes).unwrap());
        let loader = Arc::new(StaticLoader::from_tree(&tree));
        ResolutionEngine::new(tree, loader, config)
    }

    #[tokio::test]
    async fn test_alias_restarts_resolution() {
        let engine = engine(
            vec![
                RouteNode::redirect("", "home"),
                RouteNode::new("home").load("HomeModule"),
            ],
            EngineConfig::default(),
        );

        let outcome = engine.navigate(NavigationRequest::new("")).await;
        let navigation = outcome.committed().unwrap();

        assert_eq!(navigation.path, "home");
        assert_eq!(navigation.requested, "");
        assert_eq!(navigation.redirects, vec![String::new()]);
        assert_eq!(navigation.module(), Some(&ModuleId::new("HomeModule")));
        assert!(navigation.artifact("HomeModule").is_some());
    }

    #[tokio::test]
    async fn test_redirect_returned_when_not_followed() {
        let engine = engine(
            vec![
                RouteNode::redirect("old", "home"),
                RouteNode::new("home").load("HomeModule"),
            ],
            EngineConfig {
                follow_redirects: false,
                ..EngineConfig::default()
            },
        );

        let outcome = engine.navigate(NavigationRequest::new("old")).await;
        assert_eq!(
            outcome,
            NavigationOutcome::Redirected {
                from: "old".to_string(),
                to: "home".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_rejected_guard_maps_to_guard_cause() {
        let engine = engine(
            vec![RouteNode::new("beta")
                .guard(Arc::new(FnGuard::new("BetaGuard", |_: &NavigationContext| {
                    GuardOutcome::Deny(DenyReason::Rejected {
                        reason: "beta closed".to_string(),
                    })
                })))
                .load("BetaModule")],
            EngineConfig::default(),
        );

        let outcome = engine.navigate(NavigationRequest::new("beta")).await;
        assert_eq!(
            outcome.deny_cause(),
            Some(&DenyCause::Guard {
                guard: "BetaGuard".to_string(),
                reason: "beta closed".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_route_data_merged_and_resolved_data_attached() {
        let engine = engine(
            vec![RouteNode::new("")
                .data("layout", json!("empty"))
                .resolve(
                    "navigation",
                    Arc::new(StaticResolver::new("navigation", json!(["home"]))),
                )
                .child(
                    RouteNode::new("home")
                        .data("title", json!("Home"))
                        .load("HomeModule"),
                )],
            EngineConfig::default(),
        );

        let request = NavigationRequest::new("home").with_principal(Principal::new("alice", "Admin"));
        let outcome = engine.navigate(request).await;
        let navigation = outcome.committed().unwrap();

        assert_eq!(navigation.route_data.get("layout"), Some(&json!("empty")));
        assert_eq!(navigation.route_data.get("title"), Some(&json!("Home")));
        assert_eq!(navigation.data.get("navigation"), Some(&json!(["home"])));
        assert_eq!(navigation.chain_paths(), vec!["", "home"]);
    }

    #[tokio::test]
    async fn test_always_load_ancestor_loaded_first() {
        let engine = engine(
            vec![RouteNode::new("apps")
                .load("AppsShellModule")
                .always_load()
                .child(RouteNode::new("usuarios").load("UsersModule"))],
            EngineConfig::default(),
        );

        let outcome = engine.navigate(NavigationRequest::new("apps/usuarios")).await;
        let modules: Vec<&str> = outcome
            .committed()
            .unwrap()
            .artifacts
            .iter()
            .map(|a| a.module.as_str())
            .collect();
        assert_eq!(modules, vec!["AppsShellModule", "UsersModule"]);
    }

    #[tokio::test]
    async fn test_unknown_module_is_loader_failure() {
        let tree = Arc::new(RouteTree::new(vec![RouteNode::new("home").load("HomeModule")]).unwrap());
        let engine = ResolutionEngine::new(tree, Arc::new(StaticLoader::new()), EngineConfig::default());

        let outcome = engine.navigate(NavigationRequest::new("home")).await;
        assert!(matches!(
            outcome.deny_cause(),
            Some(DenyCause::LoaderFailure {
                cause: LoadError::UnknownModule { .. },
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_metrics_recorded() {
        let engine = engine(
            vec![RouteNode::new("home").load("HomeModule")],
            EngineConfig::default(),
        );

        engine.navigate(NavigationRequest::new("home")).await;
        engine.navigate(NavigationRequest::new("missing")).await;

        let metrics = engine.get_metrics().await.unwrap();
        assert_eq!(metrics.total_navigations, 2);
        assert_eq!(metrics.committed, 1);
        assert_eq!(metrics.not_found, 1);
    }

    #[tokio::test]
    async fn test_metrics_disabled() {
        let engine = engine(
            vec![RouteNode::new("home").load("HomeModule")],
            EngineConfig {
                enable_metrics: false,
                ..EngineConfig::default()
            },
        );

        engine.navigate(NavigationRequest::new("home")).await;
        assert!(engine.get_metrics().await.is_none());
        assert!(engine.export_prometheus().await.is_none());
    }
}

//! Sequential guard chain evaluation

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{DenyReason, Guard, GuardOutcome};
use crate::context::NavigationContext;

/// Result of running an ordered list of guards
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainVerdict {
    /// Every guard allowed
    Pass,

    /// A guard denied; the rest of the chain was skipped
    Deny { guard: String, reason: DenyReason },

    /// A guard redirected; the rest of the chain was skipped
    Redirect { guard: String, to: String },

    /// The navigation was cancelled before the chain finished
    Cancelled,
}

/// Evaluate guards strictly in order (logical AND)
///
/// The cancellation token is checked before every guard and raced against
/// the guard's own suspension points. A cancelled chain reports
/// [`ChainVerdict::Cancelled`] regardless of what the remaining guards would
/// have decided.
pub async fn evaluate_chain<'a, I>(
    guards: I,
    ctx: &NavigationContext,
    cancel: &CancellationToken,
) -> ChainVerdict
where
    I: IntoIterator<Item = &'a Arc<dyn Guard>>,
{
    for guard in guards {
        if cancel.is_cancelled() {
            return ChainVerdict::Cancelled;
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return ChainVerdict::Cancelled,
            outcome = guard.evaluate(ctx) => outcome,
        };

        debug!(
            navigation = %ctx.id(),
            path = %ctx.path(),
            guard = guard.name(),
            outcome = ?outcome,
            "guard evaluated"
        );

        match outcome {
            GuardOutcome::Allow => {}
            GuardOutcome::Deny(reason) => {
                return ChainVerdict::Deny {
                    guard: guard.name().to_string(),
                    reason,
                }
            }
            GuardOutcome::RedirectTo(to) => {
                return ChainVerdict::Redirect {
                    guard: guard.name().to_string(),
                    to,
                }
            }
        }
    }

    ChainVerdict::Pass
}

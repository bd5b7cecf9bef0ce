//! Per-session navigation supersession

use dashmap::DashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use super::{NavigationOutcome, ResolutionEngine};
use crate::types::{NavigationRequest, SessionId};

/// Runs navigations so that a newer navigation of a session cancels the older one
///
/// Requests without a session are passed straight to the engine and never
/// superseded.
pub struct SessionNavigator {
    engine: Arc<ResolutionEngine>,

    /// In-flight navigation per session (ticket, token)
    in_flight: DashMap<SessionId, (Uuid, CancellationToken)>,
}

impl SessionNavigator {
    pub fn new(engine: Arc<ResolutionEngine>) -> Self {
        Self {
            engine,
            in_flight: DashMap::new(),
        }
    }

    pub fn engine(&self) -> &Arc<ResolutionEngine> {
        &self.engine
    }

    /// Resolve a navigation, superseding any in-flight navigation of the same session
    pub async fn navigate(&self, request: NavigationRequest) -> NavigationOutcome {
        let Some(session) = request.session.clone() else {
            return self.engine.navigate(request).await;
        };

        let ticket = Uuid::new_v4();
        let token = CancellationToken::new();

        if let Some((previous, superseded)) = self
            .in_flight
            .insert(session.clone(), (ticket, token.clone()))
        {
            debug!(session = %session, superseded = %previous, "superseding in-flight navigation");
            superseded.cancel();
        }

        let _entry = InFlightEntry {
            in_flight: &self.in_flight,
            session,
            ticket,
        };

        self.engine.navigate_with_cancel(request, token).await
    }

    /// Cancel the in-flight navigation of a session
    pub fn cancel(&self, session: &SessionId) -> bool {
        match self.in_flight.remove(session) {
            Some((_, (_, token))) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of sessions with a navigation in flight
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

/// Clears a session's in-flight entry when its navigation finishes or is dropped
struct InFlightEntry<'a> {
    in_flight: &'a DashMap<SessionId, (Uuid, CancellationToken)>,
    session: SessionId,
    ticket: Uuid,
}

impl Drop for InFlightEntry<'_> {
    fn drop(&mut self) {
        // Only clear the entry if no newer navigation replaced it
        self.in_flight
            .remove_if(&self.session, |_, (current, _)| *current == self.ticket);
    }
}

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, trace, warn};

use crate::auth::identity::{SessionEvent, SessionState};
use crate::events::Subscriber;

/// Default destination for unauthenticated visitors of a protected view
pub const DEFAULT_SIGN_IN_DESTINATION: &str = "/auth/login";
/// Default destination for authenticated visitors of an anonymous-only view
pub const DEFAULT_LANDING_DESTINATION: &str = "/";

/// Navigation capability the routing layer implements.
///
/// Gates enqueue redirects through this; they never navigate directly.
pub trait Navigator: Send + Sync {
    /// Enqueue a navigation to the given destination.
    fn push(&self, destination: &str);
}

/// Render decision produced by a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateDecision {
    /// Session is still loading; render a waiting placeholder, never redirect
    Resolving,
    /// Render the protected content
    Authorized,
    /// Render nothing; a redirect has been enqueued
    Unauthorized,
}

/// Which session condition lets a gate through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GatePolicy {
    RequireIdentity,
    RequireAnonymous,
}

/// Render-gating state machine shared by both gate flavors.
///
/// Re-evaluates on every session state change. The redirect is
/// edge-triggered: one navigation per transition into `Unauthorized`, and
/// never while the session is loading.
struct Gate {
    policy: GatePolicy,
    redirect_to: String,
    navigator: Arc<dyn Navigator>,
    last: Mutex<Option<GateDecision>>,
}

impl Gate {
    fn new(policy: GatePolicy, redirect_to: String, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            policy,
            redirect_to,
            navigator,
            last: Mutex::new(None),
        }
    }

    fn evaluate(&self, state: &SessionState) -> GateDecision {
        if state.loading {
            // Loading is indeterminate; a null identity is not authoritative
            return GateDecision::Resolving;
        }

        let allowed = match self.policy {
            GatePolicy::RequireIdentity => state.identity.is_some(),
            GatePolicy::RequireAnonymous => state.identity.is_none(),
        };

        if allowed {
            GateDecision::Authorized
        } else {
            GateDecision::Unauthorized
        }
    }

    fn observe(&self, state: &SessionState) -> GateDecision {
        let decision = self.evaluate(state);
        let mut last = self.last.lock().unwrap();

        if decision == GateDecision::Unauthorized && *last != Some(GateDecision::Unauthorized) {
            debug!(destination = %self.redirect_to, "Gate denied, enqueueing redirect");
            self.navigator.push(&self.redirect_to);
        }

        *last = Some(decision);
        decision
    }

    async fn watch(&self, mut subscriber: Subscriber<SessionEvent>) {
        loop {
            match subscriber.recv().await {
                Ok(SessionEvent::StateChanged { state }) => {
                    let decision = self.observe(&state);
                    trace!(?decision, "Gate re-evaluated");
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    // Missed intermediate states; the next emission carries
                    // a full snapshot, so just keep going
                    warn!(skipped, "Gate lagged behind session events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}

/// Gate that only renders for authenticated sessions.
///
/// While the session resolves it reports [`GateDecision::Resolving`]; once
/// settled, an absent identity yields [`GateDecision::Unauthorized`] and a
/// single redirect to the configured sign-in destination.
pub struct RequireAuthenticated {
    inner: Gate,
}

impl RequireAuthenticated {
    pub fn new(navigator: Arc<dyn Navigator>) -> Self {
        Self {
            inner: Gate::new(
                GatePolicy::RequireIdentity,
                DEFAULT_SIGN_IN_DESTINATION.to_string(),
                navigator,
            ),
        }
    }

    /// Override the redirect destination.
    pub fn with_redirect(mut self, destination: impl Into<String>) -> Self {
        self.inner.redirect_to = destination.into();
        self
    }

    /// Pure evaluation of a session snapshot.
    pub fn evaluate(&self, state: &SessionState) -> GateDecision {
        self.inner.evaluate(state)
    }

    /// Evaluate, record the decision, and enqueue a redirect on an edge
    /// into `Unauthorized`.
    pub fn observe(&self, state: &SessionState) -> GateDecision {
        self.inner.observe(state)
    }

    /// Re-evaluate on every session event until the stream closes.
    pub async fn watch(&self, subscriber: Subscriber<SessionEvent>) {
        self.inner.watch(subscriber).await
    }
}

/// Gate that only renders for anonymous sessions; the mirror image of
/// [`RequireAuthenticated`].
pub struct RequireAnonymous {
    inner: Gate,
}

impl RequireAnonymous {
    pub fn new(navigator: Arc<dyn Navigator>) -> Self {
        Self {
            inner: Gate::new(
                GatePolicy::RequireAnonymous,
                DEFAULT_LANDING_DESTINATION.to_string(),
                navigator,
            ),
        }
    }

    /// Override the redirect destination.
    pub fn with_redirect(mut self, destination: impl Into<String>) -> Self {
        self.inner.redirect_to = destination.into();
        self
    }

    /// Pure evaluation of a session snapshot.
    pub fn evaluate(&self, state: &SessionState) -> GateDecision {
        self.inner.evaluate(state)
    }

    /// Evaluate, record the decision, and enqueue a redirect on an edge
    /// into `Unauthorized`.
    pub fn observe(&self, state: &SessionState) -> GateDecision {
        self.inner.observe(state)
    }

    /// Re-evaluate on every session event until the stream closes.
    pub async fn watch(&self, subscriber: Subscriber<SessionEvent>) {
        self.inner.watch(subscriber).await
    }
}

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::identity::{AuthResponse, Identity, IdentityPatch, SessionEvent, SessionState};
use crate::auth::providers::AuthHandle;
use crate::events::{EventStream, Subscriber, SESSION_EVENT_BUFFER_SIZE, SESSION_EVENT_CAPACITY};

/// Session controller for the selected provider.
///
/// Holds the current [`SessionState`], orchestrates calls against the
/// provider handle, and publishes a [`SessionEvent`] on every state change
/// so gates and other consumers can re-evaluate.
///
/// Overlapping mutating calls are not serialized; each resolves
/// independently and the last completion wins for held state.
pub struct AuthSession {
    /// The selected provider handle
    service: AuthHandle,
    /// Current identity + loading flag
    state: RwLock<SessionState>,
    /// Event stream for state-change notifications
    events: EventStream<SessionEvent>,
}

impl AuthSession {
    /// Create a controller over the given provider handle.
    ///
    /// The session starts in the resolving state (`loading = true`);
    /// call [`initialize`](Self::initialize) to settle it.
    pub fn new(service: AuthHandle) -> Self {
        Self {
            service,
            state: RwLock::new(SessionState::resolving()),
            events: EventStream::new(SESSION_EVENT_CAPACITY, SESSION_EVENT_BUFFER_SIZE),
        }
    }

    /// Perform the one automatic session resolution.
    ///
    /// Must run once after construction so consumers never observe an
    /// unresolved session; gates treat the state as indeterminate until
    /// this settles.
    pub async fn initialize(&self) {
        info!(provider = self.service.name(), "Initializing auth session");
        self.refresh().await;
    }

    /// Snapshot of the current session state.
    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Currently held identity, if any.
    pub async fn identity(&self) -> Option<Identity> {
        self.state.read().await.identity.clone()
    }

    /// Whether an auth operation is in flight.
    pub async fn loading(&self) -> bool {
        self.state.read().await.loading
    }

    /// Subscribe to session state changes.
    pub fn subscribe(&self) -> Subscriber<SessionEvent> {
        self.events.subscribe()
    }

    /// Re-resolve the session against the provider.
    ///
    /// Absence of an identity is a non-error outcome; the state always
    /// settles with `loading = false`.
    pub async fn refresh(&self) {
        let op = Uuid::new_v4();
        debug!(op = %op, "Refreshing session");
        self.set_loading(true).await;

        let identity = self.service.current_identity().await;
        let authenticated = identity.is_some();

        {
            let mut state = self.state.write().await;
            state.identity = identity;
            state.loading = false;
        }
        self.publish_state().await;

        debug!(op = %op, authenticated, "Session refresh settled");
    }

    /// Create an account and, on success, adopt the new identity.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        attrs: Option<HashMap<String, Value>>,
    ) -> AuthResponse {
        let op = Uuid::new_v4();
        info!(op = %op, provider = self.service.name(), "Signing up");
        self.set_loading(true).await;

        let response = self.service.sign_up(email, password, attrs).await;
        self.adopt_outcome(&response).await;

        if let Some(identity) = response.identity.clone() {
            self.events
                .publish(SessionEvent::SignedIn { identity })
                .await;
        }
        response
    }

    /// Authenticate and, on success, adopt the resolved identity.
    ///
    /// The full response, including any error, is returned to the caller
    /// for display; errors are never swallowed here.
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResponse {
        let op = Uuid::new_v4();
        info!(op = %op, provider = self.service.name(), "Signing in");
        self.set_loading(true).await;

        let response = self.service.sign_in(email, password).await;
        self.adopt_outcome(&response).await;

        if let Some(identity) = response.identity.clone() {
            self.events
                .publish(SessionEvent::SignedIn { identity })
                .await;
        } else {
            debug!(op = %op, "Sign-in did not produce an identity");
        }
        response
    }

    /// Terminate the session.
    ///
    /// Held identity is cleared unconditionally on completion; a provider
    /// problem clearing server-side state must not leave the local session
    /// stuck logged in.
    pub async fn sign_out(&self) {
        let op = Uuid::new_v4();
        info!(op = %op, provider = self.service.name(), "Signing out");
        self.set_loading(true).await;

        self.service.sign_out().await;

        {
            let mut state = self.state.write().await;
            state.identity = None;
            state.loading = false;
        }
        self.publish_state().await;
        self.events.publish(SessionEvent::SignedOut).await;
    }

    /// Request a password reset. Pure delegation; there is no session
    /// state to mutate yet.
    pub async fn reset_password(&self, email: &str) -> Option<String> {
        self.service.request_password_reset(email).await
    }

    /// Update the profile and, on success, replace the held identity.
    /// Does not touch the loading flag.
    pub async fn update_profile(&self, changes: IdentityPatch) -> AuthResponse {
        let response = self.service.update_profile(changes).await;

        if let Some(identity) = response.identity.clone() {
            self.state.write().await.identity = Some(identity.clone());
            self.publish_state().await;
            self.events
                .publish(SessionEvent::ProfileUpdated { identity })
                .await;
        }
        response
    }

    /// Adopt a sign-in/sign-up outcome: successful identities replace the
    /// held one, failures leave it untouched; loading always settles.
    async fn adopt_outcome(&self, response: &AuthResponse) {
        {
            let mut state = self.state.write().await;
            if let Some(identity) = response.identity.clone() {
                state.identity = Some(identity);
            }
            state.loading = false;
        }
        self.publish_state().await;
    }

    async fn set_loading(&self, loading: bool) {
        {
            let mut state = self.state.write().await;
            state.loading = loading;
        }
        self.publish_state().await;
    }

    async fn publish_state(&self) {
        let snapshot = self.state.read().await.clone();
        self.events
            .publish(SessionEvent::StateChanged { state: snapshot })
            .await;
    }
}

//! Gate state-machine tests against a live session controller

use std::sync::Arc;

use authgate::auth::gate::DEFAULT_SIGN_IN_DESTINATION;
use authgate::{
    AuthHandle, AuthResponse, AuthSession, GateDecision, Identity, Navigator,
    RequireAnonymous, RequireAuthenticated, TokenStore,
};

use crate::harness::{FakeProvider, RecordingNavigator};

/// Mounting a protected view with no stored credential renders the
/// waiting placeholder first, then redirects exactly once to the sign-in
/// destination when the session settles unauthenticated.
#[tokio::test]
async fn protected_mount_without_credential_redirects_once() {
    let provider = FakeProvider::new(None);
    let session = AuthSession::new(Arc::clone(&provider) as AuthHandle);

    let nav = RecordingNavigator::new();
    let gate = RequireAuthenticated::new(Arc::clone(&nav) as Arc<dyn Navigator>);

    // Mount: the initial resolution has not settled yet
    assert_eq!(
        gate.observe(&session.state().await),
        GateDecision::Resolving
    );
    assert!(nav.pushes().is_empty());

    session.initialize().await;

    assert_eq!(
        gate.observe(&session.state().await),
        GateDecision::Unauthorized
    );
    assert_eq!(gate.observe(&session.state().await), GateDecision::Unauthorized);
    assert_eq!(nav.pushes(), vec![DEFAULT_SIGN_IN_DESTINATION.to_string()]);
}

/// Gates driven by the event stream re-evaluate on every state change,
/// including the background refresh after mount.
#[tokio::test]
async fn watching_gate_reacts_to_session_events() {
    let provider = FakeProvider::new(None);
    provider
        .script_sign_in(AuthResponse::success(Identity::new("u1", "a@x.com")).with_token("tok"));
    let session = Arc::new(AuthSession::new(Arc::clone(&provider) as AuthHandle));

    let nav = RecordingNavigator::new();
    let gate = Arc::new(RequireAuthenticated::new(
        Arc::clone(&nav) as Arc<dyn Navigator>
    ));

    let subscriber = session.subscribe();
    let watcher = tokio::spawn({
        let gate = Arc::clone(&gate);
        async move { gate.watch(subscriber).await }
    });

    session.initialize().await;
    session.sign_in("a@x.com", "secret123").await;

    // Closing the stream ends the watch loop once the queue drains
    drop(session);
    watcher.await.unwrap();

    // The settle after refresh triggered the one redirect; the sign-in
    // afterwards recovered the gate without further navigation
    assert_eq!(nav.pushes(), vec![DEFAULT_SIGN_IN_DESTINATION.to_string()]);
    assert_eq!(
        gate.evaluate(&authgate::SessionState {
            identity: Some(Identity::new("u1", "a@x.com")),
            loading: false,
        }),
        GateDecision::Authorized
    );
}

/// The anonymous-only gate mirrors the protected gate: it passes signed-out
/// sessions through and redirects signed-in ones to the landing destination.
#[tokio::test]
async fn anonymous_gate_redirects_signed_in_sessions() {
    let provider = FakeProvider::new(Some(Identity::new("u1", "a@x.com")));
    provider.store.set("tok-1").await.unwrap();
    let session = AuthSession::new(Arc::clone(&provider) as AuthHandle);

    let nav = RecordingNavigator::new();
    let gate = RequireAnonymous::new(Arc::clone(&nav) as Arc<dyn Navigator>)
        .with_redirect("/dashboard");

    assert_eq!(
        gate.observe(&session.state().await),
        GateDecision::Resolving
    );

    session.initialize().await;

    assert_eq!(
        gate.observe(&session.state().await),
        GateDecision::Unauthorized
    );
    assert_eq!(nav.pushes(), vec!["/dashboard".to_string()]);

    // Signing out lets the anonymous view render again
    session.sign_out().await;
    assert_eq!(gate.observe(&session.state().await), GateDecision::Authorized);
    assert_eq!(nav.pushes().len(), 1);
}

/// Neither gate ever redirects while the session is loading, whatever the
/// identity value looks like at that moment.
#[tokio::test]
async fn gates_never_redirect_while_loading() {
    let nav = RecordingNavigator::new();
    let authenticated_gate =
        RequireAuthenticated::new(Arc::clone(&nav) as Arc<dyn Navigator>);
    let anonymous_gate = RequireAnonymous::new(Arc::clone(&nav) as Arc<dyn Navigator>);

    let loading_states = [
        authgate::SessionState {
            identity: None,
            loading: true,
        },
        authgate::SessionState {
            identity: Some(Identity::new("u1", "a@x.com")),
            loading: true,
        },
    ];

    for state in &loading_states {
        assert_eq!(authenticated_gate.observe(state), GateDecision::Resolving);
        assert_eq!(anonymous_gate.observe(state), GateDecision::Resolving);
    }

    assert!(nav.pushes().is_empty());
}

//! End-to-end tests for the PocketBase adapter over a real HTTP server

use std::sync::Arc;

use serde_json::json;

use authgate::auth::providers::PocketbaseAuth;
use authgate::auth::store::MemoryTokenStore;
use authgate::{AuthConfig, AuthProvider, AuthSession, IdentityPatch, ProviderKind, TokenStore};

fn adapter_for(server: &mockito::ServerGuard, store: Arc<MemoryTokenStore>) -> PocketbaseAuth {
    crate::harness::init_tracing();
    let config = AuthConfig::new(ProviderKind::Pocketbase).with_api_url(server.url());
    PocketbaseAuth::new(&config).with_store(store)
}

/// Sign-up against a backend returning the created record adopts the
/// normalized identity and settles loading.
#[tokio::test]
async fn sign_up_resolves_the_created_identity() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/collections/users/records")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"id": "u1", "email": "a@x.com", "verified": false}).to_string(),
        )
        .create_async()
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let service: Arc<dyn AuthProvider> = Arc::new(adapter_for(&server, store));
    let session = AuthSession::new(Arc::clone(&service));
    session.initialize().await;

    let response = session.sign_up("a@x.com", "secret123", None).await;

    mock.assert_async().await;
    assert!(response.error.is_none());
    let identity = response.identity.expect("identity");
    assert_eq!(identity.id, "u1");
    assert_eq!(identity.email, "a@x.com");
    assert_eq!(identity.verified, Some(false));

    let state = session.state().await;
    assert_eq!(state.identity.unwrap().id, "u1");
    assert!(!state.loading);
}

/// A rejected sign-in passes the backend message through verbatim and
/// leaves the held identity unchanged.
#[tokio::test]
async fn rejected_sign_in_passes_the_backend_message_through() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/collections/users/auth-with-password")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(json!({"message": "Invalid login credentials"}).to_string())
        .create_async()
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let service: Arc<dyn AuthProvider> = Arc::new(adapter_for(&server, Arc::clone(&store)));
    let session = AuthSession::new(Arc::clone(&service));
    session.initialize().await;

    let response = session.sign_in("a@x.com", "wrong-password").await;

    mock.assert_async().await;
    assert!(response.identity.is_none());
    assert_eq!(response.error.as_deref(), Some("Invalid login credentials"));

    let state = session.state().await;
    assert!(state.identity.is_none());
    assert!(!state.loading);
    assert_eq!(store.get().await.unwrap(), None);
}

/// Successful sign-in stores the issued bearer token before returning.
#[tokio::test]
async fn sign_in_persists_the_issued_token() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/collections/users/auth-with-password")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "token": "pb-token-1",
                "record": {"id": "u1", "email": "a@x.com", "name": "Ada", "verified": true}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let adapter = adapter_for(&server, Arc::clone(&store));

    let response = adapter.sign_in("a@x.com", "secret123").await;

    assert!(response.is_success());
    assert_eq!(response.token.as_deref(), Some("pb-token-1"));
    assert_eq!(store.get().await.unwrap().as_deref(), Some("pb-token-1"));

    let identity = response.identity.unwrap();
    assert_eq!(identity.name.as_deref(), Some("Ada"));
    assert_eq!(identity.verified, Some(true));
}

/// A stored credential the backend rejects on refresh is cleared, and
/// later resolutions stay unauthenticated without re-auth.
#[tokio::test]
async fn stale_credential_is_cleared_on_rejection() {
    let mut server = mockito::Server::new_async().await;
    let refresh = server
        .mock("POST", "/api/collections/users/auth-refresh")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(json!({"message": "Token invalid or expired"}).to_string())
        .expect(1)
        .create_async()
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    store.set("stale-token").await.unwrap();
    let adapter = adapter_for(&server, Arc::clone(&store));

    assert!(adapter.current_identity().await.is_none());
    assert_eq!(store.get().await.unwrap(), None);

    // The cleared slot means no further refresh attempts hit the backend
    assert!(adapter.current_identity().await.is_none());
    refresh.assert_async().await;
}

/// Profile update without a stored credential is a local error with zero
/// network traffic.
#[tokio::test]
async fn update_profile_unauthenticated_issues_no_requests() {
    let mut server = mockito::Server::new_async().await;
    let refresh = server
        .mock("POST", "/api/collections/users/auth-refresh")
        .expect(0)
        .create_async()
        .await;
    let patch = server
        .mock("PATCH", "/api/collections/users/records/u1")
        .expect(0)
        .create_async()
        .await;

    let adapter = adapter_for(&server, Arc::new(MemoryTokenStore::new()));
    let response = adapter.update_profile(IdentityPatch::name("Jane")).await;

    assert!(response.identity.is_none());
    assert_eq!(response.error.as_deref(), Some("Not authenticated"));
    refresh.assert_async().await;
    patch.assert_async().await;
}

/// Authenticated profile update patches the record and returns the
/// updated identity.
#[tokio::test]
async fn update_profile_round_trip() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/collections/users/auth-refresh")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"token": "pb-token-1", "record": {"id": "u1", "email": "a@x.com"}})
                .to_string(),
        )
        .create_async()
        .await;
    let patch = server
        .mock("PATCH", "/api/collections/users/records/u1")
        .match_header("authorization", "Bearer pb-token-1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"id": "u1", "email": "a@x.com", "name": "Jane"}).to_string(),
        )
        .create_async()
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    store.set("pb-token-1").await.unwrap();
    let adapter = adapter_for(&server, store);

    let response = adapter.update_profile(IdentityPatch::name("Jane")).await;

    patch.assert_async().await;
    let identity = response.identity.expect("identity");
    assert_eq!(identity.name.as_deref(), Some("Jane"));
}

/// Sign-out clears held identity and the stored credential even though
/// there is no backend session to revoke.
#[tokio::test]
async fn sign_out_clears_identity_and_credential() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/collections/users/auth-with-password")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"token": "pb-token-1", "record": {"id": "u1", "email": "a@x.com"}})
                .to_string(),
        )
        .create_async()
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let service: Arc<dyn AuthProvider> = Arc::new(adapter_for(&server, Arc::clone(&store)));
    let session = AuthSession::new(Arc::clone(&service));
    session.initialize().await;

    session.sign_in("a@x.com", "secret123").await;
    assert!(session.identity().await.is_some());
    assert!(store.get().await.unwrap().is_some());

    session.sign_out().await;

    assert!(session.identity().await.is_none());
    assert_eq!(store.get().await.unwrap(), None);
    assert!(!session.loading().await);
}

/// Transport-level failures surface as the normalized network error.
#[tokio::test]
async fn unreachable_backend_normalizes_to_network_error() {
    // Nothing is listening on this port
    let config = AuthConfig::new(ProviderKind::Pocketbase).with_api_url("http://127.0.0.1:1");
    let adapter = PocketbaseAuth::new(&config).with_store(Arc::new(MemoryTokenStore::new()));

    let response = adapter.sign_in("a@x.com", "secret123").await;
    assert_eq!(response.error.as_deref(), Some("Network error"));

    let error = adapter.request_password_reset("a@x.com").await;
    assert_eq!(error.as_deref(), Some("Network error"));
}

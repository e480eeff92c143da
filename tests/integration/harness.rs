//! Shared doubles for the integration tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use serde_json::Value;

use authgate::auth::store::MemoryTokenStore;
use authgate::{AuthProvider, AuthResponse, Identity, IdentityPatch, Navigator, TokenStore};

static TRACING: Once = Once::new();

/// Install a tracing subscriber once for the whole test binary, honoring
/// `RUST_LOG` when set.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "authgate=debug,warn".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Navigator double that records every enqueued destination.
#[derive(Default)]
pub struct RecordingNavigator {
    pushes: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Arc<Self> {
        init_tracing();
        Arc::new(Self::default())
    }

    pub fn pushes(&self) -> Vec<String> {
        self.pushes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn push(&self, destination: &str) {
        self.pushes.lock().unwrap().push(destination.to_string());
    }
}

/// Provider double with scripted outcomes and its own credential slot.
pub struct FakeProvider {
    pub store: Arc<MemoryTokenStore>,
    current: Mutex<Option<Identity>>,
    sign_in_outcome: Mutex<AuthResponse>,
    /// When set, sign-out behaves as if the server-side call failed
    pub fail_sign_out: AtomicBool,
}

impl FakeProvider {
    pub fn new(current: Option<Identity>) -> Arc<Self> {
        init_tracing();
        Arc::new(Self {
            store: Arc::new(MemoryTokenStore::new()),
            current: Mutex::new(current),
            sign_in_outcome: Mutex::new(AuthResponse::failure("unscripted")),
            fail_sign_out: AtomicBool::new(false),
        })
    }

    pub fn script_sign_in(&self, response: AuthResponse) {
        *self.sign_in_outcome.lock().unwrap() = response;
    }
}

#[async_trait]
impl AuthProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn sign_up(
        &self,
        _email: &str,
        _password: &str,
        _attrs: Option<HashMap<String, Value>>,
    ) -> AuthResponse {
        self.sign_in_outcome.lock().unwrap().clone()
    }

    async fn sign_in(&self, _email: &str, _password: &str) -> AuthResponse {
        let response = self.sign_in_outcome.lock().unwrap().clone();
        if let Some(token) = response.token.as_deref() {
            let _ = self.store.set(token).await;
        }
        response
    }

    async fn sign_out(&self) {
        // Even a failed server-side revocation clears the local slot
        if self.fail_sign_out.load(Ordering::SeqCst) {
            let _ = self.store.clear().await;
            return;
        }
        let _ = self.store.clear().await;
        *self.current.lock().unwrap() = None;
    }

    async fn current_identity(&self) -> Option<Identity> {
        let token = self.store.get().await.ok().flatten();
        token.and(self.current.lock().unwrap().clone())
    }

    async fn request_password_reset(&self, _email: &str) -> Option<String> {
        None
    }

    async fn update_profile(&self, _changes: IdentityPatch) -> AuthResponse {
        self.sign_in_outcome.lock().unwrap().clone()
    }
}

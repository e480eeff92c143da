pub mod gate;
pub mod identity;
pub mod providers;
pub mod session;
pub mod store;

pub use gate::{GateDecision, Navigator, RequireAnonymous, RequireAuthenticated};
pub use identity::{AuthResponse, Identity, IdentityPatch, SessionEvent, SessionState};
pub use session::AuthSession;
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};

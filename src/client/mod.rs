//! Client side of the login flow
//!
//! Provides:
//! - In-memory session with silent renewal (`session` submodule)
//! - Identity provider seam and its hosted implementation (`provider`, `oidc`)
//! - User agent seam (`agent` submodule)
//! - Advisory route guard (`guard` submodule)
//! - Resource server client (`api` submodule)

pub mod agent;
pub mod api;
pub mod guard;
pub mod oidc;
pub mod provider;
pub mod session;

pub use agent::{AgentEvent, HeadlessAgent, UserAgent};
pub use api::ApiClient;
pub use guard::{Guarded, MissingScopes, RouteGuard};
pub use oidc::{ClientConfig, HostedProvider};
pub use provider::{AuthResult, IdentityProvider, ProviderError, UserProfile, MAX_EXPIRES_IN};
pub use session::{SessionManager, SessionOptions, SessionState, AUTH_STATE, REDIRECT_ON_LOGIN};

/// Client-side failures.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Asked for a token while none is held.
    #[error("No access token found.")]
    NoToken,

    #[error("Authentication failed: {0}")]
    Authentication(#[from] ProviderError),

    /// Resource server unreachable or answering with a non-success status.
    #[error("{message}{}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Network {
        status: Option<u16>,
        message: String,
    },
}

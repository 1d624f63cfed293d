//! Advisory route guard for UI views.
//!
//! The decision only reflects what the client knows about its own session.
//! The resource server re-checks every request.

use crate::client::session::SessionManager;
use std::fmt;

/// Outcome of guarding a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guarded<V> {
    /// Not signed in; a login redirect was started.
    LoginRedirect,
    /// Signed in without some required scopes.
    Unauthorized(MissingScopes),
    Render(V),
}

/// Required scopes the session was not granted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingScopes(pub Vec<String>);

impl fmt::Display for MissingScopes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unauthorized - You need the following scope(s) to view this page: {}",
            self.0.join(",")
        )
    }
}

/// Gate in front of a view, optionally requiring scopes.
#[derive(Debug, Clone, Default)]
pub struct RouteGuard {
    required: Vec<String>,
}

impl RouteGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scopes(scopes: &[&str]) -> Self {
        Self {
            required: scopes.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn required_scopes(&self) -> &[String] {
        &self.required
    }

    /// Render `view` with the session if the user may see it.
    pub fn check<V>(
        &self,
        session: &SessionManager,
        view: impl FnOnce(&SessionManager) -> V,
    ) -> Guarded<V> {
        if !session.is_authenticated() {
            session.login();
            return Guarded::LoginRedirect;
        }

        let required: Vec<&str> = self.required.iter().map(String::as_str).collect();
        let missing = session.missing_scopes(&required);
        if !missing.is_empty() {
            tracing::debug!(missing = ?missing, "View needs scopes the session lacks");
            return Guarded::Unauthorized(MissingScopes(missing));
        }

        Guarded::Render(view(session))
    }
}

// ============================================================================
// Tests
// ============================================================================

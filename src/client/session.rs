//! Client session manager.
//!
//! Holds the tokens of the signed-in user in process memory only. The user
//! agent's store only carries what must survive the login redirect: the
//! location to return to and the `state` sent to the provider.
//!
//! ```text
//! Anonymous --login--> PendingRedirect --callback ok--> Authenticated
//! PendingRedirect --callback error--> Anonymous
//! Authenticated --expiry, renewal ok--> Authenticated
//! Authenticated --expiry, renewal error--> Anonymous
//! ```

use crate::client::agent::UserAgent;
use crate::client::oidc::ClientConfig;
use crate::client::provider::{
    AuthResult, IdentityProvider, ProviderError, UserProfile, MAX_EXPIRES_IN,
};
use crate::client::ClientError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use uuid::Uuid;

/// Store key for the location to return to after login.
pub const REDIRECT_ON_LOGIN: &str = "redirect_on_login";

/// Store key for the `state` of the pending login.
pub const AUTH_STATE: &str = "auth_state";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    PendingRedirect,
    Authenticated,
}

/// Settings the session manager needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Space-delimited scopes asked for at login, used when the provider
    /// does not report the granted ones
    pub requested_scopes: String,
    pub logout_return_url: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            requested_scopes: crate::DEFAULT_SCOPES.to_string(),
            logout_return_url: "http://localhost:3000".to_string(),
        }
    }
}

impl From<&ClientConfig> for SessionOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            requested_scopes: config.scopes.clone(),
            logout_return_url: config.logout_return_url.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct Session {
    access_token: String,
    id_token: String,
    expires_at: Instant,
    granted_scopes: String,
}

struct Inner {
    provider: Arc<dyn IdentityProvider>,
    agent: Arc<dyn UserAgent>,
    options: SessionOptions,
    session: RwLock<Option<Session>>,
    profile: RwLock<Option<UserProfile>>,
    pending_login: AtomicBool,
    renewal: Mutex<Option<AbortHandle>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let timer = self
            .renewal
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(timer) = timer {
            timer.abort();
        }
    }
}

/// Owner of the client session. Clones share the same session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        agent: Arc<dyn UserAgent>,
        options: SessionOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                provider,
                agent,
                options,
                session: RwLock::new(None),
                profile: RwLock::new(None),
                pending_login: AtomicBool::new(false),
                renewal: Mutex::new(None),
            }),
        }
    }

    /// Remember where the user is and send them to the provider's login page.
    pub fn login(&self) {
        let location = self.inner.agent.current_location();
        let state = Uuid::new_v4().to_string();
        self.inner.agent.store_item(REDIRECT_ON_LOGIN, &location);
        self.inner.agent.store_item(AUTH_STATE, &state);
        self.inner.pending_login.store(true, Ordering::SeqCst);

        let url = self.inner.provider.authorize_url(&state);
        tracing::info!(return_to = %location, "Redirecting to identity provider for login");
        self.inner.agent.redirect(&url);
    }

    /// Complete a login from the URL the provider redirected back to.
    ///
    /// On success the session is stored and the user is sent back to where
    /// `login` found them (or `/`). On failure the user is told what the
    /// provider said and sent to `/`. A callback whose `state` is not the one
    /// `login` stored is refused as `invalid_state`. Either way the saved
    /// location, the stored `state` and the pending flag are cleared.
    pub fn handle_authentication_callback(&self, callback_url: &str) -> Result<(), ClientError> {
        let expected_state = self.inner.agent.load_item(AUTH_STATE);
        let return_to = self.inner.agent.load_item(REDIRECT_ON_LOGIN);
        self.inner.agent.remove_item(AUTH_STATE);
        self.inner.agent.remove_item(REDIRECT_ON_LOGIN);
        self.inner.pending_login.store(false, Ordering::SeqCst);

        let outcome = self
            .inner
            .provider
            .parse_callback(callback_url)
            .and_then(|result| {
                let issued = expected_state.is_some()
                    && expected_state.as_deref() == result.state.as_deref();
                if issued {
                    Ok(result)
                } else {
                    Err(ProviderError::new(
                        "invalid_state",
                        "`state` does not match the one sent to the provider",
                    ))
                }
            });

        match outcome {
            Ok(result) => {
                self.set_session(result);
                let target = return_to
                    .filter(|location| !location.is_empty())
                    .unwrap_or_else(|| "/".to_string());
                tracing::info!(%target, "Login completed");
                self.inner.agent.navigate(&target);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err.error, description = %err.description, "Login failed");
                self.inner.agent.notify(&format!(
                    "Error: {err}. Check the console for further details."
                ));
                self.inner.agent.navigate("/");
                Err(ClientError::Authentication(err))
            }
        }
    }

    /// Store a fresh set of tokens and re-arm renewal for their expiry.
    /// Lifetimes beyond [`MAX_EXPIRES_IN`] are cut down to it.
    pub fn set_session(&self, result: AuthResult) {
        let lifetime = Duration::from_secs(result.expires_in.min(MAX_EXPIRES_IN));
        let expires_at = Instant::now() + lifetime;
        let granted_scopes = result
            .scope
            .filter(|scope| !scope.trim().is_empty())
            .unwrap_or_else(|| self.inner.options.requested_scopes.clone());

        tracing::debug!(
            expires_in = result.expires_in,
            scopes = %granted_scopes,
            "Session stored"
        );
        *self.write_session() = Some(Session {
            access_token: result.access_token,
            id_token: result.id_token,
            expires_at,
            granted_scopes,
        });

        self.schedule_renewal();
    }

    pub fn is_authenticated(&self) -> bool {
        self.read_session()
            .as_ref()
            .is_some_and(|s| Instant::now() < s.expires_at)
    }

    pub fn state(&self) -> SessionState {
        if self.inner.pending_login.load(Ordering::SeqCst) {
            SessionState::PendingRedirect
        } else if self.is_authenticated() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }

    /// Access token currently held, expired or not.
    pub fn get_access_token(&self) -> Result<String, ClientError> {
        self.read_session()
            .as_ref()
            .map(|s| s.access_token.clone())
            .ok_or(ClientError::NoToken)
    }

    pub fn id_token(&self) -> Option<String> {
        self.read_session().as_ref().map(|s| s.id_token.clone())
    }

    /// Expiry of the current session, if any.
    pub fn expires_at(&self) -> Option<Instant> {
        self.read_session().as_ref().map(|s| s.expires_at)
    }

    pub fn granted_scopes(&self) -> String {
        self.read_session()
            .as_ref()
            .map(|s| s.granted_scopes.clone())
            .unwrap_or_default()
    }

    /// Cached profile, or a userinfo lookup with the current access token.
    pub async fn get_profile(&self) -> Result<UserProfile, ClientError> {
        let cached = self
            .inner
            .profile
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(profile) = cached {
            return Ok(profile);
        }

        let token = self.get_access_token()?;
        let profile = self.inner.provider.user_info(&token).await?;
        *self
            .inner
            .profile
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(profile.clone());
        Ok(profile)
    }

    /// True iff every scope in `required` was granted.
    pub fn user_has_scopes(&self, required: &[&str]) -> bool {
        let granted = self.granted_scopes();
        required
            .iter()
            .all(|scope| granted.split_whitespace().any(|g| g == *scope))
    }

    /// Scopes of `required` that were not granted, in order.
    pub fn missing_scopes(&self, required: &[&str]) -> Vec<String> {
        let granted = self.granted_scopes();
        required
            .iter()
            .filter(|scope| !granted.split_whitespace().any(|g| g == **scope))
            .map(|scope| scope.to_string())
            .collect()
    }

    /// Arm the one-shot renewal timer for the current expiry, replacing any
    /// timer already armed. A session that has already expired gets no
    /// timer. Needs a tokio runtime; without one nothing is armed.
    pub fn schedule_renewal(&self) {
        let Some(expires_at) = self.expires_at() else {
            return;
        };
        if expires_at <= Instant::now() {
            tracing::debug!("Session already expired, token renewal not scheduled");
            self.cancel_renewal();
            return;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::warn!("No async runtime, token renewal not scheduled");
                return;
            }
        };

        let weak = Arc::downgrade(&self.inner);
        let task = runtime.spawn(renew_at(weak, expires_at));

        let previous = self
            .inner
            .renewal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task.abort_handle());
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Silent re-authentication against the provider's own session.
    ///
    /// Success replaces the session. Failure is logged, demotes the session
    /// to anonymous and is returned to the caller.
    pub async fn renew_token(&self) -> Result<(), ClientError> {
        match self.inner.provider.check_session().await {
            Ok(result) => {
                tracing::info!("Token renewed");
                self.set_session(result);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(
                    error = %err.error,
                    description = %err.description,
                    "Token renewal failed"
                );
                self.clear_session();
                Err(ClientError::Authentication(err))
            }
        }
    }

    /// Send the user to the provider's logout endpoint. Tokens stay in memory
    /// until they expire.
    pub fn logout(&self) {
        let url = self
            .inner
            .provider
            .logout_url(&self.inner.options.logout_return_url);
        tracing::info!("Redirecting to identity provider for logout");
        self.inner.agent.redirect(&url);
    }

    fn clear_session(&self) {
        *self.write_session() = None;
        *self
            .inner
            .profile
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.cancel_renewal();
    }

    fn cancel_renewal(&self) {
        let timer = self
            .inner
            .renewal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(timer) = timer {
            timer.abort();
        }
    }

    fn read_session(&self) -> std::sync::RwLockReadGuard<'_, Option<Session>> {
        self.inner
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_session(&self) -> std::sync::RwLockWriteGuard<'_, Option<Session>> {
        self.inner
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Body of the renewal timer. Holds only a weak reference so a dropped
/// manager is never kept alive by its own timer.
async fn renew_at(manager: Weak<Inner>, expires_at: Instant) {
    tokio::time::sleep_until(expires_at).await;

    let Some(inner) = manager.upgrade() else {
        return;
    };
    release_renewal_slot(&inner);

    let manager = SessionManager { inner };
    // Failures are logged and demote the session inside renew_token
    let _ = manager.renew_token().await;
}

/// Empty the renewal slot if it still holds the calling task's handle. A
/// timer armed meanwhile by another task stays in place.
fn release_renewal_slot(inner: &Inner) {
    let mut slot = inner
        .renewal
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    let own = tokio::task::try_id();
    if own.is_some() && slot.as_ref().map(AbortHandle::id) == own {
        slot.take();
    }
}

// ============================================================================
// Tests
// ============================================================================

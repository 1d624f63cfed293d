//! Identity provider seam used by the session manager.

use crate::client::ClientError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Longest access-token lifetime accepted from a provider (one year).
pub const MAX_EXPIRES_IN: u64 = 365 * 24 * 60 * 60;

/// Tokens returned by a successful login or session check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    pub access_token: String,
    pub id_token: String,
    /// Lifetime of the access token, in seconds
    pub expires_in: u64,
    /// Space-delimited scopes actually granted, when the provider reports them
    pub scope: Option<String>,
    pub state: Option<String>,
}

/// Error reported by the identity provider (or on the way to it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    /// OAuth2 error code, e.g. `login_required` or `access_denied`
    pub error: String,
    pub description: String,
}

impl ProviderError {
    pub fn new(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            description: description.into(),
        }
    }

    pub(crate) fn transport(err: impl fmt::Display) -> Self {
        Self::new("network_error", err.to_string())
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            write!(f, "{}", self.error)
        } else {
            write!(f, "{} - {}", self.error, self.description)
        }
    }
}

impl std::error::Error for ProviderError {}

/// Claims returned by the userinfo endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    /// Every other claim, verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Operations the session manager needs from an OAuth2/OIDC provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL of the interactive login page, carrying `state` for the caller
    /// to check on the way back.
    fn authorize_url(&self, state: &str) -> String;

    /// Parse the URL the provider redirected back to after login. The
    /// returned `state` is not checked here.
    fn parse_callback(&self, callback_url: &str) -> Result<AuthResult, ProviderError>;

    /// Silent re-authentication against the provider's own session.
    async fn check_session(&self) -> Result<AuthResult, ProviderError>;

    /// Profile of the token's subject. Transport and HTTP failures are
    /// [`ClientError::Network`].
    async fn user_info(&self, access_token: &str) -> Result<UserProfile, ClientError>;

    /// URL that ends the provider-side session and returns to `return_to`.
    fn logout_url(&self, return_to: &str) -> String;
}

/// Key/value pairs of a callback URL, read from the fragment when present,
/// else from the query string.
pub fn response_params(callback_url: &str) -> Result<HashMap<String, String>, ProviderError> {
    let url = reqwest::Url::parse(callback_url)
        .map_err(|e| ProviderError::new("invalid_callback", e.to_string()))?;

    let raw = match url.fragment() {
        Some(fragment) if !fragment.is_empty() => fragment.to_string(),
        _ => url.query().unwrap_or_default().to_string(),
    };

    let mut params = HashMap::new();
    for pair in raw.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params.insert(decode_component(key)?, decode_component(value)?);
    }
    Ok(params)
}

fn decode_component(raw: &str) -> Result<String, ProviderError> {
    urlencoding::decode(&raw.replace('+', " "))
        .map(|s| s.into_owned())
        .map_err(|e| ProviderError::new("invalid_callback", e.to_string()))
}

/// Turn callback parameters into an [`AuthResult`] or the provider's error.
pub fn parse_auth_response(
    mut params: HashMap<String, String>,
) -> Result<AuthResult, ProviderError> {
    if let Some(error) = params.remove("error") {
        let description = params.remove("error_description").unwrap_or_default();
        return Err(ProviderError::new(error, description));
    }

    let access_token = params.remove("access_token").filter(|t| !t.is_empty());
    let id_token = params.remove("id_token").filter(|t| !t.is_empty());
    let (Some(access_token), Some(id_token)) = (access_token, id_token) else {
        return Err(ProviderError::new(
            "invalid_token",
            "Missing access token or ID token in the authentication response",
        ));
    };

    let expires_in = params
        .remove("expires_in")
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|secs| *secs <= MAX_EXPIRES_IN)
        .ok_or_else(|| {
            ProviderError::new("invalid_token", "Missing, malformed or out of range expires_in")
        })?;

    Ok(AuthResult {
        access_token,
        id_token,
        expires_in,
        scope: params.remove("scope"),
        state: params.remove("state"),
    })
}

// ============================================================================
// Tests
// ============================================================================

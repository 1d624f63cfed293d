//! Hosted identity provider client (implicit flow with `token id_token`).
//!
//! Endpoints, relative to `https://{domain}`:
//! - `/authorize` for interactive login and, with `prompt=none`, session checks
//! - `/userinfo` for the profile
//! - `/v2/logout` to end the provider-side session

use crate::client::provider::{
    parse_auth_response, response_params, AuthResult, IdentityProvider, ProviderError,
    UserProfile,
};
use crate::client::ClientError;
use crate::{http_url, non_empty, Config, ConfigError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::LOCATION;
use uuid::Uuid;

/// Client-side settings for the hosted provider.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Provider origin without trailing slash, e.g. `https://tenant.auth0.com`
    pub base_url: String,
    pub client_id: String,
    pub callback_url: String,
    /// API identifier requested as `audience`
    pub audience: String,
    /// Space-delimited scopes requested at login
    pub scopes: String,
    pub logout_return_url: String,
}

impl ClientConfig {
    /// Build and validate from application config. Blank or malformed values
    /// fail here rather than producing a broken redirect later.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let base_url = config.provider_base_url()?;
        let client_id = non_empty("AUTH_CLIENT_ID", &config.client_id)?;
        let audience = non_empty("AUTH_AUDIENCE", &config.audience)?;
        let callback_url = http_url("AUTH_CALLBACK_URL", &config.callback_url)?;
        let logout_return_url = http_url("AUTH_LOGOUT_RETURN_URL", &config.logout_return_url)?;

        Ok(Self {
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            callback_url: callback_url.to_string(),
            audience: audience.to_string(),
            scopes: config.scopes.trim().to_string(),
            logout_return_url: logout_return_url.to_string(),
        })
    }

    /// Point at another provider origin (local mocks, custom domains).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// [`IdentityProvider`] over the provider's HTTP endpoints.
pub struct HostedProvider {
    config: ClientConfig,
    http_client: reqwest::Client,
}

impl HostedProvider {
    pub fn new(config: ClientConfig) -> Result<Self> {
        // Session checks read the Location header themselves
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn build_authorize_url(&self, state: &str, prompt: Option<&str>) -> String {
        let nonce = Uuid::new_v4().to_string();
        let mut url = format!(
            "{}/authorize?client_id={}&redirect_uri={}&response_type={}&scope={}&audience={}&state={}&nonce={}",
            self.config.base_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.callback_url),
            urlencoding::encode("token id_token"),
            urlencoding::encode(&self.config.scopes),
            urlencoding::encode(&self.config.audience),
            urlencoding::encode(state),
            nonce,
        );
        if let Some(prompt) = prompt {
            url.push_str("&prompt=");
            url.push_str(&urlencoding::encode(prompt));
        }
        url
    }
}

#[async_trait]
impl IdentityProvider for HostedProvider {
    fn authorize_url(&self, state: &str) -> String {
        self.build_authorize_url(state, None)
    }

    fn parse_callback(&self, callback_url: &str) -> Result<AuthResult, ProviderError> {
        parse_auth_response(response_params(callback_url)?)
    }

    async fn check_session(&self) -> Result<AuthResult, ProviderError> {
        let state = Uuid::new_v4().to_string();
        let url = self.build_authorize_url(&state, Some("none"));
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(ProviderError::transport)?;

        let status = response.status();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let result = match location {
            Some(location) if status.is_redirection() => {
                tracing::debug!(%status, "Session check redirected back");
                self.parse_callback(&location)?
            }
            _ => {
                return Err(ProviderError::new(
                    "login_required",
                    format!("session check answered {status} without a redirect"),
                ))
            }
        };

        if result.state.as_deref() != Some(state.as_str()) {
            return Err(ProviderError::new(
                "invalid_state",
                "`state` does not match the one sent to the provider",
            ));
        }
        Ok(result)
    }

    async fn user_info(&self, access_token: &str) -> Result<UserProfile, ClientError> {
        let response = self
            .http_client
            .get(format!("{}/userinfo", self.config.base_url))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ClientError::Network {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "no body".to_string());
            return Err(ClientError::Network {
                status: Some(status.as_u16()),
                message: format!("userinfo fetch failed: {body}"),
            });
        }

        response.json().await.map_err(|e| ClientError::Network {
            status: Some(status.as_u16()),
            message: format!("userinfo response unreadable: {e}"),
        })
    }

    fn logout_url(&self, return_to: &str) -> String {
        format!(
            "{}/v2/logout?client_id={}&returnTo={}",
            self.config.base_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(return_to),
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Courses Auth
//!
//! OAuth2/OIDC bearer-token authentication and scope/role authorization:
//! - Resource server gate validating tokens against the provider's JWKS (`auth`)
//! - HTTP endpoints with per-route policies (`api`)
//! - In-memory client session manager with silent renewal (`client`)

pub mod api;
pub mod auth;
pub mod client;

#[cfg(test)]
pub(crate) mod test_helpers;

use anyhow::Result;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: ServerYamlConfig,
    pub identity: IdentityYamlConfig,
}

/// Resource server section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerYamlConfig {
    pub port: u16,
    /// Namespaced claim carrying the user's roles
    pub roles_claim: String,
    /// Override for the key set URL (default: `https://{domain}/.well-known/jwks.json`)
    pub jwks_url: Option<String>,
    /// Outbound key set fetches allowed per minute
    pub jwks_requests_per_minute: u32,
    /// Signing keys kept in the cache
    pub jwks_cache_max_entries: u64,
    /// Lifetime of a cached signing key
    pub jwks_cache_ttl_secs: u64,
    /// Leeway applied to `exp`/`nbf`
    pub clock_skew_secs: u64,
}

impl Default for ServerYamlConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            roles_claim: DEFAULT_ROLES_CLAIM.into(),
            jwks_url: None,
            jwks_requests_per_minute: 5,
            jwks_cache_max_entries: 5,
            jwks_cache_ttl_secs: 600,
            clock_skew_secs: 0,
        }
    }
}

/// Identity provider section, shared by the resource server and the client
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentityYamlConfig {
    /// Provider tenant host (e.g. "my-tenant.eu.auth0.com")
    pub domain: String,
    /// API identifier expected in the `aud` claim
    pub audience: String,
    pub client_id: String,
    /// Where the provider sends the user back after login
    pub callback_url: String,
    /// Where the provider sends the user back after logout
    pub logout_return_url: String,
    /// Space-delimited scopes requested at login
    pub scopes: String,
}

impl Default for IdentityYamlConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            audience: String::new(),
            client_id: String::new(),
            callback_url: String::new(),
            logout_return_url: "http://localhost:3000".into(),
            scopes: DEFAULT_SCOPES.into(),
        }
    }
}

/// Role claim used when none is configured. Only meaningful for local testing.
pub const DEFAULT_ROLES_CLAIM: &str = "http://localhost:3000/roles";

/// Scopes requested at login when none are configured.
pub const DEFAULT_SCOPES: &str = "openid profile email read:courses";

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub domain: String,
    pub audience: String,
    pub client_id: String,
    pub callback_url: String,
    pub logout_return_url: String,
    pub scopes: String,
    pub roles_claim: String,
    pub jwks_url: Option<String>,
    pub jwks_requests_per_minute: u32,
    pub jwks_cache_max_entries: u64,
    pub jwks_cache_ttl_secs: u64,
    pub clock_skew_secs: u64,
}

/// Missing or malformed configuration, reported at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl Config {
    /// Load configuration from environment variables only.
    /// Equivalent to from_yaml_and_env(None).
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "config.yaml" in CWD. If the file doesn't
    /// exist, falls back to pure env var / defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let yaml = Self::load_yaml(yaml_path);

        Ok(Self {
            server_port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(yaml.server.port),
            domain: std::env::var("AUTH_DOMAIN").unwrap_or(yaml.identity.domain),
            audience: std::env::var("AUTH_AUDIENCE").unwrap_or(yaml.identity.audience),
            client_id: std::env::var("AUTH_CLIENT_ID").unwrap_or(yaml.identity.client_id),
            callback_url: std::env::var("AUTH_CALLBACK_URL").unwrap_or(yaml.identity.callback_url),
            logout_return_url: std::env::var("AUTH_LOGOUT_RETURN_URL")
                .unwrap_or(yaml.identity.logout_return_url),
            scopes: std::env::var("AUTH_SCOPES").unwrap_or(yaml.identity.scopes),
            roles_claim: std::env::var("AUTH_ROLES_CLAIM").unwrap_or(yaml.server.roles_claim),
            jwks_url: yaml.server.jwks_url,
            jwks_requests_per_minute: yaml.server.jwks_requests_per_minute,
            jwks_cache_max_entries: yaml.server.jwks_cache_max_entries,
            jwks_cache_ttl_secs: yaml.server.jwks_cache_ttl_secs,
            clock_skew_secs: yaml.server.clock_skew_secs,
        })
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }

    /// Provider host, checked to be a bare host name.
    pub fn checked_domain(&self) -> Result<&str, ConfigError> {
        let domain = non_empty("AUTH_DOMAIN", &self.domain)?;
        if domain.contains("://") || domain.contains('/') || domain.contains(char::is_whitespace)
        {
            return Err(ConfigError::Invalid {
                field: "AUTH_DOMAIN",
                reason: format!("expected a bare host name, got '{domain}'"),
            });
        }
        Ok(domain)
    }

    /// Base URL of the identity provider (`https://{domain}`).
    pub fn provider_base_url(&self) -> Result<reqwest::Url, ConfigError> {
        let domain = self.checked_domain()?;
        http_url("AUTH_DOMAIN", &format!("https://{domain}"))
    }

    /// Token issuer (`https://{domain}/`).
    pub fn issuer(&self) -> Result<String, ConfigError> {
        Ok(format!("https://{}/", self.checked_domain()?))
    }
}

/// Trimmed value, or `ConfigError::Missing` when blank.
pub(crate) fn non_empty<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Missing(field));
    }
    Ok(trimmed)
}

/// Absolute `http`/`https` URL, or `ConfigError::Invalid`.
pub(crate) fn http_url(field: &'static str, value: &str) -> Result<reqwest::Url, ConfigError> {
    let value = non_empty(field, value)?;
    let url = reqwest::Url::parse(value).map_err(|e| ConfigError::Invalid {
        field,
        reason: e.to_string(),
    })?;
    let is_http = matches!(url.scheme(), "http" | "https") && url.host_str().is_some();
    if !is_http {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("expected an http(s) URL, got '{value}'"),
        });
    }
    Ok(url)
}

/// Start the resource server on the configured port.
pub async fn start_server(config: Config) -> Result<()> {
    let gate = auth::GateConfig::from_config(&config)?;
    let audience = gate.audience.clone();
    let state = Arc::new(api::handlers::ServerState::new(gate));
    let app = api::create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %audience, "API server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

//! Bearer token validation against the provider's key set.
//!
//! Order of checks for one request:
//! 1. `Authorization: Bearer <token>` present and well-formed
//! 2. Header decodes, algorithm is allowed, `kid` present
//! 3. Signing key resolved through [`KeySetCache`]
//! 4. Signature, `exp`, `iss` and `aud` verified

use crate::auth::error::AuthError;
use crate::auth::jwks::{KeyCacheSettings, KeySetCache};
use crate::{http_url, non_empty, Config, ConfigError};
use axum::http::{header::AUTHORIZATION, HeaderMap};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde_json::Value;
use std::time::Duration;

/// Settings for the resource server's token gate.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Expected `iss`, `https://{domain}/`
    pub issuer: String,
    /// Expected `aud`
    pub audience: String,
    pub jwks_url: String,
    /// Claim holding the role array
    pub roles_claim: String,
    /// Allowed signing algorithms
    pub algorithms: Vec<Algorithm>,
    pub jwks_requests_per_minute: u32,
    pub jwks_cache_max_entries: u64,
    pub jwks_cache_ttl: Duration,
    /// Seconds of tolerance on `exp`/`nbf`
    pub leeway_secs: u64,
}

impl GateConfig {
    /// Gate with default algorithm, role claim and cache settings.
    pub fn new(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        jwks_url: impl Into<String>,
    ) -> Self {
        let cache = KeyCacheSettings::default();
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            jwks_url: jwks_url.into(),
            roles_claim: crate::DEFAULT_ROLES_CLAIM.to_string(),
            algorithms: vec![Algorithm::RS256],
            jwks_requests_per_minute: cache.requests_per_minute,
            jwks_cache_max_entries: cache.max_entries,
            jwks_cache_ttl: cache.ttl,
            leeway_secs: 0,
        }
    }

    /// Build and validate from application config. Fails fast on blank
    /// domain/audience, a domain that is not a bare host, or zero-sized
    /// cache settings.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let issuer = config.issuer()?;
        let audience = non_empty("AUTH_AUDIENCE", &config.audience)?;
        let roles_claim = non_empty("AUTH_ROLES_CLAIM", &config.roles_claim)?;
        let jwks_url = match config.jwks_url.as_deref() {
            Some(url) => http_url("jwks_url", url)?.to_string(),
            None => format!("{issuer}.well-known/jwks.json"),
        };

        if config.jwks_requests_per_minute == 0 {
            return Err(ConfigError::Invalid {
                field: "jwks_requests_per_minute",
                reason: "must be greater than zero".into(),
            });
        }
        if config.jwks_cache_max_entries == 0 {
            return Err(ConfigError::Invalid {
                field: "jwks_cache_max_entries",
                reason: "must be greater than zero".into(),
            });
        }

        Ok(Self {
            issuer,
            audience: audience.to_string(),
            jwks_url,
            roles_claim: roles_claim.to_string(),
            algorithms: vec![Algorithm::RS256],
            jwks_requests_per_minute: config.jwks_requests_per_minute,
            jwks_cache_max_entries: config.jwks_cache_max_entries,
            jwks_cache_ttl: Duration::from_secs(config.jwks_cache_ttl_secs),
            leeway_secs: config.clock_skew_secs,
        })
    }

    pub fn with_roles_claim(mut self, claim: impl Into<String>) -> Self {
        self.roles_claim = claim.into();
        self
    }

    pub fn with_requests_per_minute(mut self, per_minute: u32) -> Self {
        self.jwks_requests_per_minute = per_minute;
        self
    }

    pub fn with_leeway(mut self, secs: u64) -> Self {
        self.leeway_secs = secs;
        self
    }

    fn cache_settings(&self) -> KeyCacheSettings {
        KeyCacheSettings {
            requests_per_minute: self.jwks_requests_per_minute,
            max_entries: self.jwks_cache_max_entries,
            ttl: self.jwks_cache_ttl,
        }
    }
}

/// Claims of a token that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedClaims {
    pub subject: Option<String>,
    /// Entries of the `scope` claim
    pub scopes: Vec<String>,
    /// Entries of the configured role claim, empty unless it is an array
    pub roles: Vec<String>,
    raw: Value,
}

impl ValidatedClaims {
    pub fn from_claims(raw: Value, roles_claim: &str) -> Self {
        let subject = raw.get("sub").and_then(Value::as_str).map(str::to_string);

        let scopes = match raw.get("scope") {
            Some(Value::String(s)) => s.split_whitespace().map(str::to_string).collect(),
            Some(Value::Array(items)) => string_items(items),
            _ => Vec::new(),
        };

        let roles = match raw.get(roles_claim) {
            Some(Value::Array(items)) => string_items(items),
            _ => Vec::new(),
        };

        Self {
            subject,
            scopes,
            roles,
            raw,
        }
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Any claim of the token, by name.
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.raw.get(name)
    }
}

fn string_items(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

/// Stateless per-request token validator. Cheap to share behind an `Arc`.
pub struct TokenValidator {
    keys: KeySetCache,
    validation: Validation,
    algorithms: Vec<Algorithm>,
    roles_claim: String,
}

impl TokenValidator {
    pub fn new(config: &GateConfig) -> Self {
        Self::with_http_client(config, reqwest::Client::new())
    }

    pub fn with_http_client(config: &GateConfig, http: reqwest::Client) -> Self {
        let primary = config
            .algorithms
            .first()
            .copied()
            .unwrap_or(Algorithm::RS256);
        let mut validation = Validation::new(primary);
        validation.algorithms = config.algorithms.clone();
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);
        validation
            .required_spec_claims
            .extend(["iss".to_string(), "aud".to_string()]);
        validation.leeway = config.leeway_secs;

        Self {
            keys: KeySetCache::new(http, config.jwks_url.clone(), config.cache_settings()),
            validation,
            algorithms: config.algorithms.clone(),
            roles_claim: config.roles_claim.clone(),
        }
    }

    /// Validate the bearer token carried by `headers`.
    pub async fn validate_token(&self, headers: &HeaderMap) -> Result<ValidatedClaims, AuthError> {
        let token = bearer_token(headers)?;
        self.validate_bearer(token).await
    }

    /// Validate a raw compact JWT.
    pub async fn validate_bearer(&self, token: &str) -> Result<ValidatedClaims, AuthError> {
        let header = decode_header(token)
            .map_err(|e| AuthError::InvalidToken(format!("malformed header: {e}")))?;

        if !self.algorithms.contains(&header.alg) {
            return Err(AuthError::InvalidToken(format!(
                "algorithm {:?} is not allowed",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("token header has no kid".into()))?;

        let key = self.keys.signing_key(&kid).await?;

        let data = decode::<Value>(token, &key, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken(e.to_string()),
        })?;

        Ok(ValidatedClaims::from_claims(data.claims, &self.roles_claim))
    }
}

/// Token from an `Authorization: Bearer <token>` header. The scheme is
/// matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers.get(AUTHORIZATION).ok_or(AuthError::MissingToken)?;
    let value = value
        .to_str()
        .map_err(|_| AuthError::InvalidToken("Authorization header is not valid ASCII".into()))?;

    match value.trim().split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(AuthError::InvalidToken(
            "Format is Authorization: Bearer [token]".into(),
        )),
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Signing-key cache over the identity provider's published key set.
//!
//! Keys are cached per `kid` with a bounded size and a time-to-live. Lookups
//! of a `kid` that is not cached trigger a fetch of the whole key set, with
//! two guarantees:
//! - concurrent lookups of the same `kid` share one in-flight fetch and all
//!   receive its result, success or failure;
//! - fetches across all keys stay under a per-minute budget. Once the budget
//!   is spent, lookups fail without touching the network.
//!
//! Only successful lookups are cached, so a `kid` published after a rotation
//! is picked up by the next lookup that still has budget.

use crate::auth::error::AuthError;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::DecodingKey;
use moka::future::Cache;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Why a signing key could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum KeyFetchError {
    #[error("key set fetch budget of {0} per minute exhausted")]
    RateLimited(u32),
    #[error("key set unreachable: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no key with kid '{0}' in the key set")]
    UnknownKeyId(String),
    #[error("unusable key '{kid}': {reason}")]
    InvalidKey { kid: String, reason: String },
}

/// Cache sizing and fetch budget.
#[derive(Debug, Clone, Copy)]
pub struct KeyCacheSettings {
    pub requests_per_minute: u32,
    pub max_entries: u64,
    pub ttl: Duration,
}

impl Default for KeyCacheSettings {
    fn default() -> Self {
        Self {
            requests_per_minute: 5,
            max_entries: 5,
            ttl: Duration::from_secs(600),
        }
    }
}

/// Cached, rate-limited resolver from `kid` to verification key.
#[derive(Clone)]
pub struct KeySetCache {
    http: reqwest::Client,
    jwks_url: String,
    keys: Cache<String, DecodingKey>,
    limiter: Arc<FetchLimiter>,
}

impl KeySetCache {
    pub fn new(http: reqwest::Client, jwks_url: impl Into<String>, settings: KeyCacheSettings) -> Self {
        Self {
            http,
            jwks_url: jwks_url.into(),
            keys: Cache::builder()
                .max_capacity(settings.max_entries)
                .time_to_live(settings.ttl)
                .build(),
            limiter: Arc::new(FetchLimiter::new(settings.requests_per_minute)),
        }
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Resolve the verification key for `kid`.
    ///
    /// Cache hits make no network call. Misses are coalesced per `kid`.
    pub async fn signing_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        self.keys
            .try_get_with(kid.to_string(), self.fetch_key(kid))
            .await
            .map_err(|e| AuthError::KeyLookupFailed(e.to_string()))
    }

    async fn fetch_key(&self, kid: &str) -> Result<DecodingKey, KeyFetchError> {
        if !self.limiter.try_acquire() {
            return Err(KeyFetchError::RateLimited(self.limiter.per_minute));
        }

        tracing::debug!(kid, url = %self.jwks_url, "Fetching signing key set");
        let set: JwkSet = self
            .http
            .get(&self.jwks_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let jwk = set
            .find(kid)
            .ok_or_else(|| KeyFetchError::UnknownKeyId(kid.to_string()))?;

        DecodingKey::from_jwk(jwk).map_err(|e| KeyFetchError::InvalidKey {
            kid: kid.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Sliding one-minute window of fetch timestamps.
#[derive(Debug)]
struct FetchLimiter {
    per_minute: u32,
    recent: Mutex<VecDeque<Instant>>,
}

impl FetchLimiter {
    fn new(per_minute: u32) -> Self {
        Self {
            per_minute,
            recent: Mutex::new(VecDeque::with_capacity(per_minute as usize)),
        }
    }

    /// Record a fetch if the window still has room.
    fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut recent = self.recent.lock().unwrap_or_else(PoisonError::into_inner);

        while let Some(oldest) = recent.front() {
            if now.duration_since(*oldest) >= RATE_WINDOW {
                recent.pop_front();
            } else {
                break;
            }
        }

        if recent.len() >= self.per_minute as usize {
            return false;
        }
        recent.push_back(now);
        true
    }
}

// ============================================================================
// Tests
// ============================================================================

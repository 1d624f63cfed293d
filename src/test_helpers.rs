//! Test helper factories
//!
//! RS256 fixtures, a matching JWKS document, token minting and a config
//! with sensible defaults.
#![allow(dead_code)]

use crate::{Config, DEFAULT_ROLES_CLAIM, DEFAULT_SCOPES};

// ============================================================================
// Keys and tokens
// ============================================================================

#[path = "../tests/common/tokens.rs"]
mod tokens;

pub use tokens::*;

// ============================================================================
// Config
// ============================================================================

/// Fully populated config pointing at `domain`.
pub fn test_config(domain: &str) -> Config {
    Config {
        server_port: 3001,
        domain: domain.to_string(),
        audience: TEST_AUDIENCE.to_string(),
        client_id: "test-client".to_string(),
        callback_url: "http://localhost:3000/callback".to_string(),
        logout_return_url: "http://localhost:3000".to_string(),
        scopes: DEFAULT_SCOPES.to_string(),
        roles_claim: DEFAULT_ROLES_CLAIM.to_string(),
        jwks_url: None,
        jwks_requests_per_minute: 5,
        jwks_cache_max_entries: 5,
        jwks_cache_ttl_secs: 600,
        clock_skew_secs: 0,
    }
}

#[test]
fn test_fixture_roles_claim_matches_default() {
    assert_eq!(ROLES_CLAIM, DEFAULT_ROLES_CLAIM);
}

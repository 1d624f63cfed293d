//! Shared fixtures for integration tests: RS256 keys, a JWKS mock and token minting.
#![allow(dead_code)]

mod tokens;

pub use tokens::*;

use courses_auth::api::{self, handlers::ServerState};
use courses_auth::auth::GateConfig;
use serde_json::Value;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Identity provider mock serving the key set.
pub async fn provider_mock() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/jwks.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_json()))
        .mount(&server)
        .await;
    server
}

pub fn gate_config(provider: &MockServer) -> GateConfig {
    GateConfig::new(
        TEST_ISSUER,
        TEST_AUDIENCE,
        format!("{}/.well-known/jwks.json", provider.uri()),
    )
}

pub fn router(provider: &MockServer) -> axum::Router {
    api::create_router(Arc::new(ServerState::new(gate_config(provider))))
}

/// Token signed by the published key.
pub fn token(scope: &str, roles: Value) -> String {
    mint_token(PRIMARY_KID, PRIMARY_PEM, &token_claims(scope, roles, 3600))
}

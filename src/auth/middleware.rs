//! Auth middleware for Axum routes.
//!
//! Validates the bearer token of every request it wraps and injects the
//! resulting [`ValidatedClaims`](crate::auth::ValidatedClaims) into request
//! extensions. Rejections never reach the handler.

use crate::api::handlers::GateState;
use crate::auth::error::AuthError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Middleware that requires a valid bearer token.
///
/// # Behavior
/// 1. Extract `Authorization: Bearer <token>` → 401 if missing or malformed
/// 2. Resolve the signing key and verify the token → 401 on any failure
/// 3. Inject the claims into request extensions for downstream handlers
pub async fn require_auth(
    State(state): State<GateState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let claims = state.validator.validate_token(req.headers()).await?;

    tracing::debug!(
        subject = claims.subject.as_deref().unwrap_or("-"),
        path = %req.uri().path(),
        "Bearer token accepted"
    );
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::ServerState;
    use crate::auth::{AuthClaims, GateConfig};
    use crate::test_helpers::{
        jwks_json, mint_token, token_claims, PRIMARY_KID, PRIMARY_PEM, TEST_AUDIENCE, TEST_ISSUER,
    };
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::middleware::from_fn_with_state;
    use axum::routing::get;
    use axum::Router;
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn subject_handler(claims: AuthClaims) -> String {
        claims.subject.clone().unwrap_or_default()
    }

    async fn test_app() -> (MockServer, Router) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_json()))
            .mount(&server)
            .await;

        let gate = GateConfig::new(
            TEST_ISSUER,
            TEST_AUDIENCE,
            format!("{}/.well-known/jwks.json", server.uri()),
        );
        let state = Arc::new(ServerState::new(gate));
        let app = Router::new()
            .route("/test", get(subject_handler))
            .route_layer(from_fn_with_state(state.clone(), require_auth))
            .with_state(state);
        (server, app)
    }

    #[tokio::test]
    async fn test_no_header_returns_401() {
        let (_server, app) = test_app().await;
        let resp = app
            .oneshot(HttpRequest::builder().uri("/test").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_token_returns_401() {
        let (_server, app) = test_app().await;
        let resp = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/test")
                    .header("authorization", "Bearer not.a.jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_token_reaches_handler() {
        let (_server, app) = test_app().await;
        let token = mint_token(
            PRIMARY_KID,
            PRIMARY_PEM,
            &token_claims("openid", json!([]), 3600),
        );
        let resp = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/test")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"auth0|user-1");
    }
}

//! Resource server integration tests
//!
//! Drive the full router in-process against a mocked key set.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::*;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn get(app: Router, uri: &str, token: Option<&str>) -> (StatusCode, String) {
    let mut request = Request::builder().uri(uri);
    if let Some(token) = token {
        request = request.header("authorization", format!("Bearer {token}"));
    }
    let resp = app
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn json_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap()
}

#[tokio::test]
async fn test_public_needs_no_token() {
    let provider = provider_mock().await;
    let (status, body) = get(router(&provider), "/public", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["message"], "Hello from a public API!");
    assert!(provider.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_gated_routes_reject_missing_token() {
    let provider = provider_mock().await;
    for uri in ["/private", "/course", "/admin"] {
        let (status, body) = get(router(&provider), uri, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(
            json_body(&body)["error"],
            "No authorization token was found",
            "{uri}"
        );
    }
}

#[tokio::test]
async fn test_private_with_valid_token() {
    let provider = provider_mock().await;
    let token = token("openid profile", json!([]));
    let (status, body) = get(router(&provider), "/private", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["message"], "Hello from a private API!");
}

#[tokio::test]
async fn test_course_requires_read_courses() {
    let provider = provider_mock().await;

    let without = token("openid profile", json!([]));
    let (status, body) = get(router(&provider), "/course", Some(&without)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(!body.contains("courses\":["));
    assert!(json_body(&body)["error"]
        .as_str()
        .unwrap()
        .contains("read:courses"));

    let with = token("openid read:courses", json!([]));
    let (status, body) = get(router(&provider), "/course", Some(&with)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json_body(&body),
        json!({"courses": [
            {"id": 1, "title": "Building Apps with React and Redux"},
            {"id": 2, "title": "Creating Reusable React Components"}
        ]})
    );
}

#[tokio::test]
async fn test_admin_requires_role() {
    let provider = provider_mock().await;

    let no_claim = mint_token(
        PRIMARY_KID,
        PRIMARY_PEM,
        &json!({
            "sub": "auth0|user-1",
            "iss": TEST_ISSUER,
            "aud": TEST_AUDIENCE,
            "exp": jsonwebtoken::get_current_timestamp() + 3600,
        }),
    );
    let (status, body) = get(router(&provider), "/admin", Some(&no_claim)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "Insufficient role");

    let user = token("openid", json!(["user"]));
    let (status, body) = get(router(&provider), "/admin", Some(&user)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "Insufficient role");

    let admin = token("openid", json!(["admin"]));
    let (status, body) = get(router(&provider), "/admin", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["message"], "Hello from an admin API!");
}

#[tokio::test]
async fn test_expired_token() {
    let provider = provider_mock().await;
    let expired = mint_token(
        PRIMARY_KID,
        PRIMARY_PEM,
        &token_claims("openid read:courses", json!(["admin"]), -600),
    );
    let (status, body) = get(router(&provider), "/private", Some(&expired)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(&body)["error"], "Token expired");
}

#[tokio::test]
async fn test_untrusted_keys() {
    let provider = provider_mock().await;

    // kid not in the key set
    let unknown = mint_token(ROGUE_KID, ROGUE_PEM, &token_claims("openid", json!([]), 3600));
    let (status, body) = get(router(&provider), "/private", Some(&unknown)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json_body(&body)["error"]
        .as_str()
        .unwrap()
        .starts_with("Signing key lookup failed"));

    // published kid, wrong private key
    let forged = mint_token(PRIMARY_KID, ROGUE_PEM, &token_claims("openid", json!([]), 3600));
    let (status, body) = get(router(&provider), "/private", Some(&forged)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json_body(&body)["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid token"));
}

#[tokio::test]
async fn test_wrong_audience() {
    let provider = provider_mock().await;
    let mut c = token_claims("openid", json!([]), 3600);
    c["aud"] = json!("https://other-api.example.com");
    let token = mint_token(PRIMARY_KID, PRIMARY_PEM, &c);

    let (status, _) = get(router(&provider), "/private", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_keys_are_cached_across_requests() {
    let provider = provider_mock().await;
    let app = router(&provider);
    let token = token("openid read:courses", json!([]));

    for _ in 0..5 {
        let (status, _) = get(app.clone(), "/course", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(provider.received_requests().await.unwrap().len(), 1);
}

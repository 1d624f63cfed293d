//! Gate errors and their HTTP mapping.
//!
//! Every failure is terminal for the request and answers 401. The body is
//! `{"error": "<reason>"}` except for role failures, which answer with the
//! plain-text body `Insufficient role`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Authentication and authorization failures for a single request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization` header on the request.
    #[error("No authorization token was found")]
    MissingToken,

    /// Malformed header or token, bad signature, wrong audience/issuer or algorithm.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Signature is fine but `exp` is in the past.
    #[error("Token expired")]
    TokenExpired,

    /// Key set unreachable, fetch budget exhausted, or `kid` unknown.
    #[error("Signing key lookup failed: {0}")]
    KeyLookupFailed(String),

    /// Valid token without every required scope.
    #[error("Insufficient scope: missing {}", .missing.join(" "))]
    InsufficientScope { missing: Vec<String> },

    /// Valid token whose role claim lacks the required role.
    #[error("Insufficient role")]
    InsufficientRole,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::InsufficientRole => {
                (StatusCode::UNAUTHORIZED, "Insufficient role").into_response()
            }
            AuthError::KeyLookupFailed(ref reason) => {
                tracing::warn!(reason = %reason, "Signing key resolution failed");
                unauthorized_json(self.to_string())
            }
            other => {
                tracing::debug!(error = %other, "Request rejected");
                unauthorized_json(other.to_string())
            }
        }
    }
}

fn unauthorized_json(message: String) -> Response {
    let body = Json(serde_json::json!({
        "error": message
    }));
    (StatusCode::UNAUTHORIZED, body).into_response()
}

// ============================================================================
// Tests
// ============================================================================

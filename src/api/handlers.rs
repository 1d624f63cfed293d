//! API request handlers

use crate::auth::{require_role, require_scopes, AuthClaims, AuthError, GateConfig, TokenValidator};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Scope required by `/course`
pub const READ_COURSES_SCOPE: &str = "read:courses";

/// Role required by `/admin`
pub const ADMIN_ROLE: &str = "admin";

/// Shared server state
pub struct ServerState {
    pub validator: TokenValidator,
}

pub type GateState = Arc<ServerState>;

impl ServerState {
    pub fn new(gate: GateConfig) -> Self {
        Self {
            validator: TokenValidator::new(&gate),
        }
    }
}

// ============================================================================
// Response bodies
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: u32,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoursesResponse {
    pub courses: Vec<Course>,
}

fn course_catalog() -> Vec<Course> {
    vec![
        Course {
            id: 1,
            title: "Building Apps with React and Redux".into(),
        },
        Course {
            id: 2,
            title: "Creating Reusable React Components".into(),
        },
    ]
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn public() -> Json<MessageResponse> {
    MessageResponse::new("Hello from a public API!")
}

pub async fn private(_claims: AuthClaims) -> Json<MessageResponse> {
    MessageResponse::new("Hello from a private API!")
}

pub async fn courses(claims: AuthClaims) -> Result<Json<CoursesResponse>, AuthError> {
    require_scopes(&claims, &[READ_COURSES_SCOPE])?;
    Ok(Json(CoursesResponse {
        courses: course_catalog(),
    }))
}

pub async fn admin(claims: AuthClaims) -> Result<Json<MessageResponse>, AuthError> {
    require_role(&claims, ADMIN_ROLE)?;
    Ok(MessageResponse::new("Hello from an admin API!"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ValidatedClaims;
    use crate::DEFAULT_ROLES_CLAIM;
    use serde_json::json;

    fn claims(value: serde_json::Value) -> AuthClaims {
        AuthClaims(ValidatedClaims::from_claims(value, DEFAULT_ROLES_CLAIM))
    }

    #[tokio::test]
    async fn test_courses_requires_scope() {
        let err = courses(claims(json!({"scope": "openid profile"})))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AuthError::InsufficientScope {
                missing: vec!["read:courses".into()]
            }
        );

        let Json(body) = courses(claims(json!({"scope": "openid read:courses"})))
            .await
            .unwrap();
        assert_eq!(body.courses.len(), 2);
        assert_eq!(body.courses[0].title, "Building Apps with React and Redux");
    }

    #[tokio::test]
    async fn test_admin_requires_role() {
        let err = admin(claims(json!({"scope": "openid"}))).await.unwrap_err();
        assert_eq!(err, AuthError::InsufficientRole);

        let Json(body) = admin(claims(json!({DEFAULT_ROLES_CLAIM: ["admin"]})))
            .await
            .unwrap();
        assert_eq!(body.message, "Hello from an admin API!");
    }
}

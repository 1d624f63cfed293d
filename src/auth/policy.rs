//! Scope and role checks applied after a token has been validated.

use crate::auth::error::AuthError;
use crate::auth::jwt::ValidatedClaims;

/// Every scope in `required` must be granted. The error lists the ones that are not.
pub fn require_scopes(claims: &ValidatedClaims, required: &[&str]) -> Result<(), AuthError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|scope| !claims.has_scope(scope))
        .map(|scope| scope.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AuthError::InsufficientScope { missing })
    }
}

pub fn require_role(claims: &ValidatedClaims, role: &str) -> Result<(), AuthError> {
    if claims.has_role(role) {
        Ok(())
    } else {
        Err(AuthError::InsufficientRole)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_ROLES_CLAIM;
    use serde_json::json;

    fn claims(scope: &str, roles: serde_json::Value) -> ValidatedClaims {
        ValidatedClaims::from_claims(
            json!({"sub": "u", "scope": scope, DEFAULT_ROLES_CLAIM: roles}),
            DEFAULT_ROLES_CLAIM,
        )
    }

    #[test]
    fn test_require_scopes() {
        let c = claims("openid profile read:courses", json!([]));
        assert!(require_scopes(&c, &["read:courses"]).is_ok());
        assert!(require_scopes(&c, &[]).is_ok());
        assert_eq!(
            require_scopes(&c, &["read:courses", "write:courses"]),
            Err(AuthError::InsufficientScope {
                missing: vec!["write:courses".into()]
            })
        );
    }

    #[test]
    fn test_scope_match_is_exact() {
        let c = claims("read:courses:all", json!([]));
        assert!(require_scopes(&c, &["read:courses"]).is_err());
    }

    #[test]
    fn test_require_role() {
        assert!(require_role(&claims("", json!(["user", "admin"])), "admin").is_ok());
        assert_eq!(
            require_role(&claims("", json!(["user"])), "admin"),
            Err(AuthError::InsufficientRole)
        );
        assert_eq!(
            require_role(&claims("", json!(null)), "admin"),
            Err(AuthError::InsufficientRole)
        );
    }
}

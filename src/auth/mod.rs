//! Resource server request gate
//!
//! Provides:
//! - Error taxonomy and its 401 mapping (`error` submodule)
//! - Cached, rate-limited signing key resolution (`jwks` submodule)
//! - Bearer token validation (`jwt` submodule)
//! - Scope and role checks (`policy` submodule)
//! - Axum middleware and extractor (`middleware`, `extractor` submodules)

pub mod error;
pub mod extractor;
pub mod jwks;
pub mod jwt;
pub mod middleware;
pub mod policy;

pub use error::AuthError;
pub use extractor::AuthClaims;
pub use jwks::{KeyCacheSettings, KeySetCache};
pub use jwt::{bearer_token, GateConfig, TokenValidator, ValidatedClaims};
pub use middleware::require_auth;
pub use policy::{require_role, require_scopes};

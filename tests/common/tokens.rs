//! RS256 keys, the key set publishing them and token minting.
//!
//! Shared by the crate's unit tests and the integration tests.
#![allow(dead_code)]

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

pub const PRIMARY_KID: &str = "primary-key";
pub const ROGUE_KID: &str = "rogue-key";

/// Published in [`jwks_json`]
pub const PRIMARY_PEM: &str = include_str!("../fixtures/primary.pem");
/// Never published
pub const ROGUE_PEM: &str = include_str!("../fixtures/rogue.pem");

/// Modulus of [`PRIMARY_PEM`], base64url
const PRIMARY_N: &str = "lAkizvYAkL2mpHmhyg6VdAWXH3wuBUm803afFQ_EE1hURcHybA5H0OxbXn4_8MxllfVU6jKhfmA9SJ1Qx-Id9enabUqsHDHuBTZihaEAGnlrcRWVApjAsiceqXivTGv76ScYQbFVz1ehT_4dNsCYJuQVKctjjZyxAlNRxI5VDxEtd_dON3s0409ABOXfZTtEXl_2KCNToouDSgzdwiXd_BfLCfbj9CqwrfOyXORDIFKJMUMRquRQV8vFxLruzH07Gr2P2AYfKgYpOa3Ky_bmPv1j1NecPuthCjqahuXEO9vQCwdtKHe3sBf3WpCWTsWPIx_023htwc1JkCIk6c1Bow";

pub const TEST_ISSUER: &str = "https://tenant.example.com/";
pub const TEST_AUDIENCE: &str = "https://api.courses.example.com";
/// Custom claim carrying the roles, as configured by default
pub const ROLES_CLAIM: &str = "http://localhost:3000/roles";

/// Key set publishing only the primary key.
pub fn jwks_json() -> Value {
    json!({
        "keys": [{
            "kty": "RSA",
            "use": "sig",
            "alg": "RS256",
            "kid": PRIMARY_KID,
            "n": PRIMARY_N,
            "e": "AQAB"
        }]
    })
}

/// Claims for [`TEST_ISSUER`]/[`TEST_AUDIENCE`], expiring `expires_in` seconds from now.
pub fn token_claims(scope: &str, roles: Value, expires_in: i64) -> Value {
    let now = jsonwebtoken::get_current_timestamp() as i64;
    json!({
        "sub": "auth0|user-1",
        "iss": TEST_ISSUER,
        "aud": TEST_AUDIENCE,
        "iat": now,
        "exp": now + expires_in,
        "scope": scope,
        ROLES_CLAIM: roles,
    })
}

/// RS256 token signed with `pem`, labelled with `kid`.
pub fn mint_token(kid: &str, pem: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("fixture key");
    encode(&header, claims, &key).expect("token encoding")
}

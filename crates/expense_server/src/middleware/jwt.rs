//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs whose `sub` is the caller's user id. Issuance lives
//! with the identity service; this layer only verifies.

use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

#[derive(Clone)]
pub struct JwtConfig {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtConfig {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Principal, String> {
        let data = decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| e.to_string())?;
        let user_id = data
            .claims
            .sub
            .parse::<Uuid>()
            .map_err(|_| format!("subject '{}' is not a user id", data.claims.sub))?;
        Ok(Principal { user_id })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: u64,
}

/// Authenticated caller, inserted as a request extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "unauthorized", "message": message })),
    )
        .into_response()
}

pub async fn jwt_auth(
    Extension(config): Extension<JwtConfig>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    else {
        return unauthorized("missing bearer token");
    };

    match config.verify(token.trim()) {
        Ok(principal) => {
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        Err(reason) => {
            tracing::warn!(%reason, "rejected bearer token");
            unauthorized("invalid bearer token")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(sub: &str, secret: &[u8]) -> String {
        let claims = JwtClaims {
            sub: sub.into(),
            exp: 4_102_444_800, // 2100-01-01
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    #[test]
    fn accepts_valid_token() {
        let cfg = JwtConfig::from_secret(b"k");
        let user_id = Uuid::new_v4();
        let principal = cfg.verify(&token(&user_id.to_string(), b"k")).unwrap();
        assert_eq!(principal.user_id, user_id);
    }

    #[test]
    fn rejects_wrong_secret_and_bad_subject() {
        let cfg = JwtConfig::from_secret(b"k");
        assert!(cfg.verify(&token(&Uuid::new_v4().to_string(), b"other")).is_err());
        assert!(cfg.verify(&token("alice", b"k")).is_err());
    }
}

//! Authentication middleware
//!
//! Verifies the bearer token on protected routes. Tokens are issued by the
//! external identity provider and verified here with a shared secret; the
//! token subject is the caller's profile id, attached to the request as
//! [`AuthMember`] for handlers to consume.

use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::settings::AuthConfig;
use crate::utils::errors::{Result, SkiAmiError};

/// Claims carried by identity provider tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Profile id of the authenticated member
    pub sub: String,
    pub exp: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<usize>,
}

/// Authenticated member attached to the request by the auth middleware
#[derive(Debug, Clone, Copy)]
pub struct AuthMember {
    pub profile_id: Uuid,
}

/// Token verifier for identity provider JWTs
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Create a new JwtVerifier from the auth configuration
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_seconds;
        if let Some(audience) = &config.audience {
            validation.set_audience(&[audience]);
        }
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Verify a token and return its claims
    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    SkiAmiError::Authentication("token expired".to_string())
                }
                _ => SkiAmiError::Authentication("invalid token".to_string()),
            })
    }
}

/// Middleware protecting routes behind bearer authentication
pub async fn auth_middleware(mut request: Request, next: Next) -> Result<Response> {
    let verifier = request
        .extensions()
        .get::<Arc<JwtVerifier>>()
        .ok_or_else(|| SkiAmiError::Config("token verifier not configured".to_string()))?
        .clone();

    let token = extract_bearer(request.headers())?;
    let claims = verifier.verify(&token)?;

    let profile_id = Uuid::parse_str(&claims.sub).map_err(|_| {
        warn!(sub = %claims.sub, "Token subject is not a profile id");
        SkiAmiError::Authentication("invalid token subject".to_string())
    })?;

    debug!(profile_id = %profile_id, "Request authenticated");
    request.extensions_mut().insert(AuthMember { profile_id });

    Ok(next.run(request).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<String> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| SkiAmiError::Authentication("missing authorization header".to_string()))?;

    match header.strip_prefix("Bearer ") {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => Err(SkiAmiError::Authentication(
            "authorization header must carry a bearer token".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret-test-secret-test-secret!".to_string(),
            audience: None,
            issuer: None,
            leeway_seconds: 30,
        }
    }

    fn mint_token(config: &AuthConfig, sub: &str, exp_offset: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: sub.to_string(),
            exp: (now + exp_offset) as usize,
            iat: Some(now as usize),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_verify_valid_token() {
        let config = test_config();
        let verifier = JwtVerifier::new(&config);
        let profile_id = Uuid::new_v4();

        let token = mint_token(&config, &profile_id.to_string(), 3600);
        let claims = verifier.verify(&token).unwrap();
        assert_eq!(claims.sub, profile_id.to_string());
    }

    #[test]
    fn test_verify_expired_token() {
        let config = test_config();
        let verifier = JwtVerifier::new(&config);

        let token = mint_token(&config, "someone", -3600);
        let err = verifier.verify(&token).unwrap_err();
        assert!(matches!(err, SkiAmiError::Authentication(ref m) if m.contains("expired")));
    }

    #[test]
    fn test_verify_wrong_secret() {
        let config = test_config();
        let token = mint_token(&config, "someone", 3600);

        let other = AuthConfig {
            jwt_secret: "another-secret-another-secret-another".to_string(),
            ..test_config()
        };
        let verifier = JwtVerifier::new(&other);
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn test_extract_bearer() {
        let mut headers = HeaderMap::new();
        assert!(extract_bearer(&headers).is_err());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(extract_bearer(&headers).is_err());

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer token-123"),
        );
        assert_eq!(extract_bearer(&headers).unwrap(), "token-123");
    }
}

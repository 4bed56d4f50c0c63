use actix_web::{http::header, web, HttpRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtKeySource;
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // subject - the user id
    #[serde(default)]
    pub iat: i64,
    pub exp: i64, // expiration time (unix timestamp)
}

/// Validates bearer tokens presented at handshake and on REST calls.
///
/// HS256 verifiers also hold the encoding key so tokens can be minted for
/// tests and local tooling. RS256 verifiers can only verify.
pub struct JwtVerifier {
    algorithm: Algorithm,
    decoding: DecodingKey,
    encoding: Option<EncodingKey>,
}

impl JwtVerifier {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            algorithm: Algorithm::HS256,
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            encoding: Some(EncodingKey::from_secret(secret.as_bytes())),
        }
    }

    pub fn from_rsa_pem(pem: &str) -> Result<Self, AppError> {
        let decoding = DecodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| AppError::Config(format!("invalid JWT public key: {e}")))?;
        Ok(Self {
            algorithm: Algorithm::RS256,
            decoding,
            encoding: None,
        })
    }

    pub fn from_source(source: &JwtKeySource) -> Result<Self, AppError> {
        match source {
            JwtKeySource::Secret(secret) => Ok(Self::from_secret(secret)),
            JwtKeySource::RsaPublicPem(pem) => Self::from_rsa_pem(pem),
        }
    }

    /// Verify signature and expiry, returning the user id bound to the token.
    pub fn verify(&self, token: &str) -> Result<Uuid, AppError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AppError::Authentication("token expired".into()),
                _ => AppError::Authentication("token invalid".into()),
            }
        })?;

        Uuid::parse_str(&data.claims.sub)
            .map_err(|_| AppError::Authentication("token subject is not a user id".into()))
    }

    /// Mint an HS256 token for `user_id` valid for `ttl`.
    pub fn issue(&self, user_id: Uuid, ttl: Duration) -> Result<String, AppError> {
        let key = self.encoding.as_ref().ok_or_else(|| {
            AppError::Config("token issuing requires a shared secret".into())
        })?;
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::new(self.algorithm), &claims, key).map_err(|e| {
            tracing::error!(error = %e, "failed to encode token");
            AppError::Internal
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Pull the bearer token from `Authorization: Bearer ..`.
pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Handshake token: `?token=` query parameter first, then the bearer header.
pub fn handshake_token(req: &HttpRequest) -> Option<String> {
    web::Query::<TokenQuery>::from_query(req.query_string())
        .ok()
        .and_then(|q| q.into_inner().token)
        .filter(|token| !token.is_empty())
        .or_else(|| bearer_token(req))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_issue_then_verify() {
        let verifier = JwtVerifier::from_secret("unit-test-secret");
        let user_id = Uuid::new_v4();
        let token = verifier.issue(user_id, Duration::minutes(5)).unwrap();
        assert_eq!(verifier.verify(&token).unwrap(), user_id);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let verifier = JwtVerifier::from_secret("unit-test-secret");
        let token = verifier
            .issue(Uuid::new_v4(), Duration::minutes(-5))
            .unwrap();
        let err = verifier.verify(&token).unwrap_err();
        assert!(matches!(err, AppError::Authentication(ref m) if m == "token expired"));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let issuer = JwtVerifier::from_secret("one");
        let verifier = JwtVerifier::from_secret("two");
        let token = issuer.issue(Uuid::new_v4(), Duration::minutes(5)).unwrap();
        assert!(matches!(
            verifier.verify(&token),
            Err(AppError::Authentication(_))
        ));
    }

    #[test]
    fn test_non_uuid_subject_is_rejected() {
        let key = EncodingKey::from_secret(b"unit-test-secret");
        let claims = Claims {
            sub: "alice".into(),
            iat: 0,
            exp: Utc::now().timestamp() + 300,
        };
        let token = encode(&Header::default(), &claims, &key).unwrap();
        let verifier = JwtVerifier::from_secret("unit-test-secret");
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn test_handshake_token_sources() {
        let req = TestRequest::get().uri("/ws?token=abc").to_http_request();
        assert_eq!(handshake_token(&req).as_deref(), Some("abc"));

        let req = TestRequest::get()
            .uri("/ws")
            .insert_header((header::AUTHORIZATION, "Bearer xyz"))
            .to_http_request();
        assert_eq!(handshake_token(&req).as_deref(), Some("xyz"));

        let req = TestRequest::get().uri("/ws").to_http_request();
        assert!(handshake_token(&req).is_none());
    }
}

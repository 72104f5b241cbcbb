use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use thiserror::Error;
use tracing::debug;

use quill_types::api::Claims;

/// Lifetime of every access token handed out at login.
pub const ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 30;

/// Signing secret used when none is configured. Never acceptable in production.
pub const INSECURE_DEFAULT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token signature does not verify")]
    BadSignature,
    #[error("token could not be decoded")]
    Malformed,
    #[error("token carries no subject")]
    MissingSubject,
    #[error("token expired")]
    Expired,
}

/// Issues and checks HS256 bearer tokens. Stateless: a token is valid iff
/// its signature verifies under the configured secret and it has not expired.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is compared against an explicit clock in `validate_at`.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn issue(&self, subject: &str, ttl: Duration) -> Result<String> {
        self.issue_at(subject, ttl, Utc::now())
    }

    pub fn issue_at(&self, subject: &str, ttl: Duration, now: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            sub: subject.to_string(),
            exp: (now + ttl).timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!("Issued token for {} expiring at {}", subject, claims.exp);
        Ok(token)
    }

    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_at(token, Utc::now())
    }

    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                ErrorKind::MissingRequiredClaim(claim) if claim == "sub" => {
                    TokenError::MissingSubject
                }
                _ => TokenError::Malformed,
            })?
            .claims;

        if claims.sub.is_empty() {
            return Err(TokenError::MissingSubject);
        }
        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

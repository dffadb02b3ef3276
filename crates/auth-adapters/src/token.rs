//! HS256 session tokens.

use chrono::{Duration, Utc};
use domains::{DomainError, Result, SessionToken, TokenService, User};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    /// User id
    sub: String,
    iat: i64,
    exp: i64,
}

pub struct JwtTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtTokenService {
    pub fn new(secret: &SecretString, ttl: Duration) -> Self {
        let key = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation,
            ttl,
        }
    }
}

impl TokenService for JwtTokenService {
    fn issue(&self, user: &User) -> Result<SessionToken> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: user.id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            error!(error = %e, "token signing failed");
            DomainError::internal("token signing failed")
        })?;
        Ok(SessionToken { token, expires_at })
    }

    fn verify(&self, token: &str) -> Result<Uuid> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            debug!(error = %e, "rejected session token");
            match e.kind() {
                ErrorKind::ExpiredSignature => DomainError::Unauthorized("session expired".into()),
                _ => DomainError::Unauthorized("invalid session token".into()),
            }
        })?;

        Uuid::parse_str(&data.claims.sub)
            .map_err(|_| DomainError::Unauthorized("invalid session token".into()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use domains::Role;

    use super::*;

    fn service(secret: &str, ttl: Duration) -> JwtTokenService {
        JwtTokenService::new(&SecretString::from(secret.to_string()), ttl)
    }

    fn user() -> User {
        User::new("alice", "hash", BTreeSet::from([Role::Student]))
    }

    #[test]
    fn issued_token_verifies_to_the_user() {
        let tokens = service("test-secret", Duration::hours(1));
        let alice = user();

        let session = tokens.issue(&alice).unwrap();
        assert!(session.expires_at > Utc::now());
        assert_eq!(tokens.verify(&session.token).unwrap(), alice.id);
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let session = service("one", Duration::hours(1)).issue(&user()).unwrap();
        let err = service("two", Duration::hours(1)).verify(&session.token).unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = service("test-secret", Duration::seconds(-120));
        let session = tokens.issue(&user()).unwrap();
        let err = tokens.verify(&session.token).unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(msg) if msg.contains("expired")));
    }

    #[test]
    fn garbage_is_rejected() {
        let tokens = service("test-secret", Duration::hours(1));
        assert!(tokens.verify("not.a.jwt").is_err());
    }
}

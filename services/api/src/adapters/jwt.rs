//! services/api/src/adapters/jwt.rs
//!
//! HS256 JWT implementation of the `TokenService` port.

use chrono::{Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use storefront_core::domain::UserId;
use storefront_core::ports::{IssuedToken, PortError, PortResult, TokenRejection, TokenService};

/// Claims stored in a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The user id as a decimal string.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct JwtTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Option<Duration>,
}

impl JwtTokenService {
    pub fn new(secret: &str, expiration_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: Duration::try_minutes(expiration_minutes),
        }
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["sub", "exp"]);
        validation.leeway = 0;
        validation
    }
}

impl TokenService for JwtTokenService {
    fn issue(&self, user_id: UserId) -> PortResult<IssuedToken> {
        let now = Utc::now();
        let expires_at = self
            .lifetime
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| PortError::Unexpected("token lifetime out of range".to_string()))?;
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| PortError::Unexpected(format!("failed to sign token: {}", e)))?;

        Ok(IssuedToken {
            token,
            expires_at: Utc
                .timestamp_opt(claims.exp, 0)
                .single()
                .unwrap_or(expires_at),
        })
    }

    fn verify(&self, token: &str) -> Result<UserId, TokenRejection> {
        let data = decode::<Claims>(token, &self.decoding_key, &Self::validation()).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenRejection::Expired,
                _ => TokenRejection::Invalid(e.to_string()),
            },
        )?;

        data.claims
            .sub
            .parse::<UserId>()
            .map_err(|_| TokenRejection::Invalid(format!("bad subject '{}'", data.claims.sub)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-that-is-at-least-32-bytes!";

    #[test]
    fn issued_token_resolves_to_its_user() {
        let tokens = JwtTokenService::new(SECRET, 60);

        let issued = tokens.issue(UserId(7)).unwrap();

        assert_eq!(tokens.verify(&issued.token), Ok(UserId(7)));
        assert!(issued.expires_at > Utc::now());
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let tokens = JwtTokenService::new(SECRET, 60);
        let now = Utc::now().timestamp();
        let stale = encode(
            &Header::new(Algorithm::HS256),
            &Claims {
                sub: "7".into(),
                iat: now - 7200,
                exp: now - 3600,
            },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(tokens.verify(&stale), Err(TokenRejection::Expired));
    }

    #[test]
    fn token_signed_with_another_secret_is_invalid() {
        let other = JwtTokenService::new("another-secret-that-is-32-bytes-long", 60);
        let token = other.issue(UserId(7)).unwrap().token;

        let result = JwtTokenService::new(SECRET, 60).verify(&token);

        assert!(matches!(result, Err(TokenRejection::Invalid(_))));
    }

    #[test]
    fn garbage_is_invalid() {
        let result = JwtTokenService::new(SECRET, 60).verify("not.a.jwt");

        assert!(matches!(result, Err(TokenRejection::Invalid(_))));
    }

    #[test]
    fn non_numeric_subject_is_invalid() {
        let now = Utc::now().timestamp();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Claims {
                sub: "alice".into(),
                iat: now,
                exp: now + 600,
            },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let result = JwtTokenService::new(SECRET, 60).verify(&token);

        assert!(matches!(result, Err(TokenRejection::Invalid(_))));
    }

    #[test]
    fn out_of_range_lifetime_fails_to_issue_instead_of_panicking() {
        let result = JwtTokenService::new(SECRET, i64::MAX).issue(UserId(7));
        assert!(matches!(result, Err(PortError::Unexpected(_))));

        let result = JwtTokenService::new(SECRET, 1_000_000_000_000).issue(UserId(7));
        assert!(matches!(result, Err(PortError::Unexpected(_))));
    }
}

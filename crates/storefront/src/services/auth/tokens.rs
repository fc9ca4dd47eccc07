//! Bearer token issuance and verification.
//!
//! Tokens are HS256 JWTs whose subject is the user id. They are stateless:
//! verifying one needs only the signing secret, and logging out does not
//! revoke anything.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use cartwheel_core::UserId;

use super::AuthError;
use crate::config::AuthConfig;

/// Audience claim stamped on every token.
pub const TOKEN_AUDIENCE: &str = "cartwheel:auth";

const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    aud: String,
    iat: i64,
    exp: i64,
}

/// Signs and verifies bearer tokens.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("keys", &"[REDACTED]")
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

impl TokenKeys {
    /// Build signing and verification keys from configuration.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.expose_secret().as_bytes();

        let mut validation = Validation::new(ALGORITHM);
        validation.set_audience(&[TOKEN_AUDIENCE]);
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            lifetime: config.token_lifetime,
        }
    }

    /// Issue a token for a user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenSigning` if the token cannot be encoded.
    pub fn issue(&self, user_id: UserId) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let lifetime = i64::try_from(self.lifetime.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: user_id.to_string(),
            aud: TOKEN_AUDIENCE.to_owned(),
            iat: now,
            exp: now.saturating_add(lifetime),
        };

        encode(&Header::new(ALGORITHM), &claims, &self.encoding).map_err(AuthError::TokenSigning)
    }

    /// Verify a token and return the user id it was issued for.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthenticated` if the signature, audience, or
    /// expiry is invalid, or the subject is not a user id.
    pub fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            AuthError::Unauthenticated
        })?;

        data.claims
            .sub
            .parse::<i64>()
            .map(UserId::new)
            .map_err(|_| AuthError::Unauthenticated)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn keys(secret: &str, lifetime: Duration) -> TokenKeys {
        TokenKeys::new(&AuthConfig {
            jwt_secret: SecretString::from(secret),
            token_lifetime: lifetime,
        })
    }

    #[test]
    fn test_issue_then_verify() {
        let keys = keys("k3Y!x9#mQ2$wR7&zT4^vB8*nL1@pC6%e", Duration::from_secs(60));
        let token = keys.issue(UserId::new(42)).unwrap();
        assert_eq!(keys.verify(&token).unwrap(), UserId::new(42));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let issuer = keys("k3Y!x9#mQ2$wR7&zT4^vB8*nL1@pC6%e", Duration::from_secs(60));
        let other = keys("Z8@uN3!qW6#rT1$yP4%oI7^lK2&jH5*g", Duration::from_secs(60));
        let token = issuer.issue(UserId::new(1)).unwrap();
        assert!(matches!(other.verify(&token), Err(AuthError::Unauthenticated)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let keys = keys("k3Y!x9#mQ2$wR7&zT4^vB8*nL1@pC6%e", Duration::from_secs(60));
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "1".to_owned(),
            aud: TOKEN_AUDIENCE.to_owned(),
            iat: now - 120,
            exp: now - 60,
        };
        let token = encode(&Header::new(ALGORITHM), &claims, &keys.encoding).unwrap();
        assert!(matches!(keys.verify(&token), Err(AuthError::Unauthenticated)));
    }

    #[test]
    fn test_wrong_audience_is_rejected() {
        let keys = keys("k3Y!x9#mQ2$wR7&zT4^vB8*nL1@pC6%e", Duration::from_secs(60));
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "1".to_owned(),
            aud: "someone-else".to_owned(),
            iat: now,
            exp: now + 60,
        };
        let token = encode(&Header::new(ALGORITHM), &claims, &keys.encoding).unwrap();
        assert!(matches!(keys.verify(&token), Err(AuthError::Unauthenticated)));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let keys = keys("k3Y!x9#mQ2$wR7&zT4^vB8*nL1@pC6%e", Duration::from_secs(60));
        assert!(matches!(keys.verify("not-a-token"), Err(AuthError::Unauthenticated)));
    }
}

//! Signed-token codec for session and password-reset tokens.
//!
//! Both token kinds are self-contained HMAC-signed JWTs, so validation is
//! stateless and works identically across server instances. The registry
//! document keeps `token_expires` as its own record for refresh decisions
//! and logout; the token itself carries the expiry it was issued with.
//!
//! Leeway is pinned to zero: a token is invalid the moment its expiry
//! passes, which the sliding-refresh window depends on. Timestamps have
//! one second resolution and the comparison rejects only `exp < now`, so
//! a token can outlive its nominal expiry by up to a second.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::token::TokenConfig;
use crate::utils::errors::AppError;

/// Session token claims.
///
/// Unknown fields are rejected so a reset token (which carries `rid`) can
/// never double as a session token.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionClaims {
    /// Principal name.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Password-reset token claims. `rid` must match the `reset_id` stored on
/// the principal document, which is what makes the token single-use.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResetClaims {
    pub sub: String,
    pub rid: String,
    pub iat: i64,
    pub exp: i64,
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation
}

pub fn create_session_token(
    name: &str,
    expires_at: DateTime<Utc>,
    config: &TokenConfig,
) -> Result<String, AppError> {
    let claims = SessionClaims {
        sub: name.to_string(),
        iat: Utc::now().timestamp(),
        exp: expires_at.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(anyhow::anyhow!("failed to sign session token: {}", e)))
}

/// Verifies signature and expiry. All failure modes collapse into the
/// generic 401.
pub fn verify_session_token(token: &str, config: &TokenConfig) -> Result<SessionClaims, AppError> {
    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized())
}

pub fn create_reset_token(
    name: &str,
    reset_id: &str,
    config: &TokenConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp();
    let claims = ResetClaims {
        sub: name.to_string(),
        rid: reset_id.to_string(),
        iat: now,
        exp: now + config.reset_expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(anyhow::anyhow!("failed to sign reset token: {}", e)))
}

pub fn verify_reset_token(token: &str, config: &TokenConfig) -> Result<ResetClaims, AppError> {
    decode::<ResetClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn test_config() -> TokenConfig {
        TokenConfig {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            expiration: 3600,
            refresh: 900,
            reset_expiration: 3600,
        }
    }

    #[test]
    fn session_token_roundtrip() {
        let config = test_config();
        let expires = Utc::now() + Duration::seconds(3600);

        let token = create_session_token("admin", expires, &config).unwrap();
        let claims = verify_session_token(&token, &config).unwrap();

        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.exp, expires.timestamp());
    }

    #[test]
    fn expired_session_token_is_rejected() {
        let config = test_config();
        let expires = Utc::now() - Duration::seconds(5);

        let token = create_session_token("admin", expires, &config).unwrap();
        assert!(verify_session_token(&token, &config).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let config = test_config();
        let token =
            create_session_token("admin", Utc::now() + Duration::seconds(60), &config).unwrap();

        let other = TokenConfig {
            secret: "a-completely-different-secret-key-here".to_string(),
            ..config
        };
        assert!(verify_session_token(&token, &other).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let config = test_config();
        assert!(verify_session_token("not-a-token", &config).is_err());
        assert!(verify_reset_token("not-a-token", &config).is_err());
    }

    #[test]
    fn reset_token_roundtrip() {
        let config = test_config();
        let token = create_reset_token("jane", "rid-1", &config).unwrap();
        let claims = verify_reset_token(&token, &config).unwrap();

        assert_eq!(claims.sub, "jane");
        assert_eq!(claims.rid, "rid-1");
    }

    #[test]
    fn reset_token_does_not_validate_as_session_token() {
        let config = test_config();
        let token = create_reset_token("jane", "rid-1", &config).unwrap();
        assert!(verify_session_token(&token, &config).is_err());
    }

    #[test]
    fn session_token_does_not_validate_as_reset_token() {
        let config = test_config();
        let token =
            create_session_token("jane", Utc::now() + Duration::seconds(60), &config).unwrap();
        assert!(verify_reset_token(&token, &config).is_err());
    }
}

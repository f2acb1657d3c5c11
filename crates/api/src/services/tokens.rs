//! JWT signing and verification.
//!
//! Three token families, each with its own secret:
//! - access tokens: short-lived, carried as `Authorization: Bearer` on
//!   every authenticated request;
//! - refresh tokens: long-lived, carrying a bounded `uses_left` counter
//!   that decrements on every rotation;
//! - email tokens: one-hour tokens embedded in verification links.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use mercata_core::{Email, Role, UserId};

use crate::config::JwtConfig;

/// Token signing/verification failure.
#[derive(Debug, Error)]
#[error("token error: {0}")]
pub struct TokenError(#[from] jsonwebtoken::errors::Error);

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User ID.
    pub sub: i32,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Claims carried by a refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// User ID.
    pub sub: i32,
    pub email: String,
    pub role: Role,
    /// Rotations remaining before the user must sign in again.
    pub uses_left: u32,
    pub exp: i64,
}

/// Claims carried by an email verification token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailClaims {
    /// User ID.
    pub sub: i32,
    pub email: String,
    pub exp: i64,
}

fn sign<T: Serialize>(claims: &T, secret: &SecretString) -> Result<String, TokenError> {
    let key = EncodingKey::from_secret(secret.expose_secret().as_bytes());
    Ok(encode(&Header::default(), claims, &key)?)
}

fn verify<T: serde::de::DeserializeOwned>(
    token: &str,
    secret: &SecretString,
) -> Result<T, TokenError> {
    let key = DecodingKey::from_secret(secret.expose_secret().as_bytes());
    let data = decode::<T>(token, &key, &Validation::default())?;
    Ok(data.claims)
}

/// Sign an access token for a user.
///
/// # Errors
///
/// Returns `TokenError` if signing fails.
pub fn sign_access(
    config: &JwtConfig,
    user_id: UserId,
    email: &Email,
    role: Role,
    now: DateTime<Utc>,
) -> Result<String, TokenError> {
    let claims = AccessClaims {
        sub: user_id.as_i32(),
        email: email.to_string(),
        role,
        iat: now.timestamp(),
        exp: (now + Duration::minutes(config.access_ttl_minutes)).timestamp(),
    };
    sign(&claims, &config.access_secret)
}

/// Verify an access token.
///
/// # Errors
///
/// Returns `TokenError` if the token is malformed, tampered, or expired.
pub fn verify_access(config: &JwtConfig, token: &str) -> Result<AccessClaims, TokenError> {
    verify(token, &config.access_secret)
}

/// Sign a refresh token carrying `uses_left` remaining rotations.
///
/// # Errors
///
/// Returns `TokenError` if signing fails.
pub fn sign_refresh(
    config: &JwtConfig,
    user_id: UserId,
    email: &Email,
    role: Role,
    uses_left: u32,
    now: DateTime<Utc>,
) -> Result<String, TokenError> {
    let claims = RefreshClaims {
        sub: user_id.as_i32(),
        email: email.to_string(),
        role,
        uses_left,
        exp: (now + Duration::days(config.refresh_ttl_days)).timestamp(),
    };
    sign(&claims, &config.refresh_secret)
}

/// Verify a refresh token.
///
/// # Errors
///
/// Returns `TokenError` if the token is malformed, tampered, or expired.
pub fn verify_refresh(config: &JwtConfig, token: &str) -> Result<RefreshClaims, TokenError> {
    verify(token, &config.refresh_secret)
}

/// Sign an email verification token.
///
/// # Errors
///
/// Returns `TokenError` if signing fails.
pub fn sign_email(
    config: &JwtConfig,
    user_id: UserId,
    email: &Email,
    now: DateTime<Utc>,
) -> Result<String, TokenError> {
    let claims = EmailClaims {
        sub: user_id.as_i32(),
        email: email.to_string(),
        exp: (now + Duration::hours(config.email_ttl_hours)).timestamp(),
    };
    sign(&claims, &config.email_secret)
}

/// Verify an email verification token.
///
/// # Errors
///
/// Returns `TokenError` if the token is malformed, tampered, or expired.
pub fn verify_email_token(config: &JwtConfig, token: &str) -> Result<EmailClaims, TokenError> {
    verify(token, &config.email_secret)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            access_secret: SecretString::from("kJ8#mP2$vN9@qR5!wT3%xY7&zB4*cF6-aaaa"),
            refresh_secret: SecretString::from("qR5!wT3%xY7&zB4*cF6-kJ8#mP2$vN9@bbbb"),
            email_secret: SecretString::from("xY7&zB4*cF6-kJ8#mP2$vN9@qR5!wT3%cccc"),
            access_ttl_minutes: 15,
            refresh_ttl_days: 7,
            refresh_max_uses: 5,
            email_ttl_hours: 1,
            otp_ttl_minutes: 10,
        }
    }

    #[test]
    fn test_access_round_trip() {
        let config = test_config();
        let email = Email::parse("user@example.com").unwrap();
        let token = sign_access(&config, UserId::new(3), &email, Role::User, Utc::now()).unwrap();
        let claims = verify_access(&config, &token).unwrap();
        assert_eq!(claims.sub, 3);
        assert_eq!(claims.email, "user@example.com");
        assert_eq!(claims.role, Role::User);
    }

    #[test]
    fn test_refresh_carries_uses_left() {
        let config = test_config();
        let email = Email::parse("user@example.com").unwrap();
        let token =
            sign_refresh(&config, UserId::new(3), &email, Role::User, 5, Utc::now()).unwrap();
        let claims = verify_refresh(&config, &token).unwrap();
        assert_eq!(claims.uses_left, 5);
    }

    #[test]
    fn test_tokens_are_not_interchangeable() {
        let config = test_config();
        let email = Email::parse("user@example.com").unwrap();
        let access = sign_access(&config, UserId::new(3), &email, Role::User, Utc::now()).unwrap();
        // An access token must not verify as a refresh token.
        assert!(verify_refresh(&config, &access).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let config = test_config();
        let email = Email::parse("user@example.com").unwrap();
        let long_ago = Utc::now() - Duration::days(30);
        let token = sign_access(&config, UserId::new(3), &email, Role::User, long_ago).unwrap();
        assert!(verify_access(&config, &token).is_err());
    }
}

//! Authentication service.
//!
//! Signup with email verification, password sign-in, access/refresh token
//! rotation with a bounded reuse counter, and OTP-based password reset.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sqlx::PgPool;
use thiserror::Error;

use mercata_core::{Email, EmailError, Role, UserId};

use crate::config::Config;
use crate::db::RepositoryError;
use crate::db::otps::OtpRepository;
use crate::db::users::{NewUser, UserRepository};
use crate::models::User;
use crate::services::mail::{MailClient, MailError};
use crate::services::tokens;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Invalid credentials (wrong password or unknown email).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Sign-in attempted before the email was verified.
    #[error("email not verified")]
    EmailNotVerified,

    /// A token failed verification.
    #[error("invalid token")]
    InvalidToken,

    /// The refresh token's rotation budget is spent.
    #[error("refresh token exhausted")]
    RefreshExhausted,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Password-reset code missing, wrong, or expired.
    #[error("invalid or expired code")]
    InvalidOtp,

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Mail delivery failed.
    #[error("mail error: {0}")]
    Mail(#[from] MailError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// The token pair issued on sign-in and refresh.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    otps: OtpRepository<'a>,
    config: &'a Config,
    mail: &'a MailClient,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, config: &'a Config, mail: &'a MailClient) -> Self {
        Self {
            users: UserRepository::new(pool),
            otps: OtpRepository::new(pool),
            config,
            mail,
        }
    }

    /// Register a new account and send the verification link.
    ///
    /// The account is stored unverified; sign-in is refused until the link
    /// is followed. Mail failure here is surfaced, because the response
    /// promises "check your email".
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`/`WeakPassword` on bad input,
    /// `AuthError::UserAlreadyExists` on a duplicate email, and
    /// `AuthError::Mail` when the verification mail cannot be sent.
    pub async fn signup(
        &self,
        name: Option<&str>,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(&NewUser {
                name,
                email: &email,
                password_hash: &password_hash,
                role: Role::User,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        self.send_verification_link(&user, now).await
    }

    /// Flip a user to verified from an emailed token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` on a bad token and
    /// `AuthError::UserNotFound` if the account is missing or already
    /// verified.
    pub async fn verify_email(&self, token: &str) -> Result<User, AuthError> {
        let claims = tokens::verify_email_token(&self.config.jwt, token)
            .map_err(|_| AuthError::InvalidToken)?;
        let user_id = UserId::new(claims.sub);

        self.users.verify_email(user_id).await.map_err(|e| match e {
            RepositoryError::NotFound => AuthError::UserNotFound,
            other => AuthError::Repository(other),
        })?;

        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Password sign-in.
    ///
    /// Unknown email and wrong password are indistinguishable to the
    /// caller. An unverified account gets a fresh verification mail and an
    /// `EmailNotVerified` rejection.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials`, `AuthError::EmailNotVerified`,
    /// or lower-layer errors.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<(User, AuthTokens), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_with_password(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        if !user.email_verified {
            self.send_verification_link(&user, now).await?;
            return Err(AuthError::EmailNotVerified);
        }

        let tokens = self.issue_tokens(&user, self.config.jwt.refresh_max_uses, now)?;
        Ok((user, tokens))
    }

    /// Rotate a refresh token: a fresh access token plus a refresh token
    /// with one fewer use remaining.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` on a bad token and
    /// `AuthError::RefreshExhausted` when its rotation budget is spent.
    pub fn refresh(
        &self,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthTokens, AuthError> {
        let claims = tokens::verify_refresh(&self.config.jwt, refresh_token)
            .map_err(|_| AuthError::InvalidToken)?;

        if claims.uses_left == 0 {
            return Err(AuthError::RefreshExhausted);
        }

        let email = Email::parse(&claims.email).map_err(|_| AuthError::InvalidToken)?;
        let user_id = UserId::new(claims.sub);

        let access_token = tokens::sign_access(&self.config.jwt, user_id, &email, claims.role, now)
            .map_err(|_| AuthError::InvalidToken)?;
        let refresh_token = tokens::sign_refresh(
            &self.config.jwt,
            user_id,
            &email,
            claims.role,
            claims.uses_left - 1,
            now,
        )
        .map_err(|_| AuthError::InvalidToken)?;

        Ok(AuthTokens {
            access_token,
            refresh_token,
        })
    }

    /// Start a password reset: store and email a 6-digit code.
    ///
    /// Responds identically whether or not the email belongs to an account,
    /// so the endpoint cannot be used to probe for registered addresses.
    ///
    /// # Errors
    ///
    /// Returns lower-layer errors only; an unknown email is not an error.
    pub async fn forgot_password(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let email = match Email::parse(email) {
            Ok(email) => email,
            Err(_) => return Ok(()),
        };

        let Some(user) = self.users.get_by_email(&email).await? else {
            return Ok(());
        };

        let code = generate_otp_code();
        let expires_at = now + Duration::minutes(self.config.jwt.otp_ttl_minutes);
        self.otps.replace(&email, &code, expires_at).await?;

        self.mail
            .send_reset_code(user.email.as_str(), &code)
            .await?;

        Ok(())
    }

    /// Finish a password reset: verify the code, store the new hash,
    /// consume the code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidOtp` when the code doesn't match or has
    /// expired, `AuthError::WeakPassword` on a bad new password.
    pub async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidOtp)?;

        let otp = self
            .otps
            .find_valid(&email, code, now)
            .await?
            .ok_or(AuthError::InvalidOtp)?;

        validate_password(new_password)?;
        let password_hash = hash_password(new_password)?;

        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidOtp)?;

        self.users.set_password(user.id, &password_hash).await?;
        self.otps.delete(otp.id).await?;

        Ok(())
    }

    fn issue_tokens(
        &self,
        user: &User,
        refresh_uses: u32,
        now: DateTime<Utc>,
    ) -> Result<AuthTokens, AuthError> {
        let access_token =
            tokens::sign_access(&self.config.jwt, user.id, &user.email, user.role, now)
                .map_err(|_| AuthError::InvalidToken)?;
        let refresh_token = tokens::sign_refresh(
            &self.config.jwt,
            user.id,
            &user.email,
            user.role,
            refresh_uses,
            now,
        )
        .map_err(|_| AuthError::InvalidToken)?;

        Ok(AuthTokens {
            access_token,
            refresh_token,
        })
    }

    async fn send_verification_link(
        &self,
        user: &User,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let token = tokens::sign_email(&self.config.jwt, user.id, &user.email, now)
            .map_err(|_| AuthError::InvalidToken)?;
        let link = format!(
            "{}/api/v1/auth/verify-email/{token}",
            self.config.base_url.trim_end_matches('/')
        );

        self.mail
            .send_verification(user.email.as_str(), &link)
            .await?;

        Ok(())
    }
}

/// Validate password strength.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password with argon2 and a fresh salt.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| AuthError::PasswordHash)?;
    Ok(hash.to_string())
}

/// Verify a password against its stored hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on mismatch.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|_| AuthError::PasswordHash)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// A random 6-digit password-reset code.
fn generate_otp_code() -> String {
    let mut rng = rand::rng();
    format!("{:06}", rng.random_range(0..1_000_000))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;

    use crate::config::{JwtConfig, MailConfig, PushConfig};

    use super::*;

    fn test_config() -> Config {
        Config {
            database_url: SecretString::from("postgres://localhost/test"),
            host: std::net::IpAddr::from([127, 0, 0, 1]),
            port: 0,
            base_url: "http://localhost:3000".to_owned(),
            jwt: JwtConfig {
                access_secret: SecretString::from("kJ8#mP2$vN9@qR5!wT3%xY7&zB4*cF6-aaaa"),
                refresh_secret: SecretString::from("qR5!wT3%xY7&zB4*cF6-kJ8#mP2$vN9@bbbb"),
                email_secret: SecretString::from("xY7&zB4*cF6-kJ8#mP2$vN9@qR5!wT3%cccc"),
                access_ttl_minutes: 15,
                refresh_ttl_days: 7,
                refresh_max_uses: 5,
                email_ttl_hours: 1,
                otp_ttl_minutes: 10,
            },
            mail: MailConfig {
                api_url: "http://localhost:9999".to_owned(),
                api_key: SecretString::from("test-key"),
                from_email: "noreply@example.com".to_owned(),
                from_name: "Test".to_owned(),
            },
            push: PushConfig::default(),
            sentry_dsn: None,
        }
    }

    #[tokio::test]
    async fn test_refresh_chain_exhausts() {
        let config = test_config();
        // Lazy pool: never connects; refresh rotation is pure token work.
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/test")
            .unwrap();
        let mail = MailClient::new(&config.mail).unwrap();
        let service = AuthService::new(&pool, &config, &mail);

        let email = Email::parse("user@example.com").unwrap();
        let now = Utc::now();
        let token = crate::services::tokens::sign_refresh(
            &config.jwt,
            UserId::new(1),
            &email,
            Role::User,
            1,
            now,
        )
        .unwrap();

        // One rotation left: succeeds and hands back a token with zero.
        let rotated = service.refresh(&token, now).unwrap();
        let claims =
            crate::services::tokens::verify_refresh(&config.jwt, &rotated.refresh_token).unwrap();
        assert_eq!(claims.uses_left, 0);

        // The zero-uses token is refused.
        let err = service.refresh(&rotated.refresh_token, now).unwrap_err();
        assert!(matches!(err, AuthError::RefreshExhausted));
    }

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong password!", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_password_length_policy() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("long enough password").is_ok());
    }

    #[test]
    fn test_otp_code_shape() {
        for _ in 0..32 {
            let code = generate_otp_code();
            assert_eq!(code.len(), 6);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
        }
    }
}

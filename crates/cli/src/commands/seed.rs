//! Seed commands: bootstrap an admin account.

use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;
use thiserror::Error;

use mercata_core::Email;

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] mercata_core::EmailError),

    #[error("Password hashing failed")]
    PasswordHash,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Create (or update) the admin account with the given credentials.
///
/// Idempotent: re-running with the same email resets its password and
/// keeps the admin role. The account is created pre-verified.
///
/// # Errors
///
/// Returns `SeedError` on bad input or database failure.
pub async fn admin(email: &str, password: &str, name: Option<&str>) -> Result<(), SeedError> {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| SeedError::MissingEnvVar("DATABASE_URL"))?;

    let email = Email::parse(email)?;

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| SeedError::PasswordHash)?
        .to_string();

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(&database_url).await?;

    sqlx::query(
        "INSERT INTO users (name, email, password_hash, role, email_verified) \
         VALUES ($1, $2, $3, 'admin', TRUE) \
         ON CONFLICT (email) DO UPDATE \
             SET password_hash = EXCLUDED.password_hash, \
                 role = 'admin', \
                 email_verified = TRUE, \
                 updated_at = NOW()",
    )
    .bind(name)
    .bind(&email)
    .bind(&password_hash)
    .execute(&pool)
    .await?;

    tracing::info!(email = %email, "Admin account ready");
    Ok(())
}

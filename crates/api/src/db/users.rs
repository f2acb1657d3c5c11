//! User repository.

use sqlx::{PgPool, QueryBuilder};

use mercata_core::{Email, Role, UserId};

use super::{Page, RepositoryError};
use crate::models::User;

const USER_COLUMNS: &str = "id, name, email, role, avatar, age, phone_number, address, gender, \
                            active, email_verified, created_at, updated_at";

/// Fields for a new account row.
#[derive(Debug)]
pub struct NewUser<'a> {
    pub name: Option<&'a str>,
    pub email: &'a Email,
    pub password_hash: &'a str,
    pub role: Role,
}

/// Optional field updates for an existing account.
#[derive(Debug, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub age: Option<i32>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub role: Option<Role>,
}

/// Filters for the admin user listing.
#[derive(Debug, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub name: Option<String>,
}

#[derive(sqlx::FromRow)]
struct UserWithHash {
    #[sqlx(flatten)]
    user: User,
    password_hash: String,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Get a user together with their password hash, for credential checks.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithHash>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| (r.user, r.password_hash)))
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new: &NewUser<'_>) -> Result<User, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password_hash, role) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(new.name)
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.role)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "email already exists"))?;

        Ok(user)
    }

    /// Apply a partial update; absent fields keep their stored values.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(&self, id: UserId, patch: &UserPatch) -> Result<User, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET \
                 name = COALESCE($2, name), \
                 avatar = COALESCE($3, avatar), \
                 age = COALESCE($4, age), \
                 phone_number = COALESCE($5, phone_number), \
                 address = COALESCE($6, address), \
                 gender = COALESCE($7, gender), \
                 role = COALESCE($8, role), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.avatar.as_deref())
        .bind(patch.age)
        .bind(patch.phone_number.as_deref())
        .bind(patch.address.as_deref())
        .bind(patch.gender.as_deref())
        .bind(patch.role)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(user)
    }

    /// Replace a user's password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_password(&self, id: UserId, password_hash: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Mark a user's email as verified.
    ///
    /// Only flips unverified accounts, so a second click on the same
    /// verification link reports `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist or is
    /// already verified.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn verify_email(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET email_verified = TRUE, updated_at = NOW() \
             WHERE id = $1 AND email_verified = FALSE",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Deactivate an account (self-service delete).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn deactivate(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET active = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Delete an account outright (admin).
    ///
    /// Returns `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether every ID in `ids` names an existing user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all_exist(&self, ids: &[UserId]) -> Result<bool, RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(|id| id.as_i32()).collect();
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT id) FROM users WHERE id = ANY($1)")
                .bind(&raw)
                .fetch_one(self.pool)
                .await?;

        let distinct: std::collections::HashSet<UserId> = ids.iter().copied().collect();
        Ok(count == distinct.len() as i64)
    }

    /// List users with optional role/name filters, newest first by default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &UserFilter,
        page: Page,
    ) -> Result<(Vec<User>, i64), RepositoryError> {
        let mut query = QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE TRUE"));
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM users WHERE TRUE");

        if let Some(role) = filter.role {
            query.push(" AND role = ").push_bind(role);
            count.push(" AND role = ").push_bind(role);
        }
        if let Some(name) = &filter.name {
            let pattern = format!("%{name}%");
            query.push(" AND name ILIKE ").push_bind(pattern.clone());
            count.push(" AND name ILIKE ").push_bind(pattern);
        }

        query
            .push(format!(" ORDER BY created_at {}", page.order()))
            .push(" LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.skip);

        let users = query.build_query_as::<User>().fetch_all(self.pool).await?;
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        Ok((users, total))
    }
}

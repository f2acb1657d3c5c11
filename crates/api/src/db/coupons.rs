//! Coupon repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, QueryBuilder};

use mercata_core::{CouponId, CouponType};

use super::{Page, RepositoryError};
use crate::models::{Coupon, UserEntitlement};

const COUPON_COLUMNS: &str = "id, coupon_code, coupon_amount, coupon_type, start_date, \
                              end_date, is_enable, users, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct CouponRow {
    id: CouponId,
    coupon_code: String,
    coupon_amount: Decimal,
    coupon_type: CouponType,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    is_enable: bool,
    users: Json<Vec<UserEntitlement>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CouponRow> for Coupon {
    fn from(row: CouponRow) -> Self {
        Self {
            id: row.id,
            coupon_code: row.coupon_code,
            coupon_amount: row.coupon_amount,
            coupon_type: row.coupon_type,
            start_date: row.start_date,
            end_date: row.end_date,
            is_enable: row.is_enable,
            users: row.users.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Fields for a new coupon row.
#[derive(Debug)]
pub struct NewCoupon<'a> {
    pub coupon_code: &'a str,
    pub coupon_amount: Decimal,
    pub coupon_type: CouponType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_enable: bool,
    pub users: &'a [UserEntitlement],
}

/// Optional field updates for an existing coupon.
#[derive(Debug, Default)]
pub struct CouponPatch<'a> {
    pub coupon_amount: Option<Decimal>,
    pub coupon_type: Option<CouponType>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_enable: Option<bool>,
    pub users: Option<&'a [UserEntitlement]>,
}

/// Repository for coupon database operations.
pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    /// Create a new coupon repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a coupon by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CouponId) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Coupon::from))
    }

    /// Get a coupon by its code, regardless of state.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE coupon_code = $1"
        ))
        .bind(code)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Coupon::from))
    }

    /// Get a coupon by code only if it is enabled and `now` falls inside
    /// its validity window.
    ///
    /// Wrong code, disabled, and out-of-window all come back as `None`;
    /// callers cannot (and should not) tell them apart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_applicable(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons \
             WHERE coupon_code = $1 AND is_enable = TRUE \
               AND start_date <= $2 AND end_date >= $2"
        ))
        .bind(code)
        .bind(now)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Coupon::from))
    }

    /// Insert a coupon.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new: &NewCoupon<'_>) -> Result<Coupon, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "INSERT INTO coupons (coupon_code, coupon_amount, coupon_type, start_date, \
                                  end_date, is_enable, users) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COUPON_COLUMNS}"
        ))
        .bind(new.coupon_code)
        .bind(new.coupon_amount)
        .bind(new.coupon_type)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.is_enable)
        .bind(Json(new.users))
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "coupon already exists"))?;

        Ok(Coupon::from(row))
    }

    /// Update a coupon; absent fields keep their stored values.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: CouponId,
        patch: &CouponPatch<'_>,
    ) -> Result<Coupon, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "UPDATE coupons SET \
                 coupon_amount = COALESCE($2, coupon_amount), \
                 coupon_type = COALESCE($3, coupon_type), \
                 start_date = COALESCE($4, start_date), \
                 end_date = COALESCE($5, end_date), \
                 is_enable = COALESCE($6, is_enable), \
                 users = COALESCE($7, users), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COUPON_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.coupon_amount)
        .bind(patch.coupon_type)
        .bind(patch.start_date)
        .bind(patch.end_date)
        .bind(patch.is_enable)
        .bind(patch.users.map(Json))
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(Coupon::from(row))
    }

    /// Replace a coupon's entitlement list (usage bookkeeping).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update_entitlements(
        &self,
        id: CouponId,
        users: &[UserEntitlement],
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE coupons SET users = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(Json(users))
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Delete a coupon. Returns `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: CouponId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM coupons WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List coupons with an optional enabled filter.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        is_enable: Option<bool>,
        page: Page,
    ) -> Result<(Vec<Coupon>, i64), RepositoryError> {
        let mut query =
            QueryBuilder::new(format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE TRUE"));
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM coupons WHERE TRUE");

        if let Some(is_enable) = is_enable {
            query.push(" AND is_enable = ").push_bind(is_enable);
            count.push(" AND is_enable = ").push_bind(is_enable);
        }

        query
            .push(format!(" ORDER BY created_at {}", page.order()))
            .push(" LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.skip);

        let rows = query
            .build_query_as::<CouponRow>()
            .fetch_all(self.pool)
            .await?;
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        Ok((rows.into_iter().map(Coupon::from).collect(), total))
    }
}

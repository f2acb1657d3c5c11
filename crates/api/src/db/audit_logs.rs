//! Audit log repository.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, QueryBuilder};

use mercata_core::{AuditAction, AuditEntity, UserId};

use super::{Page, RepositoryError};
use crate::models::AuditLog;

const AUDIT_COLUMNS: &str =
    "id, entity_type, entity_id, action, performed_by, data, description, created_at";

/// Filters for the audit log listing.
#[derive(Debug, Default)]
pub struct AuditFilter {
    pub entity_type: Option<AuditEntity>,
    pub action: Option<AuditAction>,
    pub performed_by: Option<UserId>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Repository for audit log database operations.
pub struct AuditLogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AuditLogRepository<'a> {
    /// Create a new audit log repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an audit entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails. Callers
    /// treat this as best-effort and log rather than propagate.
    pub async fn insert(
        &self,
        entity_type: AuditEntity,
        entity_id: &str,
        action: AuditAction,
        performed_by: UserId,
        data: &serde_json::Value,
        description: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO audit_logs (entity_type, entity_id, action, performed_by, data, \
                                     description) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(entity_type)
        .bind(entity_id)
        .bind(action)
        .bind(performed_by)
        .bind(data)
        .bind(description)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// List audit entries matching the filter.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &AuditFilter,
        page: Page,
    ) -> Result<(Vec<AuditLog>, i64), RepositoryError> {
        let mut query =
            QueryBuilder::new(format!("SELECT {AUDIT_COLUMNS} FROM audit_logs WHERE TRUE"));
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM audit_logs WHERE TRUE");

        if let Some(entity_type) = filter.entity_type {
            query.push(" AND entity_type = ").push_bind(entity_type);
            count.push(" AND entity_type = ").push_bind(entity_type);
        }
        if let Some(action) = filter.action {
            query.push(" AND action = ").push_bind(action);
            count.push(" AND action = ").push_bind(action);
        }
        if let Some(performed_by) = filter.performed_by {
            query.push(" AND performed_by = ").push_bind(performed_by);
            count.push(" AND performed_by = ").push_bind(performed_by);
        }
        if let Some(start) = filter.start_date {
            query.push(" AND created_at >= ").push_bind(start);
            count.push(" AND created_at >= ").push_bind(start);
        }
        if let Some(end) = filter.end_date {
            query.push(" AND created_at <= ").push_bind(end);
            count.push(" AND created_at <= ").push_bind(end);
        }

        query
            .push(format!(" ORDER BY created_at {}", page.order()))
            .push(" LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.skip);

        let entries = query
            .build_query_as::<AuditLogRow>()
            .fetch_all(self.pool)
            .await?;
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        Ok((entries.into_iter().map(AuditLog::from).collect(), total))
    }
}

#[derive(sqlx::FromRow)]
struct AuditLogRow {
    id: mercata_core::AuditLogId,
    entity_type: AuditEntity,
    entity_id: String,
    action: AuditAction,
    performed_by: UserId,
    data: serde_json::Value,
    description: String,
    created_at: DateTime<Utc>,
}

impl From<AuditLogRow> for AuditLog {
    fn from(row: AuditLogRow) -> Self {
        Self {
            id: row.id,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            action: row.action,
            performed_by: row.performed_by,
            data: row.data,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

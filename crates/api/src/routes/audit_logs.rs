//! Audit log route handlers (admin only).

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;

use mercata_core::{AuditAction, AuditEntity, UserId};

use crate::db::audit_logs::{AuditFilter, AuditLogRepository};
use crate::error::ApiError;
use crate::middleware::RequireAdmin;
use crate::db::Page;
use crate::response::Paginated;
use crate::state::AppState;

/// List query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAuditLogsQuery {
    #[serde(rename = "_limit")]
    pub limit: Option<i64>,
    pub skip: Option<i64>,
    pub sort: Option<String>,
    pub entity_type: Option<AuditEntity>,
    pub action: Option<AuditAction>,
    pub performed_by: Option<UserId>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Admin: list audit entries.
#[instrument(skip(state, _admin))]
pub async fn index(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(query): Query<ListAuditLogsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = AuditLogRepository::new(state.pool());
    let filter = AuditFilter {
        entity_type: query.entity_type,
        action: query.action,
        performed_by: query.performed_by,
        start_date: query.start_date,
        end_date: query.end_date,
    };
    let page = Page::clamped(query.limit, query.skip, query.sort.as_deref());
    let (entries, total) = repo.list(&filter, page).await?;

    Ok(Paginated::new(
        "Audit logs found successfully",
        entries,
        total,
        page,
    ))
}

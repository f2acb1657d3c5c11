//! Best-effort audit recording.

use sqlx::PgPool;

use mercata_core::{AuditAction, AuditEntity, UserId};

use crate::db::audit_logs::AuditLogRepository;

/// Record an administrative mutation in the audit log.
///
/// Never fails the caller: a failed insert is logged and swallowed, since
/// the primary operation has already succeeded.
pub async fn record(
    pool: &PgPool,
    entity_type: AuditEntity,
    entity_id: impl ToString,
    action: AuditAction,
    performed_by: UserId,
    data: serde_json::Value,
    description: String,
) {
    let repo = AuditLogRepository::new(pool);

    if let Err(e) = repo
        .insert(
            entity_type,
            &entity_id.to_string(),
            action,
            performed_by,
            &data,
            &description,
        )
        .await
    {
        tracing::warn!(
            entity_type = %entity_type,
            action = %action,
            error = %e,
            "failed to write audit log entry"
        );
    }
}

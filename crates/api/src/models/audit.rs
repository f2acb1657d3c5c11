//! Audit log model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use mercata_core::{AuditAction, AuditEntity, AuditLogId, UserId};

/// A record of an administrative mutation.
///
/// Writing one is always best-effort: a failed audit insert is logged and
/// never fails the operation it describes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: AuditLogId,
    pub entity_type: AuditEntity,
    pub entity_id: String,
    pub action: AuditAction,
    pub performed_by: UserId,
    /// Snapshot of the entity after the mutation.
    pub data: serde_json::Value,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

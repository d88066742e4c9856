//! Best-effort audit trail writes.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use sea_orm::{QueryOrder, QuerySelect, prelude::*};

use crate::{audit_log, AuditEntry, AuditOutcome, ReferenceKind, ResultEngine};

use super::Engine;

impl Engine {
    /// Records an audit entry on the plain connection, after the financial
    /// commit.
    ///
    /// The trail is best-effort: an insert failure is logged and reported as
    /// [`AuditOutcome::Skipped`], never as an error, so it can never fail or
    /// roll back the posting it describes.
    pub(crate) async fn record_audit(
        &self,
        actor: &str,
        action: &str,
        reference: Option<(Uuid, ReferenceKind)>,
        balance_minor: Option<i64>,
        detail: Option<serde_json::Value>,
        recorded_at: DateTime<Utc>,
    ) -> AuditOutcome {
        let entry = AuditEntry {
            id: Uuid::new_v4(),
            actor: actor.to_string(),
            action: action.to_string(),
            reference_id: reference.map(|(id, _)| id),
            reference_kind: reference.map(|(_, kind)| kind),
            balance_minor,
            detail: detail.map(|value| value.to_string()),
            recorded_at,
        };

        match audit_log::ActiveModel::from(&entry).insert(&self.database).await {
            Ok(_) => AuditOutcome::Recorded,
            Err(err) => {
                tracing::warn!(%err, action, "audit entry dropped");
                AuditOutcome::Skipped
            }
        }
    }

    /// Most recent audit entries, newest first.
    pub async fn list_audit_entries(&self, limit: u64) -> ResultEngine<Vec<AuditEntry>> {
        let models = audit_log::Entity::find()
            .order_by_desc(audit_log::Column::RecordedAt)
            .limit(limit)
            .all(&self.database)
            .await?;
        models.into_iter().map(AuditEntry::try_from).collect()
    }
}

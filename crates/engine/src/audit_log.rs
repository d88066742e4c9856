//! Best-effort audit trail.
//!
//! Audit entries are written after a financial posting commits; a failure to
//! record one never fails or rolls back the posting. [`AuditOutcome`] is the
//! explicit side-channel result callers can observe instead of an error.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::parse_uuid;
use crate::{EngineError, ReferenceKind};

/// Result of a best-effort audit write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Recorded,
    /// The write failed; the failure was logged and swallowed.
    Skipped,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub actor: String,
    /// Dotted action name, e.g. `ledger.post` or `debt.payment`.
    pub action: String,
    pub reference_id: Option<Uuid>,
    pub reference_kind: Option<ReferenceKind>,
    /// Ledger balance after the action, when the action moved it.
    pub balance_minor: Option<i64>,
    /// Structured JSON detail payload.
    pub detail: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "audit_log")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub actor: String,
    pub action: String,
    pub reference_id: Option<String>,
    pub reference_kind: Option<String>,
    pub balance_minor: Option<i64>,
    pub detail: Option<String>,
    pub recorded_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&AuditEntry> for ActiveModel {
    fn from(entry: &AuditEntry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id.to_string()),
            actor: ActiveValue::Set(entry.actor.clone()),
            action: ActiveValue::Set(entry.action.clone()),
            reference_id: ActiveValue::Set(entry.reference_id.map(|id| id.to_string())),
            reference_kind: ActiveValue::Set(entry.reference_kind.map(|k| k.as_str().to_string())),
            balance_minor: ActiveValue::Set(entry.balance_minor),
            detail: ActiveValue::Set(entry.detail.clone()),
            recorded_at: ActiveValue::Set(entry.recorded_at),
        }
    }
}

impl TryFrom<Model> for AuditEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let reference_kind = model
            .reference_kind
            .as_deref()
            .map(ReferenceKind::try_from)
            .transpose()?;
        let reference_id = model
            .reference_id
            .as_deref()
            .map(|raw| parse_uuid(raw, "reference"))
            .transpose()?;

        Ok(Self {
            id: parse_uuid(&model.id, "audit entry")?,
            actor: model.actor,
            action: model.action,
            reference_id,
            reference_kind,
            balance_minor: model.balance_minor,
            detail: model.detail,
            recorded_at: model.recorded_at,
        })
    }
}

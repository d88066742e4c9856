//! Settlements applied against a debt.
//!
//! A `DebtPayment` is immutable once recorded; the sum of payments for a
//! debt never exceeds the debt's original amount.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::parse_uuid;
use crate::{EngineError, PaymentMethod};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtPayment {
    pub id: Uuid,
    pub debt_id: Uuid,
    pub amount_minor: i64,
    pub method: PaymentMethod,
    pub received_by: String,
    pub note: Option<String>,
    pub paid_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "debt_payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub debt_id: String,
    pub amount_minor: i64,
    pub method: String,
    pub received_by: String,
    pub note: Option<String>,
    pub paid_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::debts::Entity",
        from = "Column::DebtId",
        to = "super::debts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Debts,
}

impl Related<super::debts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Debts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&DebtPayment> for ActiveModel {
    fn from(payment: &DebtPayment) -> Self {
        Self {
            id: ActiveValue::Set(payment.id.to_string()),
            debt_id: ActiveValue::Set(payment.debt_id.to_string()),
            amount_minor: ActiveValue::Set(payment.amount_minor),
            method: ActiveValue::Set(payment.method.as_str().to_string()),
            received_by: ActiveValue::Set(payment.received_by.clone()),
            note: ActiveValue::Set(payment.note.clone()),
            paid_at: ActiveValue::Set(payment.paid_at),
        }
    }
}

impl TryFrom<Model> for DebtPayment {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "debt payment")?,
            debt_id: parse_uuid(&model.debt_id, "debt")?,
            amount_minor: model.amount_minor,
            method: PaymentMethod::try_from(model.method.as_str())?,
            received_by: model.received_by,
            note: model.note,
            paid_at: model.paid_at,
        })
    }
}

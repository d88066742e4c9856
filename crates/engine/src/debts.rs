//! Customer debts.
//!
//! A `Debt` is the amount a customer still owes against one specific sale.
//! It is created at most once per sale, when the amount paid at the till is
//! less than the invoice total, and is reduced by payments over time.
//!
//! Invariant: `remaining_minor = original_minor - sum(payments)` and never
//! goes negative.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::parse_uuid;
use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
    WrittenOff,
}

impl DebtStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Partial => "partial",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::WrittenOff => "written_off",
        }
    }

    /// Whether the debt still counts towards the customer's open balance.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Partial | Self::Overdue)
    }
}

impl TryFrom<&str> for DebtStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "partial" => Ok(Self::Partial),
            "paid" => Ok(Self::Paid),
            "overdue" => Ok(Self::Overdue),
            "written_off" => Ok(Self::WrittenOff),
            other => Err(EngineError::Validation(format!(
                "invalid debt status: {other}"
            ))),
        }
    }
}

/// Status after a payment leaves `remaining_minor` behind.
pub(crate) fn status_after_payment(remaining_minor: i64) -> DebtStatus {
    if remaining_minor <= 0 {
        DebtStatus::Paid
    } else {
        DebtStatus::Partial
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debt {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub customer_id: Uuid,
    pub original_minor: i64,
    pub remaining_minor: i64,
    pub due_date: DateTime<Utc>,
    pub status: DebtStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "debts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub sale_id: String,
    pub customer_id: String,
    pub original_minor: i64,
    pub remaining_minor: i64,
    pub due_date: DateTimeUtc,
    pub status: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::debt_payments::Entity")]
    DebtPayments,
    #[sea_orm(
        belongs_to = "super::sales::Entity",
        from = "Column::SaleId",
        to = "super::sales::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Sales,
    #[sea_orm(
        belongs_to = "super::customers::Entity",
        from = "Column::CustomerId",
        to = "super::customers::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Customers,
}

impl Related<super::debt_payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DebtPayments.def()
    }
}

impl Related<super::sales::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sales.def()
    }
}

impl Related<super::customers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Debt> for ActiveModel {
    fn from(debt: &Debt) -> Self {
        Self {
            id: ActiveValue::Set(debt.id.to_string()),
            sale_id: ActiveValue::Set(debt.sale_id.to_string()),
            customer_id: ActiveValue::Set(debt.customer_id.to_string()),
            original_minor: ActiveValue::Set(debt.original_minor),
            remaining_minor: ActiveValue::Set(debt.remaining_minor),
            due_date: ActiveValue::Set(debt.due_date),
            status: ActiveValue::Set(debt.status.as_str().to_string()),
            created_at: ActiveValue::Set(debt.created_at),
        }
    }
}

impl TryFrom<Model> for Debt {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "debt")?,
            sale_id: parse_uuid(&model.sale_id, "sale")?,
            customer_id: parse_uuid(&model.customer_id, "customer")?,
            original_minor: model.original_minor,
            remaining_minor: model.remaining_minor,
            due_date: model.due_date,
            status: DebtStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_status_steps() {
        assert_eq!(status_after_payment(0), DebtStatus::Paid);
        assert_eq!(status_after_payment(25), DebtStatus::Partial);
    }

    #[test]
    fn open_statuses() {
        assert!(DebtStatus::Pending.is_open());
        assert!(DebtStatus::Partial.is_open());
        assert!(DebtStatus::Overdue.is_open());
        assert!(!DebtStatus::Paid.is_open());
        assert!(!DebtStatus::WrittenOff.is_open());
    }
}

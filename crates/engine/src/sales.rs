//! Sale headers.
//!
//! A `Sale` totals its line items and tracks how much of the invoice has
//! been paid. `balance_due_minor = total_minor - amount_paid_minor` is kept
//! in lockstep with the bound debt's remaining amount whenever both exist.
//!
//! A sale flagged `is_deferred` is a "walpo" order: invoiced in full at
//! order time, goods collected incrementally afterwards.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::parse_uuid;
use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalePaymentStatus {
    Paid,
    Partial,
    Credit,
    Pending,
    Cancelled,
}

impl SalePaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Partial => "partial",
            Self::Credit => "credit",
            Self::Pending => "pending",
            Self::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<&str> for SalePaymentStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "paid" => Ok(Self::Paid),
            "partial" => Ok(Self::Partial),
            "credit" => Ok(Self::Credit),
            "pending" => Ok(Self::Pending),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::Validation(format!(
                "invalid sale payment status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub subtotal_minor: i64,
    pub discount_minor: i64,
    pub tax_minor: i64,
    pub total_minor: i64,
    pub amount_paid_minor: i64,
    pub balance_due_minor: i64,
    pub payment_status: SalePaymentStatus,
    pub is_deferred: bool,
    pub occurred_at: DateTime<Utc>,
    pub created_by: String,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub customer_id: Option<String>,
    pub subtotal_minor: i64,
    pub discount_minor: i64,
    pub tax_minor: i64,
    pub total_minor: i64,
    pub amount_paid_minor: i64,
    pub balance_due_minor: i64,
    pub payment_status: String,
    pub is_deferred: bool,
    pub occurred_at: DateTimeUtc,
    pub created_by: String,
    pub cancelled_at: Option<DateTimeUtc>,
    pub cancelled_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sale_items::Entity")]
    SaleItems,
    #[sea_orm(
        belongs_to = "super::customers::Entity",
        from = "Column::CustomerId",
        to = "super::customers::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Customers,
}

impl Related<super::sale_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SaleItems.def()
    }
}

impl Related<super::customers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Sale> for ActiveModel {
    fn from(sale: &Sale) -> Self {
        Self {
            id: ActiveValue::Set(sale.id.to_string()),
            customer_id: ActiveValue::Set(sale.customer_id.map(|id| id.to_string())),
            subtotal_minor: ActiveValue::Set(sale.subtotal_minor),
            discount_minor: ActiveValue::Set(sale.discount_minor),
            tax_minor: ActiveValue::Set(sale.tax_minor),
            total_minor: ActiveValue::Set(sale.total_minor),
            amount_paid_minor: ActiveValue::Set(sale.amount_paid_minor),
            balance_due_minor: ActiveValue::Set(sale.balance_due_minor),
            payment_status: ActiveValue::Set(sale.payment_status.as_str().to_string()),
            is_deferred: ActiveValue::Set(sale.is_deferred),
            occurred_at: ActiveValue::Set(sale.occurred_at),
            created_by: ActiveValue::Set(sale.created_by.clone()),
            cancelled_at: ActiveValue::Set(sale.cancelled_at),
            cancelled_by: ActiveValue::Set(sale.cancelled_by.clone()),
        }
    }
}

impl TryFrom<Model> for Sale {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let customer_id = model
            .customer_id
            .as_deref()
            .map(|raw| parse_uuid(raw, "customer"))
            .transpose()?;

        Ok(Self {
            id: parse_uuid(&model.id, "sale")?,
            customer_id,
            subtotal_minor: model.subtotal_minor,
            discount_minor: model.discount_minor,
            tax_minor: model.tax_minor,
            total_minor: model.total_minor,
            amount_paid_minor: model.amount_paid_minor,
            balance_due_minor: model.balance_due_minor,
            payment_status: SalePaymentStatus::try_from(model.payment_status.as_str())?,
            is_deferred: model.is_deferred,
            occurred_at: model.occurred_at,
            created_by: model.created_by,
            cancelled_at: model.cancelled_at,
            cancelled_by: model.cancelled_by,
        })
    }
}

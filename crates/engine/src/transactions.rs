//! Ledger transaction primitives.
//!
//! A `Transaction` is one money-moving business event appended to the ledger.
//! Every row carries either a debit or a credit (never both) and the running
//! balance that results from applying it to the previous row.
//!
//! Amounts are stored as signed integer **minor units** (e.g. cents). Rows are
//! totally ordered by `seq`, a store-assigned monotonic sequence; `occurred_at`
//! is informational and does not define order.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::parse_uuid;
use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Sale,
    Purchase,
    Transportation,
    Expense,
    Income,
    DebtCollection,
    WalpoCreated,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Purchase => "purchase",
            Self::Transportation => "transportation",
            Self::Expense => "expense",
            Self::Income => "income",
            Self::DebtCollection => "debt_collection",
            Self::WalpoCreated => "walpo_created",
        }
    }

    /// Whether this kind increases the running balance (credit side).
    ///
    /// Money-in kinds credit the ledger; everything else debits it. A deferred
    /// order (`WalpoCreated`) records the cash collected at origination, so it
    /// sits on the credit side next to `Sale`.
    pub fn is_credit(self) -> bool {
        matches!(
            self,
            Self::Sale | Self::Income | Self::DebtCollection | Self::WalpoCreated
        )
    }

    /// Whether this kind represents an invoiced sale (ordinary or deferred).
    pub(crate) fn is_sale(self) -> bool {
        matches!(self, Self::Sale | Self::WalpoCreated)
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "sale" => Ok(Self::Sale),
            "purchase" => Ok(Self::Purchase),
            "transportation" => Ok(Self::Transportation),
            "expense" => Ok(Self::Expense),
            "income" => Ok(Self::Income),
            "debt_collection" => Ok(Self::DebtCollection),
            "walpo_created" => Ok(Self::WalpoCreated),
            other => Err(EngineError::Validation(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    MobileMoney,
    Other,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::MobileMoney => "mobile_money",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for PaymentMethod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "cash" => Ok(Self::Cash),
            "mobile_money" => Ok(Self::MobileMoney),
            "other" => Ok(Self::Other),
            other => Err(EngineError::Validation(format!(
                "invalid payment method: {other}"
            ))),
        }
    }
}

/// Kind of document a ledger row originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Sale,
    Purchase,
    Expense,
    Debt,
}

impl ReferenceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Purchase => "purchase",
            Self::Expense => "expense",
            Self::Debt => "debt",
        }
    }
}

impl TryFrom<&str> for ReferenceKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "sale" => Ok(Self::Sale),
            "purchase" => Ok(Self::Purchase),
            "expense" => Ok(Self::Expense),
            "debt" => Ok(Self::Debt),
            other => Err(EngineError::Validation(format!(
                "invalid reference kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Store-assigned monotonic sequence (insertion order).
    pub seq: i64,
    /// Stable external identifier.
    pub id: Uuid,
    pub kind: TransactionKind,
    pub occurred_at: DateTime<Utc>,
    pub debit_minor: i64,
    pub credit_minor: i64,
    /// Running balance after applying this row to the previous one.
    pub balance_minor: i64,
    pub payment_method: PaymentMethod,
    /// Credit portion created alongside a partly-cash sale posting.
    pub debt_portion_minor: i64,
    pub reference_id: Option<Uuid>,
    pub reference_kind: Option<ReferenceKind>,
    pub note: Option<String>,
    pub created_by: String,
    pub reversed_at: Option<DateTime<Utc>>,
    pub reversed_by: Option<String>,
    /// Set on a compensating entry: the id of the row it negates.
    pub reversal_of: Option<Uuid>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub seq: i64,
    pub id: String,
    pub kind: String,
    pub occurred_at: DateTimeUtc,
    pub debit_minor: i64,
    pub credit_minor: i64,
    pub balance_minor: i64,
    pub payment_method: String,
    pub debt_portion_minor: i64,
    pub reference_id: Option<String>,
    pub reference_kind: Option<String>,
    pub note: Option<String>,
    pub created_by: String,
    pub reversed_at: Option<DateTimeUtc>,
    pub reversed_by: Option<String>,
    pub reversal_of: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            // seq is assigned by the store on insert.
            seq: ActiveValue::NotSet,
            id: ActiveValue::Set(tx.id.to_string()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            occurred_at: ActiveValue::Set(tx.occurred_at),
            debit_minor: ActiveValue::Set(tx.debit_minor),
            credit_minor: ActiveValue::Set(tx.credit_minor),
            balance_minor: ActiveValue::Set(tx.balance_minor),
            payment_method: ActiveValue::Set(tx.payment_method.as_str().to_string()),
            debt_portion_minor: ActiveValue::Set(tx.debt_portion_minor),
            reference_id: ActiveValue::Set(tx.reference_id.map(|id| id.to_string())),
            reference_kind: ActiveValue::Set(tx.reference_kind.map(|k| k.as_str().to_string())),
            note: ActiveValue::Set(tx.note.clone()),
            created_by: ActiveValue::Set(tx.created_by.clone()),
            reversed_at: ActiveValue::Set(tx.reversed_at),
            reversed_by: ActiveValue::Set(tx.reversed_by.clone()),
            reversal_of: ActiveValue::Set(tx.reversal_of.map(|id| id.to_string())),
        }
    }
}

impl TryFrom<Model> for Transaction {
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
        let reversal_of = model
            .reversal_of
            .as_deref()
            .map(|raw| parse_uuid(raw, "transaction"))
            .transpose()?;

        Ok(Self {
            seq: model.seq,
            id: parse_uuid(&model.id, "transaction")?,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            occurred_at: model.occurred_at,
            debit_minor: model.debit_minor,
            credit_minor: model.credit_minor,
            balance_minor: model.balance_minor,
            payment_method: PaymentMethod::try_from(model.payment_method.as_str())?,
            debt_portion_minor: model.debt_portion_minor,
            reference_id,
            reference_kind,
            note: model.note,
            created_by: model.created_by,
            reversed_at: model.reversed_at,
            reversed_by: model.reversed_by,
            reversal_of,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_in_kinds_credit_the_ledger() {
        for kind in [
            TransactionKind::Sale,
            TransactionKind::Income,
            TransactionKind::DebtCollection,
            TransactionKind::WalpoCreated,
        ] {
            assert!(kind.is_credit(), "{} should credit", kind.as_str());
        }
        for kind in [
            TransactionKind::Purchase,
            TransactionKind::Expense,
            TransactionKind::Transportation,
        ] {
            assert!(!kind.is_credit(), "{} should debit", kind.as_str());
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(TransactionKind::try_from("withdrawal").is_err());
    }
}

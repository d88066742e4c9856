//! Debt lifecycle: origination, settlement, write-off, overdue sweep.
//!
//! `apply_debt_payment` is the only writer that touches the debt, the bound
//! sale, the customer's cached balance and the ledger together; everything
//! happens in one DB transaction so a failure leaves all of them untouched.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use serde_json::json;

use crate::util::day_key;
use crate::{
    customers, debt_payments, debts, sales, Debt, DebtPayment, DebtPaymentCmd, DebtStatus,
    EngineError, OriginateDebtCmd, ReferenceKind, ResultEngine, SalePaymentStatus, TransactionKind,
};

use super::ledger::EntrySpec;
use super::{with_tx, Engine};

impl Engine {
    /// Creates a debt bound to a sale and bumps the customer's cached
    /// balance.
    ///
    /// The invoice value was already recorded by the sale posting, so no
    /// ledger entry is written here.
    pub async fn originate_debt(&self, cmd: OriginateDebtCmd) -> ResultEngine<Debt> {
        let debt: Debt = with_tx!(self, |db_tx| {
            self.originate_debt_in_tx(
                &db_tx,
                cmd.sale_id,
                cmd.customer_id,
                cmd.amount_minor,
                cmd.due_in_days,
                cmd.occurred_at,
            )
            .await
        })?;

        self.record_audit(
            "system",
            "debt.originate",
            Some((debt.sale_id, ReferenceKind::Sale)),
            None,
            Some(json!({ "amount_minor": debt.original_minor })),
            debt.created_at,
        )
        .await;

        Ok(debt)
    }

    /// Applies one settlement against a debt as a single atomic unit:
    /// payment row, debt remainder/status, bound sale paid/due fields,
    /// customer cached balance and a `debt_collection` ledger posting.
    ///
    /// Over-payment is rejected with no mutation at all.
    pub async fn apply_debt_payment(&self, cmd: DebtPaymentCmd) -> ResultEngine<DebtPayment> {
        if cmd.amount_minor <= 0 {
            return Err(EngineError::Validation(
                "amount_minor must be > 0".to_string(),
            ));
        }

        let _posting = self.posting_lock.lock().await;
        let payment: DebtPayment = with_tx!(self, |db_tx| {
            let debt_model = debts::Entity::find_by_id(cmd.debt_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("debt".to_string()))?;
            let debt = Debt::try_from(debt_model)?;

            if debt.status == DebtStatus::WrittenOff {
                return Err(EngineError::Validation("debt is written off".to_string()));
            }
            if cmd.amount_minor > debt.remaining_minor {
                return Err(EngineError::Validation(
                    "payment exceeds remaining debt".to_string(),
                ));
            }

            let payment = DebtPayment {
                id: Uuid::new_v4(),
                debt_id: debt.id,
                amount_minor: cmd.amount_minor,
                method: cmd.method,
                received_by: cmd.received_by.clone(),
                note: cmd.note.clone(),
                paid_at: cmd.paid_at,
            };
            debt_payments::ActiveModel::from(&payment).insert(&db_tx).await?;

            let remaining_minor = debt.remaining_minor - cmd.amount_minor;
            let debt_update = debts::ActiveModel {
                id: ActiveValue::Set(debt.id.to_string()),
                remaining_minor: ActiveValue::Set(remaining_minor),
                status: ActiveValue::Set(
                    debts::status_after_payment(remaining_minor)
                        .as_str()
                        .to_string(),
                ),
                ..Default::default()
            };
            debt_update.update(&db_tx).await?;

            self.mirror_payment_onto_sale(&db_tx, debt.sale_id, cmd.amount_minor)
                .await?;
            self.add_to_customer_balance(&db_tx, debt.customer_id, -cmd.amount_minor)
                .await?;

            self.append_entry(
                &db_tx,
                EntrySpec {
                    kind: TransactionKind::DebtCollection,
                    debit_minor: 0,
                    credit_minor: cmd.amount_minor,
                    payment_method: cmd.method,
                    debt_portion_minor: 0,
                    reference_id: Some(debt.id),
                    reference_kind: Some(ReferenceKind::Debt),
                    note: cmd.note.clone(),
                    created_by: cmd.received_by.clone(),
                    occurred_at: cmd.paid_at,
                    reversal_of: None,
                },
            )
            .await?;
            self.apply_to_summary(
                &db_tx,
                TransactionKind::DebtCollection,
                cmd.amount_minor,
                cmd.method,
                0,
                &day_key(cmd.paid_at),
            )
            .await?;

            Ok(payment)
        })?;

        self.record_audit(
            &payment.received_by,
            "debt.payment",
            Some((payment.debt_id, ReferenceKind::Debt)),
            None,
            Some(json!({ "amount_minor": payment.amount_minor })),
            payment.paid_at,
        )
        .await;

        Ok(payment)
    }

    /// Administrative transition to `written_off`.
    ///
    /// The outstanding amount is forgiven but stays historically recorded:
    /// neither the remaining amount nor the customer's cached balance is
    /// touched.
    pub async fn write_off_debt(
        &self,
        debt_id: Uuid,
        actor: &str,
        occurred_at: DateTime<Utc>,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let debt_model = debts::Entity::find_by_id(debt_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("debt".to_string()))?;
            let debt = Debt::try_from(debt_model)?;

            if !debt.status.is_open() {
                return Err(EngineError::Validation(format!(
                    "cannot write off a {} debt",
                    debt.status.as_str()
                )));
            }

            let debt_update = debts::ActiveModel {
                id: ActiveValue::Set(debt.id.to_string()),
                status: ActiveValue::Set(DebtStatus::WrittenOff.as_str().to_string()),
                ..Default::default()
            };
            debt_update.update(&db_tx).await?;
            Ok(())
        })?;

        self.record_audit(
            actor,
            "debt.write_off",
            Some((debt_id, ReferenceKind::Debt)),
            None,
            None,
            occurred_at,
        )
        .await;

        Ok(())
    }

    /// Administrative sweep: pending/partial debts past their due date
    /// become `overdue`. Returns how many rows moved.
    pub async fn mark_overdue(&self, as_of: DateTime<Utc>) -> ResultEngine<u64> {
        with_tx!(self, |db_tx| {
            let result = debts::Entity::update_many()
                .col_expr(
                    debts::Column::Status,
                    Expr::value(DebtStatus::Overdue.as_str()),
                )
                .filter(debts::Column::Status.is_in([
                    DebtStatus::Pending.as_str(),
                    DebtStatus::Partial.as_str(),
                ]))
                .filter(debts::Column::DueDate.lt(as_of))
                .exec(&db_tx)
                .await?;
            Ok(result.rows_affected)
        })
    }

    pub async fn debt_by_id(&self, debt_id: Uuid) -> ResultEngine<Debt> {
        let model = debts::Entity::find_by_id(debt_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound("debt".to_string()))?;
        Debt::try_from(model)
    }

    /// The debt bound to a sale, if the sale created one.
    pub async fn debt_for_sale(&self, sale_id: Uuid) -> ResultEngine<Option<Debt>> {
        let model = debts::Entity::find()
            .filter(debts::Column::SaleId.eq(sale_id.to_string()))
            .one(&self.database)
            .await?;
        model.map(Debt::try_from).transpose()
    }

    pub async fn debts_for_customer(&self, customer_id: Uuid) -> ResultEngine<Vec<Debt>> {
        let models = debts::Entity::find()
            .filter(debts::Column::CustomerId.eq(customer_id.to_string()))
            .order_by_asc(debts::Column::CreatedAt)
            .all(&self.database)
            .await?;
        models.into_iter().map(Debt::try_from).collect()
    }

    pub async fn payments_for_debt(&self, debt_id: Uuid) -> ResultEngine<Vec<DebtPayment>> {
        let models = debt_payments::Entity::find()
            .filter(debt_payments::Column::DebtId.eq(debt_id.to_string()))
            .order_by_asc(debt_payments::Column::PaidAt)
            .all(&self.database)
            .await?;
        models.into_iter().map(DebtPayment::try_from).collect()
    }

    /// Shared by sale recording and standalone origination; runs inside the
    /// caller's transaction.
    pub(crate) async fn originate_debt_in_tx(
        &self,
        db_tx: &DatabaseTransaction,
        sale_id: Uuid,
        customer_id: Uuid,
        amount_minor: i64,
        due_in_days: i64,
        occurred_at: DateTime<Utc>,
    ) -> ResultEngine<Debt> {
        if amount_minor <= 0 {
            return Err(EngineError::Validation(
                "amount_minor must be > 0".to_string(),
            ));
        }
        if due_in_days < 0 {
            return Err(EngineError::Validation(
                "due_in_days must be >= 0".to_string(),
            ));
        }

        sales::Entity::find_by_id(sale_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound("sale".to_string()))?;

        let existing = debts::Entity::find()
            .filter(debts::Column::SaleId.eq(sale_id.to_string()))
            .one(db_tx)
            .await?;
        if existing.is_some() {
            return Err(EngineError::Validation(
                "debt already exists for this sale".to_string(),
            ));
        }

        let debt = Debt {
            id: Uuid::new_v4(),
            sale_id,
            customer_id,
            original_minor: amount_minor,
            remaining_minor: amount_minor,
            due_date: occurred_at + Duration::days(due_in_days),
            status: DebtStatus::Pending,
            created_at: occurred_at,
        };
        debts::ActiveModel::from(&debt).insert(db_tx).await?;

        self.add_to_customer_balance(db_tx, customer_id, amount_minor)
            .await?;

        Ok(debt)
    }

    async fn mirror_payment_onto_sale(
        &self,
        db_tx: &DatabaseTransaction,
        sale_id: Uuid,
        amount_minor: i64,
    ) -> ResultEngine<()> {
        let sale_model = sales::Entity::find_by_id(sale_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound("sale".to_string()))?;

        let amount_paid_minor = sale_model.amount_paid_minor + amount_minor;
        let balance_due_minor = sale_model.balance_due_minor - amount_minor;
        let payment_status = if balance_due_minor <= 0 {
            SalePaymentStatus::Paid
        } else {
            SalePaymentStatus::Partial
        };

        let sale_update = sales::ActiveModel {
            id: ActiveValue::Set(sale_model.id),
            amount_paid_minor: ActiveValue::Set(amount_paid_minor),
            balance_due_minor: ActiveValue::Set(balance_due_minor),
            payment_status: ActiveValue::Set(payment_status.as_str().to_string()),
            ..Default::default()
        };
        sale_update.update(db_tx).await?;

        Ok(())
    }

    /// Adds a (possibly negative) delta to the customer's cached open-debt
    /// balance.
    pub(crate) async fn add_to_customer_balance(
        &self,
        db_tx: &DatabaseTransaction,
        customer_id: Uuid,
        delta_minor: i64,
    ) -> ResultEngine<()> {
        let customer_model = customers::Entity::find_by_id(customer_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound("customer".to_string()))?;

        let customer_update = customers::ActiveModel {
            id: ActiveValue::Set(customer_model.id),
            current_balance_minor: ActiveValue::Set(
                customer_model.current_balance_minor + delta_minor,
            ),
            ..Default::default()
        };
        customer_update.update(db_tx).await?;

        Ok(())
    }
}

//! Customer balance reads and repair.

use uuid::Uuid;

use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*};

use crate::{customers, debts, Customer, DebtStatus, EngineError, ResultEngine};

use super::{with_tx, Engine};

impl Engine {
    pub async fn customer_by_id(&self, customer_id: Uuid) -> ResultEngine<Customer> {
        let model = customers::Entity::find_by_id(customer_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound("customer".to_string()))?;
        Customer::try_from(model)
    }

    /// Recomputes the customer's cached balance from the debt table
    /// (source of truth) and persists it. Returns the recomputed value.
    ///
    /// Open debts (pending, partial, overdue) count; paid and written-off
    /// debts do not.
    pub async fn recompute_customer_balance(&self, customer_id: Uuid) -> ResultEngine<i64> {
        with_tx!(self, |db_tx| {
            customers::Entity::find_by_id(customer_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("customer".to_string()))?;

            let debt_models = debts::Entity::find()
                .filter(debts::Column::CustomerId.eq(customer_id.to_string()))
                .filter(debts::Column::Status.is_in([
                    DebtStatus::Pending.as_str(),
                    DebtStatus::Partial.as_str(),
                    DebtStatus::Overdue.as_str(),
                ]))
                .all(&db_tx)
                .await?;
            let balance_minor: i64 = debt_models.iter().map(|model| model.remaining_minor).sum();

            let customer_update = customers::ActiveModel {
                id: ActiveValue::Set(customer_id.to_string()),
                current_balance_minor: ActiveValue::Set(balance_minor),
                ..Default::default()
            };
            customer_update.update(&db_tx).await?;

            Ok(balance_minor)
        })
    }
}

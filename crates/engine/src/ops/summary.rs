//! Daily summary maintenance.
//!
//! Summary rows are found-or-created and incremented inside the caller's
//! transaction, so a posting and its rollup commit or fail together.

use sea_orm::{DatabaseTransaction, prelude::*};

use crate::{daily_summaries, DailySummary, PaymentMethod, ResultEngine, TransactionKind};

use super::Engine;

impl Engine {
    /// Rolls a posting into the summary row for `date`, creating the row on
    /// the first posting of that date.
    pub(crate) async fn apply_to_summary(
        &self,
        db_tx: &DatabaseTransaction,
        kind: TransactionKind,
        amount_minor: i64,
        method: PaymentMethod,
        debt_portion_minor: i64,
        date: &str,
    ) -> ResultEngine<()> {
        match daily_summaries::Entity::find_by_id(date.to_string())
            .one(db_tx)
            .await?
        {
            Some(model) => {
                let mut summary = DailySummary::from(model);
                summary.apply(kind, amount_minor, method, debt_portion_minor);
                daily_summaries::ActiveModel::from(&summary)
                    .update(db_tx)
                    .await?;
            }
            None => {
                let mut summary = DailySummary::empty(date);
                summary.apply(kind, amount_minor, method, debt_portion_minor);
                daily_summaries::ActiveModel::from(&summary)
                    .insert(db_tx)
                    .await?;
            }
        }

        Ok(())
    }

    /// Undoes a posting's effect on the summary row for `date`.
    ///
    /// The summary is an approximation layer over the transaction log, so a
    /// missing row is a no-op, not a failure.
    pub(crate) async fn reverse_from_summary(
        &self,
        db_tx: &DatabaseTransaction,
        kind: TransactionKind,
        amount_minor: i64,
        method: PaymentMethod,
        debt_portion_minor: i64,
        date: &str,
    ) -> ResultEngine<()> {
        let Some(model) = daily_summaries::Entity::find_by_id(date.to_string())
            .one(db_tx)
            .await?
        else {
            tracing::debug!(date, "summary reversal skipped: no row for date");
            return Ok(());
        };

        let mut summary = DailySummary::from(model);
        summary.reverse(kind, amount_minor, method, debt_portion_minor);
        daily_summaries::ActiveModel::from(&summary)
            .update(db_tx)
            .await?;

        Ok(())
    }

    /// Returns the summary row for a date (`YYYY-MM-DD`), if any postings
    /// have landed on it.
    pub async fn daily_summary(&self, date: &str) -> ResultEngine<Option<DailySummary>> {
        let model = daily_summaries::Entity::find_by_id(date.to_string())
            .one(&self.database)
            .await?;
        Ok(model.map(DailySummary::from))
    }
}

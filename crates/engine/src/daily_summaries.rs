//! Per-date aggregate rollup of ledger activity.
//!
//! One row per calendar date, created lazily on the first posting of that
//! date and updated incrementally afterwards. The row is an approximation
//! layer over the transaction log, never the source of truth.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{PaymentMethod, TransactionKind};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
    /// Posting date, `YYYY-MM-DD` in UTC.
    pub date: String,
    /// Full invoice value of sales (cash portion plus credit portion).
    pub total_sales_minor: i64,
    pub cash_sales_minor: i64,
    pub mobile_sales_minor: i64,
    pub other_sales_minor: i64,
    pub total_expenses_minor: i64,
    pub total_purchases_minor: i64,
    pub total_transportation_minor: i64,
    pub debt_collected_minor: i64,
    pub debt_created_minor: i64,
    /// `total_sales - (expenses + purchases + transportation)`, recomputed
    /// after every mutation.
    pub profit_minor: i64,
    pub transaction_count: i64,
    pub customer_count: i64,
}

impl DailySummary {
    pub fn empty(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            total_sales_minor: 0,
            cash_sales_minor: 0,
            mobile_sales_minor: 0,
            other_sales_minor: 0,
            total_expenses_minor: 0,
            total_purchases_minor: 0,
            total_transportation_minor: 0,
            debt_collected_minor: 0,
            debt_created_minor: 0,
            profit_minor: 0,
            transaction_count: 0,
            customer_count: 0,
        }
    }

    /// Roll a posting into this row.
    pub(crate) fn apply(
        &mut self,
        kind: TransactionKind,
        amount_minor: i64,
        method: PaymentMethod,
        debt_portion_minor: i64,
    ) {
        self.apply_signed(kind, amount_minor, method, debt_portion_minor, 1);
    }

    /// Exact mirror of [`apply`](Self::apply), used when a posting is
    /// reversed.
    pub(crate) fn reverse(
        &mut self,
        kind: TransactionKind,
        amount_minor: i64,
        method: PaymentMethod,
        debt_portion_minor: i64,
    ) {
        self.apply_signed(kind, amount_minor, method, debt_portion_minor, -1);
    }

    fn apply_signed(
        &mut self,
        kind: TransactionKind,
        amount_minor: i64,
        method: PaymentMethod,
        debt_portion_minor: i64,
        sign: i64,
    ) {
        match kind {
            // A sale posting carries the cash-equivalent portion as `amount`
            // and the credit portion as `debt_portion`; the per-method bucket
            // only tracks what was actually collected.
            TransactionKind::Sale | TransactionKind::WalpoCreated => {
                self.total_sales_minor += sign * (amount_minor + debt_portion_minor);
                *self.method_bucket_mut(method) += sign * amount_minor;
                self.transaction_count += sign;
                self.customer_count += sign;
                if debt_portion_minor > 0 {
                    self.debt_created_minor += sign * debt_portion_minor;
                }
            }
            TransactionKind::Expense => self.total_expenses_minor += sign * amount_minor,
            TransactionKind::Purchase => self.total_purchases_minor += sign * amount_minor,
            TransactionKind::Transportation => {
                self.total_transportation_minor += sign * amount_minor;
            }
            TransactionKind::DebtCollection => self.debt_collected_minor += sign * amount_minor,
            // Plain income moves the ledger balance but has no rollup bucket.
            TransactionKind::Income => {}
        }

        self.recompute_profit();
    }

    fn method_bucket_mut(&mut self, method: PaymentMethod) -> &mut i64 {
        match method {
            PaymentMethod::Cash => &mut self.cash_sales_minor,
            PaymentMethod::MobileMoney => &mut self.mobile_sales_minor,
            PaymentMethod::Other => &mut self.other_sales_minor,
        }
    }

    fn recompute_profit(&mut self) {
        self.profit_minor = self.total_sales_minor
            - (self.total_expenses_minor
                + self.total_purchases_minor
                + self.total_transportation_minor);
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "daily_summaries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub date: String,
    pub total_sales_minor: i64,
    pub cash_sales_minor: i64,
    pub mobile_sales_minor: i64,
    pub other_sales_minor: i64,
    pub total_expenses_minor: i64,
    pub total_purchases_minor: i64,
    pub total_transportation_minor: i64,
    pub debt_collected_minor: i64,
    pub debt_created_minor: i64,
    pub profit_minor: i64,
    pub transaction_count: i64,
    pub customer_count: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for DailySummary {
    fn from(model: Model) -> Self {
        Self {
            date: model.date,
            total_sales_minor: model.total_sales_minor,
            cash_sales_minor: model.cash_sales_minor,
            mobile_sales_minor: model.mobile_sales_minor,
            other_sales_minor: model.other_sales_minor,
            total_expenses_minor: model.total_expenses_minor,
            total_purchases_minor: model.total_purchases_minor,
            total_transportation_minor: model.total_transportation_minor,
            debt_collected_minor: model.debt_collected_minor,
            debt_created_minor: model.debt_created_minor,
            profit_minor: model.profit_minor,
            transaction_count: model.transaction_count,
            customer_count: model.customer_count,
        }
    }
}

impl From<&DailySummary> for ActiveModel {
    fn from(summary: &DailySummary) -> Self {
        Self {
            date: ActiveValue::Set(summary.date.clone()),
            total_sales_minor: ActiveValue::Set(summary.total_sales_minor),
            cash_sales_minor: ActiveValue::Set(summary.cash_sales_minor),
            mobile_sales_minor: ActiveValue::Set(summary.mobile_sales_minor),
            other_sales_minor: ActiveValue::Set(summary.other_sales_minor),
            total_expenses_minor: ActiveValue::Set(summary.total_expenses_minor),
            total_purchases_minor: ActiveValue::Set(summary.total_purchases_minor),
            total_transportation_minor: ActiveValue::Set(summary.total_transportation_minor),
            debt_collected_minor: ActiveValue::Set(summary.debt_collected_minor),
            debt_created_minor: ActiveValue::Set(summary.debt_created_minor),
            profit_minor: ActiveValue::Set(summary.profit_minor),
            transaction_count: ActiveValue::Set(summary.transaction_count),
            customer_count: ActiveValue::Set(summary.customer_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profit_holds(summary: &DailySummary) -> bool {
        summary.profit_minor
            == summary.total_sales_minor
                - (summary.total_expenses_minor
                    + summary.total_purchases_minor
                    + summary.total_transportation_minor)
    }

    #[test]
    fn sale_fills_method_bucket_and_counts() {
        let mut summary = DailySummary::empty("2026-08-01");
        summary.apply(TransactionKind::Sale, 100, PaymentMethod::Cash, 0);

        assert_eq!(summary.total_sales_minor, 100);
        assert_eq!(summary.cash_sales_minor, 100);
        assert_eq!(summary.transaction_count, 1);
        assert_eq!(summary.customer_count, 1);
        assert_eq!(summary.debt_created_minor, 0);
        assert!(profit_holds(&summary));
    }

    #[test]
    fn partly_cash_sale_splits_invoice_and_bucket() {
        let mut summary = DailySummary::empty("2026-08-01");
        summary.apply(TransactionKind::Sale, 30, PaymentMethod::MobileMoney, 70);

        assert_eq!(summary.total_sales_minor, 100);
        assert_eq!(summary.mobile_sales_minor, 30);
        assert_eq!(summary.debt_created_minor, 70);
        assert!(profit_holds(&summary));
    }

    #[test]
    fn profit_recomputed_after_every_mutation() {
        let mut summary = DailySummary::empty("2026-08-01");
        summary.apply(TransactionKind::Sale, 500, PaymentMethod::Cash, 0);
        summary.apply(TransactionKind::Expense, 120, PaymentMethod::Cash, 0);
        summary.apply(TransactionKind::Purchase, 200, PaymentMethod::Cash, 0);
        summary.apply(TransactionKind::Transportation, 30, PaymentMethod::Cash, 0);
        assert_eq!(summary.profit_minor, 150);

        summary.reverse(TransactionKind::Purchase, 200, PaymentMethod::Cash, 0);
        assert_eq!(summary.total_purchases_minor, 0);
        assert_eq!(summary.profit_minor, 350);
        assert!(profit_holds(&summary));
    }

    #[test]
    fn income_only_moves_the_ledger() {
        let mut summary = DailySummary::empty("2026-08-01");
        summary.apply(TransactionKind::Income, 900, PaymentMethod::Cash, 0);
        assert_eq!(summary, DailySummary::empty("2026-08-01"));
    }
}

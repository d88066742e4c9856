//! Ledger write path: appending postings and reversing them.
//!
//! The ledger is append-only. A "removed" posting is never deleted: the
//! original row is stamped `reversed_at`/`reversed_by` and a compensating
//! entry (debit and credit swapped) is appended at removal time, so the
//! running balance stays continuous and history stays auditable. Earlier
//! rows are never renumbered.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use serde_json::json;

use crate::util::day_key;
use crate::{
    transactions, EngineError, PaymentMethod, PostTransactionCmd, ReferenceKind, ResultEngine,
    Transaction, TransactionKind,
};

use super::{with_tx, Engine};

/// Fully resolved row to append; `post_transaction` builds one from a
/// command, reversal builds one from the entry being negated.
pub(crate) struct EntrySpec {
    pub(crate) kind: TransactionKind,
    pub(crate) debit_minor: i64,
    pub(crate) credit_minor: i64,
    pub(crate) payment_method: PaymentMethod,
    pub(crate) debt_portion_minor: i64,
    pub(crate) reference_id: Option<Uuid>,
    pub(crate) reference_kind: Option<ReferenceKind>,
    pub(crate) note: Option<String>,
    pub(crate) created_by: String,
    pub(crate) occurred_at: DateTime<Utc>,
    pub(crate) reversal_of: Option<Uuid>,
}

impl Engine {
    /// Appends one transaction to the ledger and rolls it into the day's
    /// summary, as a single atomic unit.
    ///
    /// Money-in kinds post as a credit, everything else as a debit, and the
    /// new row carries `previous balance + credit - debit`. The audit entry
    /// is written after the commit and is best-effort.
    pub async fn post_transaction(&self, cmd: PostTransactionCmd) -> ResultEngine<Transaction> {
        validate_posting(&cmd)?;

        let _posting = self.posting_lock.lock().await;
        let posted: Transaction = with_tx!(self, |db_tx| {
            let (debit_minor, credit_minor) = if cmd.kind.is_credit() {
                (0, cmd.amount_minor)
            } else {
                (cmd.amount_minor, 0)
            };

            let tx = self
                .append_entry(
                    &db_tx,
                    EntrySpec {
                        kind: cmd.kind,
                        debit_minor,
                        credit_minor,
                        payment_method: cmd.payment_method,
                        debt_portion_minor: cmd.debt_portion_minor,
                        reference_id: cmd.reference_id,
                        reference_kind: cmd.reference_kind,
                        note: cmd.note.clone(),
                        created_by: cmd.created_by.clone(),
                        occurred_at: cmd.occurred_at,
                        reversal_of: None,
                    },
                )
                .await?;

            self.apply_to_summary(
                &db_tx,
                cmd.kind,
                cmd.amount_minor,
                cmd.payment_method,
                cmd.debt_portion_minor,
                &day_key(cmd.occurred_at),
            )
            .await?;

            Ok(tx)
        })?;

        self.record_audit(
            &posted.created_by,
            "ledger.post",
            posted.reference_id.zip(posted.reference_kind),
            Some(posted.balance_minor),
            Some(json!({
                "kind": posted.kind.as_str(),
                "debit_minor": posted.debit_minor,
                "credit_minor": posted.credit_minor,
            })),
            posted.occurred_at,
        )
        .await;

        Ok(posted)
    }

    /// Reverses every live transaction recorded for a reference.
    ///
    /// Each match is stamped as reversed and negated by a compensating entry
    /// dated `occurred_at`; the summary for that date is decremented. Returns
    /// the compensating entries.
    pub async fn reverse_transactions(
        &self,
        reference_id: Uuid,
        reference_kind: ReferenceKind,
        reversed_by: &str,
        occurred_at: DateTime<Utc>,
    ) -> ResultEngine<Vec<Transaction>> {
        let _posting = self.posting_lock.lock().await;
        let reversals: Vec<Transaction> = with_tx!(self, |db_tx| {
            self.reverse_reference_in_tx(&db_tx, reference_id, reference_kind, reversed_by, occurred_at)
                .await
        })?;

        if let Some(last) = reversals.last() {
            self.record_audit(
                reversed_by,
                "ledger.reverse",
                Some((reference_id, reference_kind)),
                Some(last.balance_minor),
                Some(json!({ "reversed": reversals.len() })),
                occurred_at,
            )
            .await;
        }

        Ok(reversals)
    }

    /// Appends a row continuing the running-balance chain.
    ///
    /// Callers must hold `posting_lock` and run inside a transaction.
    pub(crate) async fn append_entry(
        &self,
        db_tx: &DatabaseTransaction,
        spec: EntrySpec,
    ) -> ResultEngine<Transaction> {
        let opening_minor = transactions::Entity::find()
            .order_by_desc(transactions::Column::Seq)
            .one(db_tx)
            .await?
            .map(|model| model.balance_minor)
            .unwrap_or(0);

        let tx = Transaction {
            seq: 0, // assigned by the store on insert
            id: Uuid::new_v4(),
            kind: spec.kind,
            occurred_at: spec.occurred_at,
            debit_minor: spec.debit_minor,
            credit_minor: spec.credit_minor,
            balance_minor: opening_minor + spec.credit_minor - spec.debit_minor,
            payment_method: spec.payment_method,
            debt_portion_minor: spec.debt_portion_minor,
            reference_id: spec.reference_id,
            reference_kind: spec.reference_kind,
            note: spec.note,
            created_by: spec.created_by,
            reversed_at: None,
            reversed_by: None,
            reversal_of: spec.reversal_of,
        };

        let model = transactions::ActiveModel::from(&tx).insert(db_tx).await?;
        Transaction::try_from(model)
    }

    pub(crate) async fn reverse_reference_in_tx(
        &self,
        db_tx: &DatabaseTransaction,
        reference_id: Uuid,
        reference_kind: ReferenceKind,
        reversed_by: &str,
        occurred_at: DateTime<Utc>,
    ) -> ResultEngine<Vec<Transaction>> {
        let models = transactions::Entity::find()
            .filter(transactions::Column::ReferenceKind.eq(reference_kind.as_str()))
            .filter(transactions::Column::ReferenceId.eq(reference_id.to_string()))
            .filter(transactions::Column::ReversedAt.is_null())
            .filter(transactions::Column::ReversalOf.is_null())
            .order_by_asc(transactions::Column::Seq)
            .all(db_tx)
            .await?;

        let mut reversals = Vec::with_capacity(models.len());
        for model in models {
            let original = Transaction::try_from(model)?;

            let stamp = transactions::ActiveModel {
                seq: ActiveValue::Set(original.seq),
                reversed_at: ActiveValue::Set(Some(occurred_at)),
                reversed_by: ActiveValue::Set(Some(reversed_by.to_string())),
                ..Default::default()
            };
            stamp.update(db_tx).await?;

            let entry = self
                .append_entry(
                    db_tx,
                    EntrySpec {
                        kind: original.kind,
                        debit_minor: original.credit_minor,
                        credit_minor: original.debit_minor,
                        payment_method: original.payment_method,
                        debt_portion_minor: original.debt_portion_minor,
                        reference_id: original.reference_id,
                        reference_kind: original.reference_kind,
                        note: Some(format!("reversal of {}", original.id)),
                        created_by: reversed_by.to_string(),
                        occurred_at,
                        reversal_of: Some(original.id),
                    },
                )
                .await?;

            self.reverse_from_summary(
                db_tx,
                original.kind,
                original.debit_minor + original.credit_minor,
                original.payment_method,
                original.debt_portion_minor,
                &day_key(occurred_at),
            )
            .await?;

            reversals.push(entry);
        }

        Ok(reversals)
    }
}

fn validate_posting(cmd: &PostTransactionCmd) -> ResultEngine<()> {
    if cmd.amount_minor < 0 {
        return Err(EngineError::Validation(
            "amount_minor must be >= 0".to_string(),
        ));
    }
    if cmd.debt_portion_minor < 0 {
        return Err(EngineError::Validation(
            "debt_portion_minor must be >= 0".to_string(),
        ));
    }
    if cmd.debt_portion_minor > 0 && !cmd.kind.is_sale() {
        return Err(EngineError::Validation(
            "debt_portion only applies to sale postings".to_string(),
        ));
    }
    if cmd.amount_minor == 0 && cmd.debt_portion_minor == 0 {
        return Err(EngineError::Validation(
            "amount_minor must be > 0".to_string(),
        ));
    }
    Ok(())
}

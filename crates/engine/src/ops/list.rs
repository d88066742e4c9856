//! Ledger read side.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use sea_orm::{QueryFilter, QueryOrder, QuerySelect, Select, prelude::*};

use crate::{transactions, EngineError, ReferenceKind, ResultEngine, Transaction, TransactionKind};

use super::Engine;

/// Filters for listing transactions.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// If present, acts as an allow-list of kinds to return.
    pub kinds: Option<Vec<TransactionKind>>,
    /// If true, includes reversed entries and their compensating entries
    /// (default: false).
    pub include_reversed: bool,
}

fn validate_list_filter(filter: &TransactionListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to) {
        if from >= to {
            return Err(EngineError::Validation(
                "invalid range: from must be < to".to_string(),
            ));
        }
    }
    if filter.kinds.as_ref().is_some_and(|kinds| kinds.is_empty()) {
        return Err(EngineError::Validation(
            "kinds must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn apply_tx_filters(
    mut query: Select<transactions::Entity>,
    filter: &TransactionListFilter,
) -> Select<transactions::Entity> {
    if let Some(from) = filter.from {
        query = query.filter(transactions::Column::OccurredAt.gte(from));
    }
    if let Some(to) = filter.to {
        query = query.filter(transactions::Column::OccurredAt.lt(to));
    }
    if !filter.include_reversed {
        query = query
            .filter(transactions::Column::ReversedAt.is_null())
            .filter(transactions::Column::ReversalOf.is_null());
    }
    if let Some(kinds) = &filter.kinds {
        let kinds: Vec<String> = kinds.iter().map(|kind| kind.as_str().to_string()).collect();
        query = query.filter(transactions::Column::Kind.is_in(kinds));
    }

    query
}

impl Engine {
    /// Lists recent transactions, newest first by insertion order.
    pub async fn list_transactions(
        &self,
        limit: u64,
        filter: &TransactionListFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        validate_list_filter(filter)?;

        let query = apply_tx_filters(transactions::Entity::find(), filter)
            .order_by_desc(transactions::Column::Seq)
            .limit(limit);

        let models = query.all(&self.database).await?;
        models.into_iter().map(Transaction::try_from).collect()
    }

    pub async fn transaction_by_id(&self, transaction_id: Uuid) -> ResultEngine<Transaction> {
        let model = transactions::Entity::find()
            .filter(transactions::Column::Id.eq(transaction_id.to_string()))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound("transaction".to_string()))?;
        Transaction::try_from(model)
    }

    /// Every ledger row recorded for a reference, oldest first, including
    /// reversed and compensating entries.
    pub async fn transactions_for_reference(
        &self,
        reference_id: Uuid,
        reference_kind: ReferenceKind,
    ) -> ResultEngine<Vec<Transaction>> {
        let models = transactions::Entity::find()
            .filter(transactions::Column::ReferenceKind.eq(reference_kind.as_str()))
            .filter(transactions::Column::ReferenceId.eq(reference_id.to_string()))
            .order_by_asc(transactions::Column::Seq)
            .all(&self.database)
            .await?;
        models.into_iter().map(Transaction::try_from).collect()
    }
}

//! Sale recording, deferred collection and cancellation.
//!
//! A sale commits as one unit: header, line items, stock movement, the
//! ledger posting and (when paid short) the bound debt. Deferred "walpo"
//! orders invoice in full up front but release inventory only as goods are
//! actually collected.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use serde_json::json;

use crate::util::day_key;
use crate::{
    debts, products, sale_items, sales, Debt, DebtStatus, EngineError, Product, ReferenceKind,
    ResultEngine, Sale, SaleCmd, SaleItem, SalePaymentStatus, TransactionKind,
};

use super::ledger::EntrySpec;
use super::{with_tx, Engine};

impl Engine {
    /// Records a sale as a single atomic unit.
    ///
    /// Ordinary sales hand the goods over immediately: stock drops by the
    /// full quantity and `taken_quantity` starts equal to `quantity`.
    /// Deferred orders leave stock untouched until collection. When the
    /// amount paid is short of the total, the remainder becomes a debt bound
    /// to this sale, in the same transaction.
    pub async fn record_sale(&self, cmd: SaleCmd) -> ResultEngine<Sale> {
        validate_sale(&cmd)?;

        let _posting = self.posting_lock.lock().await;
        let sale: Sale = with_tx!(self, |db_tx| {
            let mut subtotal_minor = 0i64;
            let mut lines: Vec<(products::Model, SaleItem)> = Vec::with_capacity(cmd.items.len());
            let sale_id = Uuid::new_v4();

            for item in &cmd.items {
                let product_model = products::Entity::find_by_id(item.product_id.to_string())
                    .one(&db_tx)
                    .await?
                    .ok_or_else(|| EngineError::NotFound("product".to_string()))?;

                let unit_price_minor = item
                    .unit_price_minor
                    .unwrap_or(product_model.unit_price_minor);
                subtotal_minor += unit_price_minor * item.quantity;

                let line = SaleItem {
                    id: Uuid::new_v4(),
                    sale_id,
                    product_id: item.product_id,
                    quantity: item.quantity,
                    taken_quantity: if cmd.is_deferred { 0 } else { item.quantity },
                    unit_price_minor,
                    unit_cost_minor: product_model.unit_cost_minor,
                };
                lines.push((product_model, line));
            }

            let total_minor = subtotal_minor - cmd.discount_minor + cmd.tax_minor;
            if total_minor <= 0 {
                return Err(EngineError::Validation(
                    "sale total must be > 0".to_string(),
                ));
            }
            if cmd.amount_paid_minor > total_minor {
                return Err(EngineError::Validation(
                    "amount paid exceeds sale total".to_string(),
                ));
            }

            let debt_portion_minor = total_minor - cmd.amount_paid_minor;
            let customer_id = cmd.customer_id;
            if debt_portion_minor > 0 && customer_id.is_none() {
                return Err(EngineError::Validation(
                    "credit sale requires a customer".to_string(),
                ));
            }

            let payment_status = if debt_portion_minor == 0 {
                SalePaymentStatus::Paid
            } else if cmd.amount_paid_minor > 0 {
                SalePaymentStatus::Partial
            } else {
                SalePaymentStatus::Credit
            };

            let sale = Sale {
                id: sale_id,
                customer_id,
                subtotal_minor,
                discount_minor: cmd.discount_minor,
                tax_minor: cmd.tax_minor,
                total_minor,
                amount_paid_minor: cmd.amount_paid_minor,
                balance_due_minor: debt_portion_minor,
                payment_status,
                is_deferred: cmd.is_deferred,
                occurred_at: cmd.occurred_at,
                created_by: cmd.created_by.clone(),
                cancelled_at: None,
                cancelled_by: None,
            };
            sales::ActiveModel::from(&sale).insert(&db_tx).await?;

            for (_, line) in &lines {
                sale_items::ActiveModel::from(line).insert(&db_tx).await?;
            }

            // Goods leave inventory now for ordinary sales, at collection
            // time for deferred ones. Quantities are summed per product so a
            // product appearing on two lines is decremented once.
            if !cmd.is_deferred {
                let mut stock_taken: HashMap<Uuid, i64> = HashMap::new();
                for (_, line) in &lines {
                    *stock_taken.entry(line.product_id).or_insert(0) += line.quantity;
                }
                for (product_model, line) in &lines {
                    let Some(taken) = stock_taken.remove(&line.product_id) else {
                        continue;
                    };
                    if product_model.stock_quantity < taken {
                        return Err(EngineError::Validation(format!(
                            "insufficient stock for \"{}\"",
                            product_model.name
                        )));
                    }
                    let product_update = products::ActiveModel {
                        id: ActiveValue::Set(product_model.id.clone()),
                        stock_quantity: ActiveValue::Set(product_model.stock_quantity - taken),
                        ..Default::default()
                    };
                    product_update.update(&db_tx).await?;
                }
            }

            let kind = if cmd.is_deferred {
                TransactionKind::WalpoCreated
            } else {
                TransactionKind::Sale
            };
            self.append_entry(
                &db_tx,
                EntrySpec {
                    kind,
                    debit_minor: 0,
                    credit_minor: cmd.amount_paid_minor,
                    payment_method: cmd.payment_method,
                    debt_portion_minor,
                    reference_id: Some(sale_id),
                    reference_kind: Some(ReferenceKind::Sale),
                    note: cmd.note.clone(),
                    created_by: cmd.created_by.clone(),
                    occurred_at: cmd.occurred_at,
                    reversal_of: None,
                },
            )
            .await?;
            self.apply_to_summary(
                &db_tx,
                kind,
                cmd.amount_paid_minor,
                cmd.payment_method,
                debt_portion_minor,
                &day_key(cmd.occurred_at),
            )
            .await?;

            if debt_portion_minor > 0 {
                // customer_id checked above
                let customer_id = customer_id
                    .ok_or_else(|| EngineError::NotFound("customer".to_string()))?;
                self.originate_debt_in_tx(
                    &db_tx,
                    sale_id,
                    customer_id,
                    debt_portion_minor,
                    cmd.due_in_days,
                    cmd.occurred_at,
                )
                .await?;
            }

            Ok(sale)
        })?;

        self.record_audit(
            &sale.created_by,
            "sale.record",
            Some((sale.id, ReferenceKind::Sale)),
            None,
            Some(json!({
                "total_minor": sale.total_minor,
                "amount_paid_minor": sale.amount_paid_minor,
                "deferred": sale.is_deferred,
            })),
            sale.occurred_at,
        )
        .await;

        Ok(sale)
    }

    /// Records that goods for a deferred line item have been collected up to
    /// `new_taken_quantity`, releasing that much stock.
    ///
    /// Collection is monotonic: the taken quantity can never exceed the
    /// ordered quantity and never decreases. No ledger entry is written; the
    /// money was recorded in full at order origination.
    pub async fn update_taken_quantity(
        &self,
        sale_item_id: Uuid,
        new_taken_quantity: i64,
    ) -> ResultEngine<SaleItem> {
        with_tx!(self, |db_tx| {
            let item_model = sale_items::Entity::find_by_id(sale_item_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("sale item".to_string()))?;
            let mut item = SaleItem::try_from(item_model)?;

            let sale_model = sales::Entity::find_by_id(item.sale_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("sale".to_string()))?;
            if !sale_model.is_deferred {
                return Err(EngineError::Validation(
                    "sale is not deferred".to_string(),
                ));
            }
            if sale_model.cancelled_at.is_some() {
                return Err(EngineError::Validation("sale is cancelled".to_string()));
            }

            if new_taken_quantity > item.quantity {
                return Err(EngineError::Validation(
                    "taken quantity exceeds ordered quantity".to_string(),
                ));
            }
            let delta = new_taken_quantity - item.taken_quantity;
            if delta < 0 {
                return Err(EngineError::Validation(
                    "taken quantity cannot decrease".to_string(),
                ));
            }
            if delta == 0 {
                return Ok(item);
            }

            let product_model = products::Entity::find_by_id(item.product_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("product".to_string()))?;
            if product_model.stock_quantity < delta {
                return Err(EngineError::Validation(format!(
                    "insufficient stock for \"{}\"",
                    product_model.name
                )));
            }
            let product_update = products::ActiveModel {
                id: ActiveValue::Set(product_model.id),
                stock_quantity: ActiveValue::Set(product_model.stock_quantity - delta),
                ..Default::default()
            };
            product_update.update(&db_tx).await?;

            let item_update = sale_items::ActiveModel {
                id: ActiveValue::Set(item.id.to_string()),
                taken_quantity: ActiveValue::Set(new_taken_quantity),
                ..Default::default()
            };
            item_update.update(&db_tx).await?;

            item.taken_quantity = new_taken_quantity;
            Ok(item)
        })
    }

    /// Cancels a sale: reverses its ledger postings, returns the goods that
    /// actually left inventory, settles any open bound debt and marks the
    /// header cancelled.
    ///
    /// The ledger only undoes its own bookkeeping; the stock, debt and
    /// customer compensations belong to this deleting workflow.
    pub async fn cancel_sale(
        &self,
        sale_id: Uuid,
        actor: &str,
        occurred_at: DateTime<Utc>,
    ) -> ResultEngine<()> {
        let _posting = self.posting_lock.lock().await;
        with_tx!(self, |db_tx| {
            let sale_model = sales::Entity::find_by_id(sale_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("sale".to_string()))?;
            if sale_model.cancelled_at.is_some() {
                return Err(EngineError::Validation(
                    "sale already cancelled".to_string(),
                ));
            }

            self.reverse_reference_in_tx(&db_tx, sale_id, ReferenceKind::Sale, actor, occurred_at)
                .await?;

            // Put back what actually left the shelf.
            let item_models = sale_items::Entity::find()
                .filter(sale_items::Column::SaleId.eq(sale_id.to_string()))
                .all(&db_tx)
                .await?;
            for item_model in item_models {
                let item = SaleItem::try_from(item_model)?;
                let restore = if sale_model.is_deferred {
                    item.taken_quantity
                } else {
                    item.quantity
                };
                if restore == 0 {
                    continue;
                }
                let product_model = products::Entity::find_by_id(item.product_id.to_string())
                    .one(&db_tx)
                    .await?
                    .ok_or_else(|| EngineError::NotFound("product".to_string()))?;
                let product_update = products::ActiveModel {
                    id: ActiveValue::Set(product_model.id),
                    stock_quantity: ActiveValue::Set(product_model.stock_quantity + restore),
                    ..Default::default()
                };
                product_update.update(&db_tx).await?;
            }

            // An open bound debt is forgiven: the customer no longer owes the
            // remainder, but the debt row keeps it on record.
            let debt_model = debts::Entity::find()
                .filter(debts::Column::SaleId.eq(sale_id.to_string()))
                .one(&db_tx)
                .await?;
            if let Some(debt_model) = debt_model {
                let debt = Debt::try_from(debt_model)?;
                if debt.status.is_open() {
                    self.add_to_customer_balance(&db_tx, debt.customer_id, -debt.remaining_minor)
                        .await?;
                    let debt_update = debts::ActiveModel {
                        id: ActiveValue::Set(debt.id.to_string()),
                        status: ActiveValue::Set(DebtStatus::WrittenOff.as_str().to_string()),
                        ..Default::default()
                    };
                    debt_update.update(&db_tx).await?;
                }
            }

            let sale_update = sales::ActiveModel {
                id: ActiveValue::Set(sale_model.id),
                payment_status: ActiveValue::Set(SalePaymentStatus::Cancelled.as_str().to_string()),
                cancelled_at: ActiveValue::Set(Some(occurred_at)),
                cancelled_by: ActiveValue::Set(Some(actor.to_string())),
                ..Default::default()
            };
            sale_update.update(&db_tx).await?;

            Ok(())
        })?;

        self.record_audit(
            actor,
            "sale.cancel",
            Some((sale_id, ReferenceKind::Sale)),
            None,
            None,
            occurred_at,
        )
        .await;

        Ok(())
    }

    pub async fn sale_by_id(&self, sale_id: Uuid) -> ResultEngine<Sale> {
        let model = sales::Entity::find_by_id(sale_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound("sale".to_string()))?;
        Sale::try_from(model)
    }

    pub async fn sale_items(&self, sale_id: Uuid) -> ResultEngine<Vec<SaleItem>> {
        let models = sale_items::Entity::find()
            .filter(sale_items::Column::SaleId.eq(sale_id.to_string()))
            .order_by_asc(sale_items::Column::Id)
            .all(&self.database)
            .await?;
        models.into_iter().map(SaleItem::try_from).collect()
    }

    pub async fn product_by_id(&self, product_id: Uuid) -> ResultEngine<Product> {
        let model = products::Entity::find_by_id(product_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound("product".to_string()))?;
        Product::try_from(model)
    }
}

fn validate_sale(cmd: &SaleCmd) -> ResultEngine<()> {
    if cmd.items.is_empty() {
        return Err(EngineError::Validation(
            "sale must have at least one item".to_string(),
        ));
    }
    for item in &cmd.items {
        if item.quantity <= 0 {
            return Err(EngineError::Validation(
                "item quantity must be > 0".to_string(),
            ));
        }
        if item.unit_price_minor.is_some_and(|price| price < 0) {
            return Err(EngineError::Validation(
                "unit price must be >= 0".to_string(),
            ));
        }
    }
    if cmd.discount_minor < 0 || cmd.tax_minor < 0 {
        return Err(EngineError::Validation(
            "discount and tax must be >= 0".to_string(),
        ));
    }
    if cmd.amount_paid_minor < 0 {
        return Err(EngineError::Validation(
            "amount paid must be >= 0".to_string(),
        ));
    }
    Ok(())
}

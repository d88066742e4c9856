//! Initial schema migration - creates all tables from scratch.
//!
//! It creates the complete schema for the store ledger core:
//!
//! - `customers`: buyers with a cached open-debt balance
//! - `products`: sellable items with stock on hand
//! - `sales`: sale headers (cash, credit and deferred "walpo" orders)
//! - `sale_items`: line items with ordered vs. taken quantities
//! - `debts`: one open obligation per credit sale
//! - `debt_payments`: settlements applied against a debt
//! - `transactions`: the append-only ledger with a running balance
//! - `daily_summaries`: one aggregate rollup row per posting date
//! - `audit_log`: best-effort audit trail

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Customers {
    Table,
    Id,
    Name,
    Phone,
    CurrentBalanceMinor,
}

#[derive(Iden)]
enum Products {
    Table,
    Id,
    Name,
    UnitPriceMinor,
    UnitCostMinor,
    StockQuantity,
}

#[derive(Iden)]
enum Sales {
    Table,
    Id,
    CustomerId,
    SubtotalMinor,
    DiscountMinor,
    TaxMinor,
    TotalMinor,
    AmountPaidMinor,
    BalanceDueMinor,
    PaymentStatus,
    IsDeferred,
    OccurredAt,
    CreatedBy,
    CancelledAt,
    CancelledBy,
}

#[derive(Iden)]
enum SaleItems {
    Table,
    Id,
    SaleId,
    ProductId,
    Quantity,
    TakenQuantity,
    UnitPriceMinor,
    UnitCostMinor,
}

#[derive(Iden)]
enum Debts {
    Table,
    Id,
    SaleId,
    CustomerId,
    OriginalMinor,
    RemainingMinor,
    DueDate,
    Status,
    CreatedAt,
}

#[derive(Iden)]
enum DebtPayments {
    Table,
    Id,
    DebtId,
    AmountMinor,
    Method,
    ReceivedBy,
    Note,
    PaidAt,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Seq,
    Id,
    Kind,
    OccurredAt,
    DebitMinor,
    CreditMinor,
    BalanceMinor,
    PaymentMethod,
    DebtPortionMinor,
    ReferenceId,
    ReferenceKind,
    Note,
    CreatedBy,
    ReversedAt,
    ReversedBy,
    ReversalOf,
}

#[derive(Iden)]
enum DailySummaries {
    Table,
    Date,
    TotalSalesMinor,
    CashSalesMinor,
    MobileSalesMinor,
    OtherSalesMinor,
    TotalExpensesMinor,
    TotalPurchasesMinor,
    TotalTransportationMinor,
    DebtCollectedMinor,
    DebtCreatedMinor,
    ProfitMinor,
    TransactionCount,
    CustomerCount,
}

#[derive(Iden)]
enum AuditLog {
    Table,
    Id,
    Actor,
    Action,
    ReferenceId,
    ReferenceKind,
    BalanceMinor,
    Detail,
    RecordedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Customers
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Customers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Customers::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Customers::Name).string().not_null())
                    .col(ColumnDef::new(Customers::Phone).string())
                    .col(
                        ColumnDef::new(Customers::CurrentBalanceMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Products
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Products::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Products::Name).string().not_null())
                    .col(
                        ColumnDef::new(Products::UnitPriceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Products::UnitCostMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Products::StockQuantity)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Sales
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Sales::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Sales::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Sales::CustomerId).string())
                    .col(ColumnDef::new(Sales::SubtotalMinor).big_integer().not_null())
                    .col(ColumnDef::new(Sales::DiscountMinor).big_integer().not_null())
                    .col(ColumnDef::new(Sales::TaxMinor).big_integer().not_null())
                    .col(ColumnDef::new(Sales::TotalMinor).big_integer().not_null())
                    .col(
                        ColumnDef::new(Sales::AmountPaidMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Sales::BalanceDueMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Sales::PaymentStatus).string().not_null())
                    .col(ColumnDef::new(Sales::IsDeferred).boolean().not_null())
                    .col(ColumnDef::new(Sales::OccurredAt).timestamp().not_null())
                    .col(ColumnDef::new(Sales::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Sales::CancelledAt).timestamp())
                    .col(ColumnDef::new(Sales::CancelledBy).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sales-customer_id")
                            .from(Sales::Table, Sales::CustomerId)
                            .to(Customers::Table, Customers::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Sale items
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(SaleItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SaleItems::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SaleItems::SaleId).string().not_null())
                    .col(ColumnDef::new(SaleItems::ProductId).string().not_null())
                    .col(ColumnDef::new(SaleItems::Quantity).big_integer().not_null())
                    .col(
                        ColumnDef::new(SaleItems::TakenQuantity)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SaleItems::UnitPriceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SaleItems::UnitCostMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sale_items-sale_id")
                            .from(SaleItems::Table, SaleItems::SaleId)
                            .to(Sales::Table, Sales::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sale_items-product_id")
                            .from(SaleItems::Table, SaleItems::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Debts (at most one per sale)
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Debts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Debts::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Debts::SaleId).string().not_null())
                    .col(ColumnDef::new(Debts::CustomerId).string().not_null())
                    .col(ColumnDef::new(Debts::OriginalMinor).big_integer().not_null())
                    .col(
                        ColumnDef::new(Debts::RemainingMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Debts::DueDate).timestamp().not_null())
                    .col(ColumnDef::new(Debts::Status).string().not_null())
                    .col(ColumnDef::new(Debts::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-debts-sale_id")
                            .from(Debts::Table, Debts::SaleId)
                            .to(Sales::Table, Sales::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-debts-customer_id")
                            .from(Debts::Table, Debts::CustomerId)
                            .to(Customers::Table, Customers::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-debts-sale_id-unique")
                    .table(Debts::Table)
                    .col(Debts::SaleId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Debt payments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(DebtPayments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DebtPayments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DebtPayments::DebtId).string().not_null())
                    .col(
                        ColumnDef::new(DebtPayments::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DebtPayments::Method).string().not_null())
                    .col(ColumnDef::new(DebtPayments::ReceivedBy).string().not_null())
                    .col(ColumnDef::new(DebtPayments::Note).string())
                    .col(ColumnDef::new(DebtPayments::PaidAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-debt_payments-debt_id")
                            .from(DebtPayments::Table, DebtPayments::DebtId)
                            .to(Debts::Table, Debts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Transactions (append-only ledger)
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Seq)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::Id).string().not_null())
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::OccurredAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::DebitMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::CreditMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::BalanceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::PaymentMethod).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::DebtPortionMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Transactions::ReferenceId).string())
                    .col(ColumnDef::new(Transactions::ReferenceKind).string())
                    .col(ColumnDef::new(Transactions::Note).string())
                    .col(ColumnDef::new(Transactions::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Transactions::ReversedAt).timestamp())
                    .col(ColumnDef::new(Transactions::ReversedBy).string())
                    .col(ColumnDef::new(Transactions::ReversalOf).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-id-unique")
                    .table(Transactions::Table)
                    .col(Transactions::Id)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-reference")
                    .table(Transactions::Table)
                    .col(Transactions::ReferenceKind)
                    .col(Transactions::ReferenceId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 8. Daily summaries
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(DailySummaries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DailySummaries::Date)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DailySummaries::TotalSalesMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DailySummaries::CashSalesMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DailySummaries::MobileSalesMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DailySummaries::OtherSalesMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DailySummaries::TotalExpensesMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DailySummaries::TotalPurchasesMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DailySummaries::TotalTransportationMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DailySummaries::DebtCollectedMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DailySummaries::DebtCreatedMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DailySummaries::ProfitMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DailySummaries::TransactionCount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DailySummaries::CustomerCount)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 9. Audit log
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(AuditLog::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuditLog::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuditLog::Actor).string().not_null())
                    .col(ColumnDef::new(AuditLog::Action).string().not_null())
                    .col(ColumnDef::new(AuditLog::ReferenceId).string())
                    .col(ColumnDef::new(AuditLog::ReferenceKind).string())
                    .col(ColumnDef::new(AuditLog::BalanceMinor).big_integer())
                    .col(ColumnDef::new(AuditLog::Detail).string())
                    .col(ColumnDef::new(AuditLog::RecordedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(AuditLog::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DailySummaries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DebtPayments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Debts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SaleItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sales::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Customers::Table).to_owned())
            .await?;
        Ok(())
    }
}

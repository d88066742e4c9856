//! Financial core for a small-retail point of sale.
//!
//! The engine owns the money-moving state: an append-only ledger with a
//! running balance, per-day aggregate summaries, customer debts with their
//! settlement lifecycle, and deferred ("walpo") order fulfillment. Catalog
//! and other plain CRUD live with the surrounding application; the engine
//! reads and updates that state only inside its own transactions.
//!
//! Every mutating operation runs inside a single database transaction, and
//! ledger postings additionally serialize through an internal lock so the
//! running balance can never fork under concurrent writers.

pub use audit_log::{AuditEntry, AuditOutcome};
pub use commands::{
    DebtPaymentCmd, OriginateDebtCmd, PostTransactionCmd, SaleCmd, SaleItemCmd,
};
pub use customers::Customer;
pub use daily_summaries::DailySummary;
pub use debt_payments::DebtPayment;
pub use debts::{Debt, DebtStatus};
pub use error::EngineError;
pub use ops::{Engine, EngineBuilder, TransactionListFilter};
pub use products::Product;
pub use sale_items::SaleItem;
pub use sales::{Sale, SalePaymentStatus};
pub use transactions::{PaymentMethod, ReferenceKind, Transaction, TransactionKind};

mod audit_log;
mod commands;
mod customers;
mod daily_summaries;
mod debt_payments;
mod debts;
mod error;
mod ops;
mod products;
mod sale_items;
mod sales;
mod transactions;
mod util;

type ResultEngine<T> = Result<T, EngineError>;

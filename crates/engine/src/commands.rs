//! Command structs for engine operations.
//!
//! These types group parameters for write operations (posting, sale
//! recording, debt origination/payment), keeping call sites readable and
//! avoiding long argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{PaymentMethod, ReferenceKind, TransactionKind};

/// Append one transaction to the ledger.
#[derive(Clone, Debug)]
pub struct PostTransactionCmd {
    pub kind: TransactionKind,
    /// Cash-equivalent amount of the posting.
    pub amount_minor: i64,
    pub payment_method: PaymentMethod,
    /// Credit portion created alongside a partly-cash sale posting.
    pub debt_portion_minor: i64,
    pub reference_id: Option<Uuid>,
    pub reference_kind: Option<ReferenceKind>,
    pub note: Option<String>,
    pub created_by: String,
    pub occurred_at: DateTime<Utc>,
}

impl PostTransactionCmd {
    #[must_use]
    pub fn new(
        kind: TransactionKind,
        amount_minor: i64,
        payment_method: PaymentMethod,
        created_by: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            amount_minor,
            payment_method,
            debt_portion_minor: 0,
            reference_id: None,
            reference_kind: None,
            note: None,
            created_by: created_by.into(),
            occurred_at,
        }
    }

    #[must_use]
    pub fn debt_portion(mut self, debt_portion_minor: i64) -> Self {
        self.debt_portion_minor = debt_portion_minor;
        self
    }

    #[must_use]
    pub fn reference(mut self, reference_id: Uuid, reference_kind: ReferenceKind) -> Self {
        self.reference_id = Some(reference_id);
        self.reference_kind = Some(reference_kind);
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// One line of a [`SaleCmd`].
#[derive(Clone, Debug)]
pub struct SaleItemCmd {
    pub product_id: Uuid,
    pub quantity: i64,
    /// Overrides the product's list price when set.
    pub unit_price_minor: Option<i64>,
}

impl SaleItemCmd {
    #[must_use]
    pub fn new(product_id: Uuid, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
            unit_price_minor: None,
        }
    }

    #[must_use]
    pub fn unit_price(mut self, unit_price_minor: i64) -> Self {
        self.unit_price_minor = Some(unit_price_minor);
        self
    }
}

/// Record a sale (header, items, stock, ledger posting and, when paid short,
/// the bound debt) as one atomic unit.
#[derive(Clone, Debug)]
pub struct SaleCmd {
    pub customer_id: Option<Uuid>,
    pub items: Vec<SaleItemCmd>,
    pub discount_minor: i64,
    pub tax_minor: i64,
    pub amount_paid_minor: i64,
    pub payment_method: PaymentMethod,
    /// Walpo-style order: invoiced now, goods collected over time.
    pub is_deferred: bool,
    /// Days until the bound debt (if any) falls due.
    pub due_in_days: i64,
    pub note: Option<String>,
    pub created_by: String,
    pub occurred_at: DateTime<Utc>,
}

impl SaleCmd {
    #[must_use]
    pub fn new(
        created_by: impl Into<String>,
        amount_paid_minor: i64,
        payment_method: PaymentMethod,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            customer_id: None,
            items: Vec::new(),
            discount_minor: 0,
            tax_minor: 0,
            amount_paid_minor,
            payment_method,
            is_deferred: false,
            due_in_days: 30,
            note: None,
            created_by: created_by.into(),
            occurred_at,
        }
    }

    #[must_use]
    pub fn customer(mut self, customer_id: Uuid) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    #[must_use]
    pub fn item(mut self, item: SaleItemCmd) -> Self {
        self.items.push(item);
        self
    }

    #[must_use]
    pub fn discount(mut self, discount_minor: i64) -> Self {
        self.discount_minor = discount_minor;
        self
    }

    #[must_use]
    pub fn tax(mut self, tax_minor: i64) -> Self {
        self.tax_minor = tax_minor;
        self
    }

    #[must_use]
    pub fn deferred(mut self) -> Self {
        self.is_deferred = true;
        self
    }

    #[must_use]
    pub fn due_in_days(mut self, due_in_days: i64) -> Self {
        self.due_in_days = due_in_days;
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Create a debt bound to a sale.
#[derive(Clone, Debug)]
pub struct OriginateDebtCmd {
    pub sale_id: Uuid,
    pub customer_id: Uuid,
    pub amount_minor: i64,
    pub due_in_days: i64,
    pub occurred_at: DateTime<Utc>,
}

impl OriginateDebtCmd {
    #[must_use]
    pub fn new(
        sale_id: Uuid,
        customer_id: Uuid,
        amount_minor: i64,
        due_in_days: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sale_id,
            customer_id,
            amount_minor,
            due_in_days,
            occurred_at,
        }
    }
}

/// Apply one settlement against a debt.
#[derive(Clone, Debug)]
pub struct DebtPaymentCmd {
    pub debt_id: Uuid,
    pub amount_minor: i64,
    pub method: PaymentMethod,
    pub received_by: String,
    pub note: Option<String>,
    pub paid_at: DateTime<Utc>,
}

impl DebtPaymentCmd {
    #[must_use]
    pub fn new(
        debt_id: Uuid,
        amount_minor: i64,
        method: PaymentMethod,
        received_by: impl Into<String>,
        paid_at: DateTime<Utc>,
    ) -> Self {
        Self {
            debt_id,
            amount_minor,
            method,
            received_by: received_by.into(),
            note: None,
            paid_at,
        }
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

use chrono::{Duration, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

use engine::{
    Debt, DebtPaymentCmd, DebtStatus, Engine, EngineError, OriginateDebtCmd, PaymentMethod,
    ReferenceKind, Sale, SaleCmd, SaleItemCmd, SalePaymentStatus, TransactionKind,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db.clone()).build().await.unwrap();
    (engine, db)
}

async fn seed_customer(db: &DatabaseConnection, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO customers (id, name, phone, current_balance_minor) VALUES (?, ?, NULL, 0)",
        vec![id.to_string().into(), name.into()],
    ))
    .await
    .unwrap();
    id
}

async fn seed_product(db: &DatabaseConnection, name: &str, price_minor: i64, stock: i64) -> Uuid {
    let id = Uuid::new_v4();
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO products (id, name, unit_price_minor, unit_cost_minor, stock_quantity) \
         VALUES (?, ?, ?, ?, ?)",
        vec![
            id.to_string().into(),
            name.into(),
            price_minor.into(),
            (price_minor / 2).into(),
            stock.into(),
        ],
    ))
    .await
    .unwrap();
    id
}

/// A fully-on-credit sale of 50, which originates a debt of 50.
async fn credit_sale(engine: &Engine, db: &DatabaseConnection) -> (Uuid, Sale, Debt) {
    let customer_id = seed_customer(db, "Mariam").await;
    let product_id = seed_product(db, "Rice 5kg", 50, 10).await;

    let sale = engine
        .record_sale(
            SaleCmd::new("asha", 0, PaymentMethod::Cash, Utc::now())
                .customer(customer_id)
                .item(SaleItemCmd::new(product_id, 1)),
        )
        .await
        .unwrap();
    let debt = engine.debt_for_sale(sale.id).await.unwrap().unwrap();
    (customer_id, sale, debt)
}

#[tokio::test]
async fn origination_bumps_customer_balance() {
    let (engine, db) = engine_with_db().await;
    let (customer_id, sale, debt) = credit_sale(&engine, &db).await;

    assert_eq!(debt.sale_id, sale.id);
    assert_eq!(debt.original_minor, 50);
    assert_eq!(debt.remaining_minor, 50);
    assert_eq!(debt.status, DebtStatus::Pending);

    let customer = engine.customer_by_id(customer_id).await.unwrap();
    assert_eq!(customer.current_balance_minor, 50);
}

#[tokio::test]
async fn partial_payment_updates_every_entity() {
    let (engine, db) = engine_with_db().await;
    let (customer_id, sale, debt) = credit_sale(&engine, &db).await;

    let payment = engine
        .apply_debt_payment(DebtPaymentCmd::new(
            debt.id,
            30,
            PaymentMethod::Cash,
            "asha",
            Utc::now(),
        ))
        .await
        .unwrap();
    assert_eq!(payment.amount_minor, 30);

    let debt = engine.debt_by_id(debt.id).await.unwrap();
    assert_eq!(debt.remaining_minor, 20);
    assert_eq!(debt.status, DebtStatus::Partial);
    assert_eq!(
        debt.remaining_minor,
        debt.original_minor
            - engine
                .payments_for_debt(debt.id)
                .await
                .unwrap()
                .iter()
                .map(|p| p.amount_minor)
                .sum::<i64>()
    );

    let sale = engine.sale_by_id(sale.id).await.unwrap();
    assert_eq!(sale.amount_paid_minor, 30);
    assert_eq!(sale.balance_due_minor, 20);
    assert_eq!(sale.payment_status, SalePaymentStatus::Partial);
    assert_eq!(sale.balance_due_minor, debt.remaining_minor);

    let customer = engine.customer_by_id(customer_id).await.unwrap();
    assert_eq!(customer.current_balance_minor, 20);

    // A debt_collection posting continues the running balance.
    let rows = engine
        .transactions_for_reference(debt.id, ReferenceKind::Debt)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].kind, TransactionKind::DebtCollection);
    assert_eq!(rows[0].credit_minor, 30);
    assert_eq!(rows[0].balance_minor, 30);

    let today = Utc::now().date_naive().to_string();
    let summary = engine.daily_summary(&today).await.unwrap().unwrap();
    assert_eq!(summary.debt_collected_minor, 30);
}

#[tokio::test]
async fn overpayment_is_rejected_without_side_effects() {
    let (engine, db) = engine_with_db().await;
    let (customer_id, sale, debt) = credit_sale(&engine, &db).await;

    engine
        .apply_debt_payment(DebtPaymentCmd::new(
            debt.id,
            30,
            PaymentMethod::Cash,
            "asha",
            Utc::now(),
        ))
        .await
        .unwrap();

    let err = engine
        .apply_debt_payment(DebtPaymentCmd::new(
            debt.id,
            25,
            PaymentMethod::Cash,
            "asha",
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("payment exceeds remaining debt".to_string())
    );

    // Nothing moved: debt, sale, customer, ledger and summary are all as
    // they were after the first payment.
    let debt = engine.debt_by_id(debt.id).await.unwrap();
    assert_eq!(debt.remaining_minor, 20);
    assert_eq!(debt.status, DebtStatus::Partial);
    assert_eq!(engine.payments_for_debt(debt.id).await.unwrap().len(), 1);

    let sale = engine.sale_by_id(sale.id).await.unwrap();
    assert_eq!(sale.amount_paid_minor, 30);
    assert_eq!(sale.balance_due_minor, 20);

    let customer = engine.customer_by_id(customer_id).await.unwrap();
    assert_eq!(customer.current_balance_minor, 20);

    let rows = engine
        .transactions_for_reference(debt.id, ReferenceKind::Debt)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);

    let today = Utc::now().date_naive().to_string();
    let summary = engine.daily_summary(&today).await.unwrap().unwrap();
    assert_eq!(summary.debt_collected_minor, 30);
}

#[tokio::test]
async fn exact_payment_settles_the_debt() {
    let (engine, db) = engine_with_db().await;
    let (customer_id, sale, debt) = credit_sale(&engine, &db).await;

    engine
        .apply_debt_payment(DebtPaymentCmd::new(
            debt.id,
            50,
            PaymentMethod::MobileMoney,
            "asha",
            Utc::now(),
        ))
        .await
        .unwrap();

    let debt = engine.debt_by_id(debt.id).await.unwrap();
    assert_eq!(debt.remaining_minor, 0);
    assert_eq!(debt.status, DebtStatus::Paid);

    let sale = engine.sale_by_id(sale.id).await.unwrap();
    assert_eq!(sale.balance_due_minor, 0);
    assert_eq!(sale.payment_status, SalePaymentStatus::Paid);

    let customer = engine.customer_by_id(customer_id).await.unwrap();
    assert_eq!(customer.current_balance_minor, 0);
}

#[tokio::test]
async fn write_off_forgives_without_touching_the_cache() {
    let (engine, db) = engine_with_db().await;
    let (customer_id, _sale, debt) = credit_sale(&engine, &db).await;

    engine
        .write_off_debt(debt.id, "asha", Utc::now())
        .await
        .unwrap();

    let debt = engine.debt_by_id(debt.id).await.unwrap();
    assert_eq!(debt.status, DebtStatus::WrittenOff);
    assert_eq!(debt.remaining_minor, 50);

    // Policy: the forgiven amount stays in the cached balance until an
    // administrative recompute reconciles it.
    let customer = engine.customer_by_id(customer_id).await.unwrap();
    assert_eq!(customer.current_balance_minor, 50);

    let recomputed = engine
        .recompute_customer_balance(customer_id)
        .await
        .unwrap();
    assert_eq!(recomputed, 0);
    let customer = engine.customer_by_id(customer_id).await.unwrap();
    assert_eq!(customer.current_balance_minor, 0);

    // And no further payments are accepted.
    let err = engine
        .apply_debt_payment(DebtPaymentCmd::new(
            debt.id,
            10,
            PaymentMethod::Cash,
            "asha",
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("debt is written off".to_string())
    );
}

#[tokio::test]
async fn overdue_sweep_moves_only_lapsed_open_debts() {
    let (engine, db) = engine_with_db().await;
    let customer_id = seed_customer(&db, "Mariam").await;
    let product_id = seed_product(&db, "Rice 5kg", 50, 10).await;

    let due_tomorrow = engine
        .record_sale(
            SaleCmd::new("asha", 0, PaymentMethod::Cash, Utc::now())
                .customer(customer_id)
                .item(SaleItemCmd::new(product_id, 1))
                .due_in_days(1),
        )
        .await
        .unwrap();
    let due_now = engine
        .record_sale(
            SaleCmd::new("asha", 0, PaymentMethod::Cash, Utc::now())
                .customer(customer_id)
                .item(SaleItemCmd::new(product_id, 1))
                .due_in_days(0),
        )
        .await
        .unwrap();

    let moved = engine
        .mark_overdue(Utc::now() + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(moved, 1);

    let lapsed = engine.debt_for_sale(due_now.id).await.unwrap().unwrap();
    assert_eq!(lapsed.status, DebtStatus::Overdue);
    let fresh = engine.debt_for_sale(due_tomorrow.id).await.unwrap().unwrap();
    assert_eq!(fresh.status, DebtStatus::Pending);
}

#[tokio::test]
async fn a_sale_carries_at_most_one_debt() {
    let (engine, db) = engine_with_db().await;
    let (customer_id, sale, _debt) = credit_sale(&engine, &db).await;

    let err = engine
        .originate_debt(OriginateDebtCmd::new(
            sale.id,
            customer_id,
            25,
            30,
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("debt already exists for this sale".to_string())
    );
}

#[tokio::test]
async fn recompute_repairs_a_corrupted_cache() {
    let (engine, db) = engine_with_db().await;
    let (customer_id, _sale, _debt) = credit_sale(&engine, &db).await;

    // Corrupt the denormalized balance directly in the DB.
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "UPDATE customers SET current_balance_minor = ? WHERE id = ?",
        vec![999i64.into(), customer_id.to_string().into()],
    ))
    .await
    .unwrap();

    let recomputed = engine
        .recompute_customer_balance(customer_id)
        .await
        .unwrap();
    assert_eq!(recomputed, 50);

    let customer = engine.customer_by_id(customer_id).await.unwrap();
    assert_eq!(customer.current_balance_minor, 50);
}

#[tokio::test]
async fn unknown_debt_is_reported() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .apply_debt_payment(DebtPaymentCmd::new(
            Uuid::new_v4(),
            10,
            PaymentMethod::Cash,
            "asha",
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound("debt".to_string()));
}

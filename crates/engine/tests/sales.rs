use chrono::Utc;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

use engine::{
    DebtStatus, Engine, EngineError, PaymentMethod, SaleCmd, SaleItemCmd, SalePaymentStatus,
    TransactionKind, TransactionListFilter,
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

fn today() -> String {
    Utc::now().date_naive().to_string()
}

#[tokio::test]
async fn cash_sale_hands_over_goods_immediately() {
    let (engine, db) = engine_with_db().await;
    let product_id = seed_product(&db, "Maize flour", 25, 10).await;

    let sale = engine
        .record_sale(
            SaleCmd::new("asha", 100, PaymentMethod::Cash, Utc::now())
                .item(SaleItemCmd::new(product_id, 4)),
        )
        .await
        .unwrap();

    assert_eq!(sale.subtotal_minor, 100);
    assert_eq!(sale.total_minor, 100);
    assert_eq!(sale.balance_due_minor, 0);
    assert_eq!(sale.payment_status, SalePaymentStatus::Paid);

    let items = engine.sale_items(sale.id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 4);
    assert_eq!(items[0].taken_quantity, 4);

    let product = engine.product_by_id(product_id).await.unwrap();
    assert_eq!(product.stock_quantity, 6);

    let summary = engine.daily_summary(&today()).await.unwrap().unwrap();
    assert_eq!(summary.total_sales_minor, 100);
    assert_eq!(summary.cash_sales_minor, 100);
    assert_eq!(summary.debt_created_minor, 0);
}

#[tokio::test]
async fn short_paid_sale_originates_the_remainder_as_debt() {
    let (engine, db) = engine_with_db().await;
    let customer_id = seed_customer(&db, "Mariam").await;
    let product_id = seed_product(&db, "Maize flour", 25, 10).await;

    let sale = engine
        .record_sale(
            SaleCmd::new("asha", 40, PaymentMethod::Cash, Utc::now())
                .customer(customer_id)
                .item(SaleItemCmd::new(product_id, 4)),
        )
        .await
        .unwrap();

    assert_eq!(sale.payment_status, SalePaymentStatus::Partial);
    assert_eq!(sale.balance_due_minor, 60);

    let debt = engine.debt_for_sale(sale.id).await.unwrap().unwrap();
    assert_eq!(debt.original_minor, 60);
    assert_eq!(debt.status, DebtStatus::Pending);

    let customer = engine.customer_by_id(customer_id).await.unwrap();
    assert_eq!(customer.current_balance_minor, 60);

    let summary = engine.daily_summary(&today()).await.unwrap().unwrap();
    assert_eq!(summary.total_sales_minor, 100);
    assert_eq!(summary.cash_sales_minor, 40);
    assert_eq!(summary.debt_created_minor, 60);
}

#[tokio::test]
async fn credit_sale_without_customer_is_rejected() {
    let (engine, db) = engine_with_db().await;
    let product_id = seed_product(&db, "Maize flour", 25, 10).await;

    let err = engine
        .record_sale(
            SaleCmd::new("asha", 40, PaymentMethod::Cash, Utc::now())
                .item(SaleItemCmd::new(product_id, 4)),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("credit sale requires a customer".to_string())
    );

    // The whole unit rolled back: no stock movement, no ledger entry.
    let product = engine.product_by_id(product_id).await.unwrap();
    assert_eq!(product.stock_quantity, 10);
    let txs = engine
        .list_transactions(10, &TransactionListFilter::default())
        .await
        .unwrap();
    assert!(txs.is_empty());
}

#[tokio::test]
async fn deferred_order_releases_stock_only_as_collected() {
    let (engine, db) = engine_with_db().await;
    let customer_id = seed_customer(&db, "Mariam").await;
    let product_id = seed_product(&db, "Rice 25kg", 10, 10).await;

    let sale = engine
        .record_sale(
            SaleCmd::new("asha", 0, PaymentMethod::Cash, Utc::now())
                .customer(customer_id)
                .item(SaleItemCmd::new(product_id, 10))
                .deferred(),
        )
        .await
        .unwrap();
    assert!(sale.is_deferred);
    assert_eq!(sale.payment_status, SalePaymentStatus::Credit);

    // Nothing left the shelf yet.
    let items = engine.sale_items(sale.id).await.unwrap();
    assert_eq!(items[0].taken_quantity, 0);
    let product = engine.product_by_id(product_id).await.unwrap();
    assert_eq!(product.stock_quantity, 10);

    // The order posts as walpo_created, invoiced in full.
    let txs = engine
        .list_transactions(10, &TransactionListFilter::default())
        .await
        .unwrap();
    assert_eq!(txs[0].kind, TransactionKind::WalpoCreated);
    assert_eq!(txs[0].debt_portion_minor, 100);

    let summary = engine.daily_summary(&today()).await.unwrap().unwrap();
    assert_eq!(summary.total_sales_minor, 100);
    assert_eq!(summary.cash_sales_minor, 0);
    assert_eq!(summary.debt_created_minor, 100);

    // Collect 4 of 10.
    let item = engine
        .update_taken_quantity(items[0].id, 4)
        .await
        .unwrap();
    assert_eq!(item.taken_quantity, 4);
    let product = engine.product_by_id(product_id).await.unwrap();
    assert_eq!(product.stock_quantity, 6);

    // Over-collection is rejected and changes nothing.
    let err = engine
        .update_taken_quantity(items[0].id, 15)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("taken quantity exceeds ordered quantity".to_string())
    );
    let item = engine.sale_items(sale.id).await.unwrap().remove(0);
    assert_eq!(item.taken_quantity, 4);
    let product = engine.product_by_id(product_id).await.unwrap();
    assert_eq!(product.stock_quantity, 6);

    // Collection is monotonic.
    let err = engine
        .update_taken_quantity(items[0].id, 3)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("taken quantity cannot decrease".to_string())
    );
}

#[tokio::test]
async fn collection_on_ordinary_sale_is_rejected() {
    let (engine, db) = engine_with_db().await;
    let product_id = seed_product(&db, "Maize flour", 25, 10).await;

    let sale = engine
        .record_sale(
            SaleCmd::new("asha", 50, PaymentMethod::Cash, Utc::now())
                .item(SaleItemCmd::new(product_id, 2)),
        )
        .await
        .unwrap();
    let items = engine.sale_items(sale.id).await.unwrap();

    let err = engine
        .update_taken_quantity(items[0].id, 2)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("sale is not deferred".to_string())
    );
}

#[tokio::test]
async fn insufficient_stock_rejects_the_whole_sale() {
    let (engine, db) = engine_with_db().await;
    let product_id = seed_product(&db, "Maize flour", 25, 4).await;

    let err = engine
        .record_sale(
            SaleCmd::new("asha", 125, PaymentMethod::Cash, Utc::now())
                .item(SaleItemCmd::new(product_id, 5)),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("insufficient stock for \"Maize flour\"".to_string())
    );

    let product = engine.product_by_id(product_id).await.unwrap();
    assert_eq!(product.stock_quantity, 4);
    assert!(engine.daily_summary(&today()).await.unwrap().is_none());
}

#[tokio::test]
async fn overpaying_a_sale_is_rejected() {
    let (engine, db) = engine_with_db().await;
    let product_id = seed_product(&db, "Maize flour", 25, 10).await;

    let err = engine
        .record_sale(
            SaleCmd::new("asha", 120, PaymentMethod::Cash, Utc::now())
                .item(SaleItemCmd::new(product_id, 4)),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("amount paid exceeds sale total".to_string())
    );
}

#[tokio::test]
async fn cancelling_a_credit_sale_compensates_everything() {
    let (engine, db) = engine_with_db().await;
    let customer_id = seed_customer(&db, "Mariam").await;
    let product_id = seed_product(&db, "Maize flour", 25, 10).await;

    let sale = engine
        .record_sale(
            SaleCmd::new("asha", 40, PaymentMethod::Cash, Utc::now())
                .customer(customer_id)
                .item(SaleItemCmd::new(product_id, 4)),
        )
        .await
        .unwrap();

    engine
        .cancel_sale(sale.id, "asha", Utc::now())
        .await
        .unwrap();

    let sale = engine.sale_by_id(sale.id).await.unwrap();
    assert_eq!(sale.payment_status, SalePaymentStatus::Cancelled);
    assert!(sale.cancelled_at.is_some());

    // Goods returned, debt forgiven, customer no longer owes anything.
    let product = engine.product_by_id(product_id).await.unwrap();
    assert_eq!(product.stock_quantity, 10);
    let debt = engine.debt_for_sale(sale.id).await.unwrap().unwrap();
    assert_eq!(debt.status, DebtStatus::WrittenOff);
    let customer = engine.customer_by_id(customer_id).await.unwrap();
    assert_eq!(customer.current_balance_minor, 0);

    // The summary no longer carries the sale; the ledger keeps both the
    // original and the compensating entry.
    let summary = engine.daily_summary(&today()).await.unwrap().unwrap();
    assert_eq!(summary.total_sales_minor, 0);
    assert_eq!(summary.cash_sales_minor, 0);
    assert_eq!(summary.debt_created_minor, 0);
    assert_eq!(summary.transaction_count, 0);

    let all = engine
        .list_transactions(
            10,
            &TransactionListFilter {
                include_reversed: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let err = engine
        .cancel_sale(sale.id, "asha", Utc::now())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("sale already cancelled".to_string())
    );
}

#[tokio::test]
async fn cancelling_a_deferred_order_returns_only_what_was_taken() {
    let (engine, db) = engine_with_db().await;
    let customer_id = seed_customer(&db, "Mariam").await;
    let product_id = seed_product(&db, "Rice 25kg", 10, 10).await;

    let sale = engine
        .record_sale(
            SaleCmd::new("asha", 0, PaymentMethod::Cash, Utc::now())
                .customer(customer_id)
                .item(SaleItemCmd::new(product_id, 10))
                .deferred(),
        )
        .await
        .unwrap();
    let items = engine.sale_items(sale.id).await.unwrap();
    engine
        .update_taken_quantity(items[0].id, 4)
        .await
        .unwrap();
    let product = engine.product_by_id(product_id).await.unwrap();
    assert_eq!(product.stock_quantity, 6);

    engine
        .cancel_sale(sale.id, "asha", Utc::now())
        .await
        .unwrap();

    // Only the collected 4 units come back; the rest never left.
    let product = engine.product_by_id(product_id).await.unwrap();
    assert_eq!(product.stock_quantity, 10);

    let customer = engine.customer_by_id(customer_id).await.unwrap();
    assert_eq!(customer.current_balance_minor, 0);

    // No further collection on a cancelled order.
    let err = engine
        .update_taken_quantity(items[0].id, 5)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Validation("sale is cancelled".to_string()));
}

//! PostgreSQL bill store tests
//!
//! These run the bill engine against a real database in a container and are
//! ignored unless Docker is available (`cargo test -- --ignored`).

use std::sync::Arc;

use rust_decimal_macros::dec;

use core_kernel::{BillId, Money};
use domain_billing::{BillEngine, BillingError, BillingService, NumberingSequence};
use infra_db::PostgresBillStore;
use test_utils::{
    count_rows, db_test, delete_product, insert_customer, insert_product, stock_of, MoneyFixtures,
    NameFixtures, TestBillRequestBuilder,
};

fn engine(pool: &sqlx::PgPool) -> BillEngine<PostgresBillStore> {
    BillEngine::new(PostgresBillStore::new(pool.clone()), NumberingSequence::default())
}

db_test!(test_sell_reject_restore_scenario, |pool| {
    let engine = engine(&pool);
    let customer = insert_customer(&pool, &NameFixtures::customer_name()).await.unwrap();
    let lamp = insert_product(&pool, "LAMP-01", dec!(10.00), 5).await.unwrap();

    let created = engine
        .create_bill(
            TestBillRequestBuilder::for_customer(customer)
                .line(lamp, 3)
                .tax(MoneyFixtures::tax())
                .discount(MoneyFixtures::discount())
                .build(),
        )
        .await
        .unwrap();
    assert_eq!(created.bill_number, "BILL-0001");
    assert_eq!(created.totals.total_amount, Money::new(dec!(31.00)));
    assert_eq!(stock_of(&pool, lamp).await.unwrap(), Some(2));

    let err = engine
        .create_bill(TestBillRequestBuilder::for_customer(customer).line(lamp, 3).build())
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::InsufficientStock { shortfall: 1, .. }));
    assert_eq!(count_rows(&pool, "bills").await.unwrap(), 1);

    let deleted = engine.delete_bill(created.bill_id).await.unwrap();
    assert!(deleted.existed);
    assert_eq!(stock_of(&pool, lamp).await.unwrap(), Some(5));
    assert_eq!(count_rows(&pool, "bill_items").await.unwrap(), 0);
});

db_test!(test_concurrent_creates_never_oversell, |pool| {
    let engine = Arc::new(engine(&pool));
    let customer = insert_customer(&pool, "Asha Traders").await.unwrap();
    let lamp = insert_product(&pool, "LAMP-01", dec!(10.00), 5).await.unwrap();

    let request = TestBillRequestBuilder::for_customer(customer).line(lamp, 3).build();
    let a = tokio::spawn({
        let engine = engine.clone();
        let request = request.clone();
        async move { engine.create_bill(request).await }
    });
    let b = tokio::spawn({
        let engine = engine.clone();
        async move { engine.create_bill(request).await }
    });

    let results = [a.await.unwrap(), b.await.unwrap()];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(BillingError::InsufficientStock { .. }))));
    assert_eq!(stock_of(&pool, lamp).await.unwrap(), Some(2));
});

db_test!(test_concurrent_numbering_is_unique, |pool| {
    let engine = Arc::new(engine(&pool));
    let customer = insert_customer(&pool, "Numbering Co").await.unwrap();
    let mug = insert_product(&pool, "MUG-02", dec!(4.25), 100).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        let request = TestBillRequestBuilder::for_customer(customer).line(mug, 1).build();
        handles.push(tokio::spawn(async move { engine.create_bill(request).await }));
    }

    let mut numbers = Vec::new();
    for handle in handles {
        numbers.push(handle.await.unwrap().unwrap().bill_number);
    }
    numbers.sort();
    numbers.dedup();
    assert_eq!(numbers.len(), 8);
    assert_eq!(numbers.last().map(String::as_str), Some("BILL-0008"));
    assert_eq!(stock_of(&pool, mug).await.unwrap(), Some(92));
});

db_test!(test_list_and_get_read_committed_bills, |pool| {
    let engine = engine(&pool);
    let customer = insert_customer(&pool, "Reader Ltd").await.unwrap();
    let mug = insert_product(&pool, "MUG-02", dec!(4.25), 40).await.unwrap();

    let first = engine
        .create_bill(TestBillRequestBuilder::for_customer(customer).line(mug, 2).build())
        .await
        .unwrap();
    let second = engine
        .create_bill(TestBillRequestBuilder::for_customer(customer).line(mug, 1).build())
        .await
        .unwrap();

    let listed = engine.list_bills().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].bill.id, second.bill_id);
    assert_eq!(listed[0].customer_name, "Reader Ltd");

    let detail = engine.get_bill(first.bill_id).await.unwrap();
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].total_price, Money::new(dec!(8.50)));
    assert_eq!(detail.bill.totals, first.totals);

    assert!(engine.get_bill(BillId::new()).await.unwrap_err().is_not_found());
});

db_test!(test_delete_with_missing_product_still_removes_bill, |pool| {
    let engine = engine(&pool);
    let customer = insert_customer(&pool, "Integrity Inc").await.unwrap();
    let rug = insert_product(&pool, "RUG-03", dec!(89.90), 2).await.unwrap();

    let created = engine
        .create_bill(TestBillRequestBuilder::for_customer(customer).line(rug, 1).build())
        .await
        .unwrap();
    delete_product(&pool, rug).await.unwrap();

    let deleted = engine.delete_bill(created.bill_id).await.unwrap();
    assert_eq!(deleted.missing_products.len(), 1);
    assert_eq!(count_rows(&pool, "bills").await.unwrap(), 0);

    let again = engine.delete_bill(created.bill_id).await.unwrap();
    assert!(!again.existed);
});

db_test!(test_low_stock_report, |pool| {
    let engine = engine(&pool);
    insert_product(&pool, "LAMP-01", dec!(10.00), 5).await.unwrap();
    insert_product(&pool, "RUG-03", dec!(89.90), 2).await.unwrap();
    insert_product(&pool, "MUG-02", dec!(4.25), 40).await.unwrap();

    let low = engine.low_stock(5).await.unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].code, "RUG-03");
});

//! End-to-end order scenarios against the in-memory store.

mod common;

use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

use common::{harness, harness_with, order};
use opensase_orders::application::RetryPolicy;
use opensase_orders::domain::aggregates::OrderStatus;
use opensase_orders::domain::value_objects::MAX_AMOUNT;
use opensase_orders::{EcommerceError, ErrorKind};

#[tokio::test]
async fn completed_order_moves_money_and_stock_together() {
    let h = harness();
    let buyer = h.buyer("alice", dec!(500)).await;
    let shop = h.merchant("Acme").await;
    h.product("WIDGET-1", dec!(100), 10, shop.id()).await;

    let placed = h.state.orders.create_and_process_order(order(buyer.id(), &[("WIDGET-1", 2)])).await.unwrap();

    assert_eq!(placed.status(), OrderStatus::Completed);
    assert_eq!(placed.total_amount().unwrap().amount(), dec!(200));
    assert_eq!(placed.items().len(), 1);
    assert_eq!(h.user(buyer.id()).await.balance().amount(), dec!(300));
    assert_eq!(h.merchant_by_id(shop.id()).await.balance().amount(), dec!(200));
    assert_eq!(h.stock("WIDGET-1").await, 8);

    let fetched = h.state.orders.get_order(placed.order_number()).await.unwrap().unwrap();
    assert_eq!(fetched.id(), placed.id());
    assert_eq!(h.state.orders.list_orders_by_user(buyer.id()).await.unwrap().len(), 1);
    assert_eq!(h.state.orders.list_orders_by_merchant(shop.id()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn insufficient_stock_leaves_every_aggregate_untouched() {
    let h = harness();
    let buyer = h.buyer("bob", dec!(500)).await;
    let shop = h.merchant("Acme").await;
    h.product("WIDGET-1", dec!(100), 1, shop.id()).await;
    let events_before = h.events.events.lock().unwrap().len();

    let err = h.state.orders.create_and_process_order(order(buyer.id(), &[("WIDGET-1", 2)])).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::StateConflict);
    assert_eq!(h.user(buyer.id()).await.balance().amount(), dec!(500));
    assert!(h.merchant_by_id(shop.id()).await.balance().is_zero());
    assert_eq!(h.stock("WIDGET-1").await, 1);
    assert!(h.state.orders.list_orders_by_user(buyer.id()).await.unwrap().is_empty());
    assert_eq!(h.events.events.lock().unwrap().len(), events_before);
}

#[tokio::test]
async fn products_from_two_merchants_are_rejected() {
    let h = harness();
    let buyer = h.buyer("carol", dec!(500)).await;
    let first = h.merchant("Acme").await;
    let second = h.merchant("Globex").await;
    h.product("A-1", dec!(10), 5, first.id()).await;
    h.product("B-1", dec!(10), 5, second.id()).await;

    let err = h.state.orders.create_and_process_order(order(buyer.id(), &[("A-1", 1), ("B-1", 1)])).await.unwrap_err();

    assert!(matches!(err, EcommerceError::Validation(_)));
    assert_eq!(h.stock("A-1").await, 5);
    assert_eq!(h.stock("B-1").await, 5);
    assert_eq!(h.user(buyer.id()).await.balance().amount(), dec!(500));
}

#[tokio::test]
async fn insufficient_balance_is_a_state_conflict() {
    let h = harness();
    let buyer = h.buyer("dave", dec!(50)).await;
    let shop = h.merchant("Acme").await;
    h.product("WIDGET-1", dec!(100), 10, shop.id()).await;

    let err = h.state.orders.create_and_process_order(order(buyer.id(), &[("WIDGET-1", 1)])).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::StateConflict);
    assert_eq!(h.stock("WIDGET-1").await, 10);
    assert_eq!(h.user(buyer.id()).await.balance().amount(), dec!(50));
}

#[tokio::test]
async fn balances_are_conserved_across_several_orders() {
    let h = harness();
    let alice = h.buyer("alice", dec!(1000)).await;
    let bob = h.buyer("bob", dec!(400)).await;
    let shop = h.merchant("Acme").await;
    h.product("PEN", dec!(2.50), 100, shop.id()).await;
    h.product("BOOK", dec!(39.99), 20, shop.id()).await;

    h.state.orders.create_and_process_order(order(alice.id(), &[("PEN", 4), ("BOOK", 3)])).await.unwrap();
    h.state.orders.create_and_process_order(order(bob.id(), &[("BOOK", 2)])).await.unwrap();
    h.state.orders.create_and_process_order(order(alice.id(), &[("PEN", 10)])).await.unwrap();

    let spent = dec!(1400) - h.user(alice.id()).await.balance().amount() - h.user(bob.id()).await.balance().amount();
    let orders = h.state.orders.list_orders_by_merchant(shop.id()).await.unwrap();
    let sales: rust_decimal::Decimal = orders.iter().map(|o| o.total_amount().unwrap().amount()).sum();

    assert_eq!(orders.len(), 3);
    assert_eq!(sales, dec!(234.95));
    assert_eq!(spent, sales);
    assert_eq!(h.merchant_by_id(shop.id()).await.balance().amount(), sales);
    assert_eq!(h.stock("PEN").await, 86);
    assert_eq!(h.stock("BOOK").await, 15);
}

#[tokio::test]
async fn events_are_published_after_commit() {
    let h = harness();
    let buyer = h.buyer("erin", dec!(100)).await;
    let shop = h.merchant("Acme").await;
    h.product("MUG", dec!(12), 3, shop.id()).await;

    h.state.orders.create_and_process_order(order(buyer.id(), &[("MUG", 2)])).await.unwrap();

    let subjects = h.events.subjects();
    for expected in [
        "orders.events.order.created",
        "orders.events.order.confirmed",
        "orders.events.order.completed",
        "orders.events.product.stock_reduced",
    ] {
        assert!(subjects.iter().any(|s| s == expected), "missing {expected} in {subjects:?}");
    }

    // Reloading the product must not hand out the drained events again.
    let mut product = h.state.catalog.get_product("MUG").await.unwrap().unwrap();
    assert!(product.take_events().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_orders_never_oversell() {
    let h = Arc::new(harness_with(RetryPolicy { max_attempts: 100, backoff: Duration::from_millis(1) }));
    let shop = h.merchant("Acme").await;
    h.product("LIMITED", dec!(10), 10, shop.id()).await;

    let mut buyers = Vec::new();
    for i in 0..20 {
        buyers.push(h.buyer(&format!("buyer{i:02}"), dec!(100)).await);
    }

    let mut tasks = Vec::new();
    for buyer in &buyers {
        let h = h.clone();
        let user_id = buyer.id();
        tasks.push(tokio::spawn(async move { h.state.orders.create_and_process_order(order(user_id, &[("LIMITED", 1)])).await }));
    }

    let mut placed = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => placed += 1,
            Err(err) => assert_eq!(err.kind(), ErrorKind::StateConflict, "unexpected failure: {err}"),
        }
    }

    assert_eq!(placed, 10);
    assert_eq!(h.stock("LIMITED").await, 0);
    assert_eq!(h.merchant_by_id(shop.id()).await.balance().amount(), dec!(100));
    let mut remaining = dec!(0);
    for buyer in &buyers {
        remaining += h.user(buyer.id()).await.balance().amount();
    }
    assert_eq!(remaining, dec!(1900));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_orders_within_stock_all_succeed() {
    let h = Arc::new(harness_with(RetryPolicy { max_attempts: 100, backoff: Duration::from_millis(1) }));
    let buyer = h.buyer("frank", dec!(1000)).await;
    let shop = h.merchant("Acme").await;
    h.product("BULK", dec!(5), 10, shop.id()).await;

    let tasks: Vec<_> = (0..5)
        .map(|_| {
            let h = h.clone();
            let user_id = buyer.id();
            tokio::spawn(async move { h.state.orders.create_and_process_order(order(user_id, &[("BULK", 2)])).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(h.stock("BULK").await, 0);
    assert_eq!(h.user(buyer.id()).await.balance().amount(), dec!(950));
    let numbers: std::collections::HashSet<_> =
        h.state.orders.list_orders_by_user(buyer.id()).await.unwrap().iter().map(|o| o.order_number().to_string()).collect();
    assert_eq!(numbers.len(), 5);
}

#[tokio::test]
async fn order_total_beyond_the_storable_range_is_rejected() {
    let h = harness();
    let buyer = h.buyer("grace", dec!(500)).await;
    let shop = h.merchant("Acme").await;
    h.product("HUGE", MAX_AMOUNT, 5, shop.id()).await;

    let err = h.state.orders.create_and_process_order(order(buyer.id(), &[("HUGE", 2)])).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::StateConflict);
    assert_eq!(h.stock("HUGE").await, 5);
    assert_eq!(h.user(buyer.id()).await.balance().amount(), dec!(500));
    assert!(h.state.orders.list_orders_by_user(buyer.id()).await.unwrap().is_empty());
}

//! Retry resolution: a second `complete` carrying the gateway transaction id
//! of an already-finished checkout must return the original order without
//! re-running anything side-effecting.

mod common;

use common::{ctx, empty_cart, harness, TOPIC};
use rust_decimal_macros::dec;
use std::sync::atomic::Ordering;
use std::time::Instant;
use uuid::Uuid;

use checkout_api::dto::CheckoutRequest;
use checkout_api::errors::CheckoutError;
use checkout_api::models::OrderProjection;

fn retry_request(transaction_id: &str) -> CheckoutRequest {
    CheckoutRequest {
        shipping_address_id: Some(Uuid::new_v4()),
        payment_gateway_transaction_id: Some(transaction_id.to_string()),
        ..Default::default()
    }
}

fn projection(harness: &common::TestHarness) -> OrderProjection {
    OrderProjection {
        id: Some(harness.order_id),
        order_number: Some("ORD-1".to_string()),
        payment_id: Some(harness.payment_id),
        total: Some(dec!(110.00)),
        currency: Some("INR".to_string()),
    }
}

#[tokio::test]
async fn retry_returns_the_original_order_without_side_effects() {
    let harness = harness();
    harness.carts.set_cart(empty_cart());
    *harness.payments.lookup_result.lock().unwrap() = Ok(Some(harness.payment_id));
    harness.orders.push_find_result(Ok(Some(projection(&harness))));

    let response = harness
        .service
        .complete_checkout(&ctx(), retry_request("TXN-1"))
        .await
        .expect("retry should resolve");

    assert_eq!(response.order_id, harness.order_id);
    assert_eq!(response.order_number, "ORD-1");
    assert_eq!(response.payment_id, harness.payment_id);
    assert_eq!(response.total, dec!(110.00));
    assert_eq!(response.currency, "INR");
    assert_eq!(response.status, "PLACED");

    // Nothing side-effecting ran
    assert!(harness.inventory.reserve_calls.lock().unwrap().is_empty());
    assert!(harness.payments.process_calls.lock().unwrap().is_empty());
    assert!(harness.orders.create_calls.lock().unwrap().is_empty());
    assert_eq!(harness.carts.clear_calls.load(Ordering::SeqCst), 0);
    assert!(harness.queue.drain(TOPIC).is_empty());
}

#[tokio::test]
async fn two_retries_with_the_same_transaction_id_resolve_identically() {
    let harness = harness();
    harness.carts.set_cart(empty_cart());
    *harness.payments.lookup_result.lock().unwrap() = Ok(Some(harness.payment_id));
    harness.orders.push_find_result(Ok(Some(projection(&harness))));
    harness.orders.push_find_result(Ok(Some(projection(&harness))));

    let first = harness
        .service
        .complete_checkout(&ctx(), retry_request("TXN-1"))
        .await
        .unwrap();
    let second = harness
        .service
        .complete_checkout(&ctx(), retry_request("TXN-1"))
        .await
        .unwrap();

    assert_eq!(first.order_id, second.order_id);
    assert_eq!(first.order_number, second.order_number);
}

#[tokio::test]
async fn retry_race_succeeds_after_backoff() {
    let harness = harness();
    harness.carts.set_cart(empty_cart());
    *harness.payments.lookup_result.lock().unwrap() = Ok(Some(harness.payment_id));
    // Replica lag: not visible on the first attempt, visible on the second
    harness.orders.push_find_result(Ok(None));
    harness.orders.push_find_result(Ok(Some(projection(&harness))));

    let started = Instant::now();
    let response = harness
        .service
        .complete_checkout(&ctx(), retry_request("TXN-1"))
        .await
        .expect("second attempt should see the order");
    let elapsed = started.elapsed();

    assert_eq!(response.order_id, harness.order_id);
    assert_eq!(harness.orders.find_calls.load(Ordering::SeqCst), 2);
    // The second attempt only ran after the 200ms backoff
    assert!(elapsed.as_millis() >= 200, "elapsed was {elapsed:?}");
}

#[tokio::test]
async fn lookup_errors_are_retried_until_the_order_appears() {
    let harness = harness();
    harness.carts.set_cart(empty_cart());
    *harness.payments.lookup_result.lock().unwrap() = Ok(Some(harness.payment_id));
    harness
        .orders
        .push_find_result(Err(CheckoutError::Unexpected("replica timeout".into())));
    harness.orders.push_find_result(Ok(Some(projection(&harness))));

    let response = harness
        .service
        .complete_checkout(&ctx(), retry_request("TXN-1"))
        .await
        .expect("lookup error on attempt one is tolerated");

    assert_eq!(response.order_id, harness.order_id);
    assert_eq!(harness.orders.find_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn exhausted_lookups_fail_with_order_not_found() {
    let harness = harness();
    harness.carts.set_cart(empty_cart());
    *harness.payments.lookup_result.lock().unwrap() = Ok(Some(harness.payment_id));
    // All three attempts come back empty

    let err = harness
        .service
        .complete_checkout(&ctx(), retry_request("TXN-1"))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::OrderNotFound));
    assert_eq!(harness.orders.find_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn unknown_transaction_id_is_an_empty_cart() {
    let harness = harness();
    harness.carts.set_cart(empty_cart());
    // lookup_result defaults to Ok(None)

    let err = harness
        .service
        .complete_checkout(&ctx(), retry_request("TXN-UNKNOWN"))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::EmptyCart));
    assert_eq!(harness.orders.find_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_order_number_is_never_fabricated() {
    let harness = harness();
    harness.carts.set_cart(empty_cart());
    *harness.payments.lookup_result.lock().unwrap() = Ok(Some(harness.payment_id));
    harness.orders.push_find_result(Ok(Some(OrderProjection {
        id: Some(harness.order_id),
        order_number: None,
        payment_id: Some(harness.payment_id),
        total: Some(dec!(110.00)),
        currency: Some("INR".to_string()),
    })));

    let err = harness
        .service
        .complete_checkout(&ctx(), retry_request("TXN-1"))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::UpstreamContract(_)));
}

#[tokio::test]
async fn non_empty_cart_skips_the_resolver_even_with_a_transaction_id() {
    let harness = harness();
    // Cart still has the line item; this is an active checkout, not a retry

    let response = harness
        .service
        .complete_checkout(&ctx(), retry_request("TXN-1"))
        .await
        .expect("the saga should run normally");

    assert_eq!(harness.payments.lookup_calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.inventory.reserve_calls.lock().unwrap().len(), 1);
    // The gateway transaction id rides along on the payment instruction
    let instructions = harness.payments.process_calls.lock().unwrap();
    assert_eq!(
        instructions[0].gateway_transaction_id.as_deref(),
        Some("TXN-1")
    );
    assert_eq!(response.status, "PLACED");
}

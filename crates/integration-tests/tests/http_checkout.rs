//! Checkout through the HTTP order backend against the fake order API.

use std::time::Duration;

use axum::http::StatusCode;
use chrono::{TimeZone, Utc};
use farmers_market_cart::config::ApiConfig;
use farmers_market_cart::{
    BackendError, Buyer, CartError, CartStore, FarmerRef, HttpOrderBackend, OrderBackend,
    PlacedOrder, ProductSnapshot,
};
use farmers_market_core::{BuyerId, FarmerId, OrderId, OrderStatus, Price, ProductId};
use farmers_market_integration_tests::{FakeOrderApi, unreachable_base_url, with_token};

fn tomatoes() -> ProductSnapshot {
    ProductSnapshot::new(ProductId::new(1), "Organic Tomatoes", Price::from_minor_units(1000))
        .with_category("Vegetables")
        .with_image("tomatoes.jpg")
        .with_farmer(FarmerRef {
            id: FarmerId::new(1),
            first_name: "John".to_string(),
            last_name: "Smith".to_string(),
        })
}

fn carrots() -> ProductSnapshot {
    ProductSnapshot::new(ProductId::new(3), "Carrots", Price::from_minor_units(500))
}

fn buyer() -> Buyer {
    Buyer::new(BuyerId::new(2), "Jane Doe")
}

/// A: 2 @ 10, B: 1 @ 5, total 25.
fn two_line_store() -> CartStore {
    let store = CartStore::new();
    store.add_line(&tomatoes(), 2).unwrap();
    store.add_line(&carrots(), 1).unwrap();
    store
}

// =============================================================================
// Successful checkout
// =============================================================================

#[tokio::test]
async fn test_checkout_posts_order_and_clears_cart() {
    let api = FakeOrderApi::start().await;
    let backend = HttpOrderBackend::new(&api.api_config()).unwrap();
    let store = two_line_store();
    assert_eq!(store.total(), Price::from_minor_units(2500));

    let order = store.submit_order(Some(&buyer()), &backend).await.unwrap();

    assert_eq!(order.id, OrderId::new(1));
    assert_eq!(order.buyer_id, BuyerId::new(2));
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(order.total_amount, Price::from_minor_units(2500));
    assert_eq!(store.line_count(), 0);
    assert!(store.total().is_zero());
    assert_eq!(api.orders().len(), 1);
}

#[tokio::test]
async fn test_request_body_uses_api_field_names() {
    let api = FakeOrderApi::start().await;
    let backend = HttpOrderBackend::new(&api.api_config()).unwrap();
    let store = two_line_store();

    store.submit_order(Some(&buyer()), &backend).await.unwrap();

    let raw = api.raw_requests();
    assert_eq!(raw.len(), 1);
    let body = &raw[0];
    assert_eq!(body["userId"], 2);
    assert_eq!(body["totalAmount"], 25.0);

    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["productId"], 1);
    assert_eq!(items[0]["productName"], "Organic Tomatoes");
    assert_eq!(items[0]["quantity"], 2);
    assert_eq!(items[0]["pricePerUnit"], 10.0);
    assert_eq!(items[0]["category"], "Vegetables");
    assert_eq!(items[0]["farmerId"], 1);
    assert_eq!(items[0]["farmerName"], "John Smith");
    assert_eq!(items[1]["category"], "General");
    assert!(items[1]["farmerId"].is_null());
    assert_eq!(items[1]["farmerName"], "Unknown Farmer");
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let api = FakeOrderApi::start().await;
    api.require_token("k9Qz7vR2mP4x");

    let without = HttpOrderBackend::new(&api.api_config()).unwrap();
    let err = without.list_orders(None).await.unwrap_err();
    assert!(matches!(err, BackendError::Status { status: 401, .. }));

    let with = HttpOrderBackend::new(&with_token(api.api_config(), "k9Qz7vR2mP4x")).unwrap();
    assert!(with.list_orders(None).await.unwrap().is_empty());
}

// =============================================================================
// Failed checkout leaves the cart alone
// =============================================================================

#[tokio::test]
async fn test_server_error_leaves_cart_unchanged() {
    let api = FakeOrderApi::start().await;
    api.fail_with(Some(StatusCode::INTERNAL_SERVER_ERROR));
    let backend = HttpOrderBackend::new(&api.api_config()).unwrap();
    let store = two_line_store();

    let err = store.submit_order(Some(&buyer()), &backend).await.unwrap_err();

    match err {
        CartError::OrderSubmissionFailed(BackendError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "simulated failure");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.line_count(), 2);
    assert_eq!(store.total(), Price::from_minor_units(2500));
    assert!(!store.is_submitting());

    // Retrying after the backend recovers succeeds
    api.fail_with(None);
    store.submit_order(Some(&buyer()), &backend).await.unwrap();
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_unreachable_backend_leaves_cart_unchanged() {
    let config = ApiConfig {
        base_url: unreachable_base_url().await,
        token: None,
        timeout: Duration::from_secs(2),
    };
    let backend = HttpOrderBackend::new(&config).unwrap();
    let store = two_line_store();

    let err = store.submit_order(Some(&buyer()), &backend).await.unwrap_err();

    assert!(matches!(err, CartError::OrderSubmissionFailed(BackendError::Http(_))));
    assert_eq!(store.line_count(), 2);
    assert_eq!(store.total(), Price::from_minor_units(2500));
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let api = FakeOrderApi::start().await;
    api.delay(Duration::from_secs(3));
    let mut config = api.api_config();
    config.timeout = Duration::from_millis(300);
    let backend = HttpOrderBackend::new(&config).unwrap();
    let store = two_line_store();

    let err = store.submit_order(Some(&buyer()), &backend).await.unwrap_err();

    match err {
        CartError::OrderSubmissionFailed(BackendError::Http(e)) => assert!(e.is_timeout()),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.line_count(), 2);
}

#[tokio::test]
async fn test_empty_cart_never_reaches_api() {
    let api = FakeOrderApi::start().await;
    let backend = HttpOrderBackend::new(&api.api_config()).unwrap();
    let store = CartStore::new();

    let err = store.submit_order(Some(&buyer()), &backend).await.unwrap_err();

    assert!(matches!(err, CartError::EmptyCart));
    assert!(api.raw_requests().is_empty());
}

#[tokio::test]
async fn test_anonymous_checkout_never_reaches_api() {
    let api = FakeOrderApi::start().await;
    let backend = HttpOrderBackend::new(&api.api_config()).unwrap();
    let store = two_line_store();

    let err = store.submit_order(None, &backend).await.unwrap_err();

    assert!(matches!(err, CartError::NotAuthenticated));
    assert!(api.raw_requests().is_empty());
    assert_eq!(store.line_count(), 2);
}

// =============================================================================
// Order listing
// =============================================================================

#[tokio::test]
async fn test_list_orders_filters_by_buyer() {
    let api = FakeOrderApi::start().await;
    api.seed(PlacedOrder {
        id: OrderId::new(1),
        buyer_id: BuyerId::new(5),
        order_date: Utc.with_ymd_and_hms(2025, 8, 1, 9, 15, 0).unwrap(),
        status: OrderStatus::Delivered,
        total_amount: Price::from_minor_units(25500),
        lines: Vec::new(),
    });
    let backend = HttpOrderBackend::new(&api.api_config()).unwrap();

    let store = two_line_store();
    store.submit_order(Some(&buyer()), &backend).await.unwrap();

    let mine = backend.list_orders(Some(BuyerId::new(2))).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, OrderId::new(2));
    assert_eq!(mine[0].lines.len(), 2);

    let all = backend.list_orders(None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].status, OrderStatus::Delivered);
}

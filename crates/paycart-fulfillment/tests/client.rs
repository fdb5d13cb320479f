//! Integration tests for `FulfillmentClient` using wiremock HTTP mocks.

use paycart_core::{Locator, LocatorPrefix, PhysicalAddress, Recipient};
use paycart_fulfillment::{CreateOrderRequest, FulfillmentClient, FulfillmentError};
use rust_decimal::Decimal;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> FulfillmentClient {
    FulfillmentClient::with_base_url("test-key", 5, base_url)
        .expect("client construction should not fail")
        .with_retry(2, 1)
}

fn order_request() -> CreateOrderRequest {
    let recipient = Recipient {
        email: "buyer@example.com".to_owned(),
        physical_address: PhysicalAddress {
            name: "Ada Lovelace".to_owned(),
            line1: "1 Main St".to_owned(),
            line2: None,
            city: "Springfield".to_owned(),
            state: Some("IL".to_owned()),
            postal_code: "62701".to_owned(),
            country: "US".to_owned(),
        },
    };
    let locator = Locator::new(
        LocatorPrefix::Shopify,
        "https://shop.myshopify.com/products/widget:123",
    );
    CreateOrderRequest::single_item(
        recipient,
        &locator,
        "base-sepolia",
        "usdc",
        "0x1111111111111111111111111111111111111111",
    )
}

#[tokio::test]
async fn create_order_returns_parsed_order() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "clientSecret": "secret",
        "order": {
            "orderId": "ord_123",
            "phase": "payment",
            "quote": { "totalPrice": { "amount": "24.50", "currency": "usdc" } }
        }
    });

    Mock::given(method("POST"))
        .and(path("/api/2022-06-09/orders"))
        .and(header("X-API-KEY", "test-key"))
        .and(body_partial_json(serde_json::json!({
            "lineItems": [{ "productLocator": "shopify:https://shop.myshopify.com/products/widget:123" }],
            "payment": { "method": "base-sepolia", "currency": "usdc" },
            "recipient": { "email": "buyer@example.com" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let order = client
        .create_order(&order_request())
        .await
        .expect("should create order");

    assert_eq!(order.order_id, "ord_123");
    assert_eq!(order.phase, "payment");
    let total = order.total_price().expect("quote total");
    assert_eq!(total.amount, Decimal::new(2450, 2));
}

#[tokio::test]
async fn create_order_maps_provider_rejection() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/2022-06-09/orders"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({ "message": "product not available" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.create_order(&order_request()).await.unwrap_err();

    match err {
        FulfillmentError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "product not available");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn create_order_is_not_retried_on_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/2022-06-09/orders"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.create_order(&order_request()).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::Api { status: 503, .. }));
}

#[tokio::test]
async fn create_order_rejects_unexpected_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.create_order(&order_request()).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::Deserialize { .. }));
}

#[tokio::test]
async fn get_order_returns_phase() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/2022-06-09/orders/ord_123"))
        .and(header("X-API-KEY", "test-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "orderId": "ord_123", "phase": "delivery" })),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let order = client.get_order("ord_123").await.expect("should fetch order");

    assert_eq!(order.order_id, "ord_123");
    assert_eq!(order.phase, "delivery");
    assert_eq!(order.status(), None);
}

#[tokio::test]
async fn get_order_maps_404_to_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.get_order("missing").await.unwrap_err();
    assert!(matches!(err, FulfillmentError::NotFound(_)));
}

#[tokio::test]
async fn get_order_retries_server_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/2022-06-09/orders/ord_9"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/2022-06-09/orders/ord_9"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "orderId": "ord_9", "phase": "completed" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let order = client.get_order("ord_9").await.expect("should succeed after retry");
    assert_eq!(order.phase, "completed");
}

#[tokio::test]
async fn get_order_gives_up_after_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({ "error": "slow down" })))
        .expect(3)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.get_order("ord_1").await.unwrap_err();
    match err {
        FulfillmentError::Api { status, message } => {
            assert_eq!(status, 429);
            assert_eq!(message, "slow down");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

use std::sync::Arc;

use abc_orders::bus::InMemoryQueue;
use abc_orders::catalog::Catalog;
use abc_orders::config::OrderConfig;
use abc_orders::http;
use abc_orders::orders::OrderService;
use abc_orders::store::InMemoryEntityStore;
use serde_json::{json, Value};

const CATALOG: &str = r#"{
    "customers": [
        { "id": "c-1", "name": "Naledi", "surname": "Khumalo", "username": "naledi",
          "email": "naledi@example.com", "shippingAddress": "3 Loop St" }
    ],
    "products": [
        { "id": "p-1", "name": "Cast Iron Pan", "price": "899.99", "stockAvailable": 5 }
    ]
}"#;

/// Bind to port 0 and return the base URL and the queue the service publishes to.
async fn start_server() -> (String, InMemoryQueue) {
    let store = InMemoryEntityStore::new();
    Catalog::from_json(CATALOG).unwrap().seed(&store).unwrap();
    let queue = InMemoryQueue::new();
    let service = Arc::new(OrderService::new(store, queue.clone(), OrderConfig::default()));

    let app = http::router(service);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), queue)
}

async fn create(client: &reqwest::Client, base: &str, body: Value) -> reqwest::Response {
    client
        .post(format!("{base}/orders"))
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_check() {
    let (base, _) = start_server().await;

    let resp = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "ok": true }));
}

#[tokio::test]
async fn create_then_fetch() {
    let (base, queue) = start_server().await;
    let client = reqwest::Client::new();

    let resp = create(
        &client,
        &base,
        json!({ "customerId": "c-1", "productId": "p-1", "quantity": 2 }),
    )
    .await;
    assert_eq!(resp.status(), 201);

    let order: Value = resp.json().await.unwrap();
    assert_eq!(order["status"], "Submitted");
    assert_eq!(order["productName"], "Cast Iron Pan");
    assert_eq!(order["unitPrice"], "899.99");
    assert_eq!(order["totalAmount"], "1799.98");
    let id = order["id"].as_str().unwrap().to_string();

    let fetched: Value = client
        .get(format!("{base}/orders/{id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched, order);

    let mine: Value = client
        .get(format!("{base}/orders/by-customer/c-1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine.as_array().unwrap().len(), 1);

    assert_eq!(queue.event_types("order-notifications"), vec!["OrderCreated"]);
    assert_eq!(queue.event_types("stock-updates"), vec!["StockReduced"]);
}

#[tokio::test]
async fn create_rejections() {
    let (base, _) = start_server().await;
    let client = reqwest::Client::new();

    let cases = [
        (json!({ "customerId": "c-1", "productId": "p-1", "quantity": 0 }), 400, "validation_error"),
        (json!({ "customerId": "c-1", "productId": "p-1", "quantity": -4 }), 400, "validation_error"),
        (json!({ "productId": "p-1", "quantity": 1 }), 400, "validation_error"),
        (json!({ "customerId": "c-9", "productId": "p-1", "quantity": 1 }), 400, "invalid_reference"),
        (json!({ "customerId": "c-1", "productId": "p-9", "quantity": 1 }), 400, "invalid_reference"),
        (json!({ "customerId": "c-1", "productId": "p-1", "quantity": 6 }), 409, "insufficient_stock"),
    ];

    for (body, status, code) in cases {
        let resp = create(&client, &base, body.clone()).await;
        assert_eq!(resp.status(), status, "{body}");
        let error: Value = resp.json().await.unwrap();
        assert_eq!(error["error"]["code"], code, "{body}");
        assert!(error["error"]["message"].is_string());
    }

    let resp = create(
        &client,
        &base,
        json!({ "customerId": "c-1", "productId": "p-1", "quantity": 5_000_000_000_i64 }),
    )
    .await;
    assert_eq!(resp.status(), 400);
    let error: Value = resp.json().await.unwrap();
    assert_eq!(
        error["error"]["message"],
        "validation failed: quantity must be at most 4294967295"
    );

    let resp = client
        .post(format!("{base}/orders"))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn status_updates() {
    let (base, _) = start_server().await;
    let client = reqwest::Client::new();

    let order: Value = create(
        &client,
        &base,
        json!({ "customerId": "c-1", "productId": "p-1", "quantity": 1 }),
    )
    .await
    .json()
    .await
    .unwrap();
    let id = order["id"].as_str().unwrap();

    let resp = client
        .patch(format!("{base}/orders/{id}/status"))
        .json(&json!({ "status": "processing" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["status"], "Processing");

    let resp = client
        .put(format!("{base}/orders/{id}/status"))
        .json(&json!({ "status": "Submitted" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let error: Value = resp.json().await.unwrap();
    assert_eq!(error["error"]["code"], "illegal_transition");

    let resp = client
        .post(format!("{base}/orders/{id}/status"))
        .json(&json!({ "status": "Shipped" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .patch(format!("{base}/orders/nope/status"))
        .json(&json!({ "status": "Processing" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn unknown_order_is_404() {
    let (base, _) = start_server().await;

    let resp = reqwest::get(format!("{base}/orders/missing")).await.unwrap();
    assert_eq!(resp.status(), 404);
    let error: Value = resp.json().await.unwrap();
    assert_eq!(error["error"]["code"], "not_found");
}

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::harness;
use opensase_orders::api::router;

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri).header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

/// Creates a funded buyer, a merchant and one product; returns (user_id, merchant_id).
async fn seed(app: &Router) -> (String, String) {
    let (status, user) = call(app, "POST", "/api/v1/users", Some(json!({"username": "alice", "email": "alice@example.com"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let user_id = user["id"].as_str().unwrap().to_string();

    let (status, user) = call(app, "POST", &format!("/api/v1/users/{user_id}/recharge"), Some(json!({"amount": "500"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["balance"]["amount"], "500.00");

    let (status, merchant) = call(app, "POST", "/api/v1/merchants", Some(json!({"name": "Acme", "email": "shop@acme.io"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let merchant_id = merchant["id"].as_str().unwrap().to_string();

    let (status, product) = call(
        app,
        "POST",
        "/api/v1/products",
        Some(json!({"sku": "WIDGET-1", "name": "Widget", "price": "100", "stock_quantity": 10, "merchant_id": merchant_id})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(product["stock_quantity"], 10);

    (user_id, merchant_id)
}

#[tokio::test]
async fn health_reports_service_name() {
    let app = router(harness().state);
    let (status, body) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn order_lifecycle_over_http() {
    let app = router(harness().state);
    let (user_id, merchant_id) = seed(&app).await;

    let (status, order) =
        call(&app, "POST", "/api/v1/orders", Some(json!({"user_id": user_id, "items": [{"sku": "WIDGET-1", "quantity": 2}]}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "COMPLETED");
    assert_eq!(order["total_amount"]["amount"], "200.00");
    assert_eq!(order["items"][0]["unit_price"]["amount"], "100.00");
    let number = order["order_number"].as_str().unwrap();
    assert!(number.starts_with("ORD"));

    let (status, fetched) = call(&app, "GET", &format!("/api/v1/orders/{number}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], order["id"]);

    let (_, user) = call(&app, "GET", &format!("/api/v1/users/{user_id}"), None).await;
    assert_eq!(user["balance"]["amount"], "300.00");
    let (_, merchant) = call(&app, "GET", &format!("/api/v1/merchants/{merchant_id}"), None).await;
    assert_eq!(merchant["balance"]["amount"], "200.00");
    let (_, product) = call(&app, "GET", "/api/v1/products/WIDGET-1", None).await;
    assert_eq!(product["stock_quantity"], 8);

    let (status, orders) = call(&app, "GET", &format!("/api/v1/orders?merchant_id={merchant_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn failures_map_to_status_codes() {
    let app = router(harness().state);
    let (user_id, _) = seed(&app).await;

    let (status, body) =
        call(&app, "POST", "/api/v1/orders", Some(json!({"user_id": user_id, "items": [{"sku": "WIDGET-1", "quantity": 11}]}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "state_conflict");

    let (status, body) = call(&app, "POST", "/api/v1/orders", Some(json!({"user_id": user_id, "items": []}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, _) = call(&app, "GET", "/api/v1/orders", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&app, "GET", &format!("/api/v1/users/{}", uuid::Uuid::now_v7()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = call(&app, "GET", "/api/v1/orders/ORD-MISSING", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, "POST", "/api/v1/users", Some(json!({"username": "alice", "email": "again@example.com"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn settlement_endpoint_reports_outcome() {
    let app = router(harness().state);
    let (user_id, merchant_id) = seed(&app).await;
    call(&app, "POST", "/api/v1/orders", Some(json!({"user_id": user_id, "items": [{"sku": "WIDGET-1", "quantity": 1}]}))).await;

    let now = chrono::Utc::now();
    let window = json!({"start": now - chrono::Duration::hours(1), "end": now + chrono::Duration::hours(1)});
    let (status, report) = call(&app, "POST", &format!("/api/v1/settlements/{merchant_id}"), Some(window)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["outcome"], "verified");
    assert_eq!(report["order_count"], 1);
    assert_eq!(report["total_sales"]["amount"], "100.00");

    let backwards = json!({"start": now, "end": now - chrono::Duration::hours(1)});
    let (status, _) = call(&app, "POST", &format!("/api/v1/settlements/{merchant_id}"), Some(backwards)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn accounts_are_found_by_natural_key() {
    let app = router(harness().state);
    let (user_id, merchant_id) = seed(&app).await;

    let (status, user) = call(&app, "GET", "/api/v1/users?username=alice", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["id"], user_id.as_str());

    let (status, merchant) = call(&app, "GET", "/api/v1/merchants?email=SHOP%40acme.io", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(merchant["id"], merchant_id.as_str());

    let (status, _) = call(&app, "GET", "/api/v1/users?username=nobody", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, "GET", "/api/v1/merchants", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn lifecycle_and_price_administration() {
    let app = router(harness().state);
    let (user_id, merchant_id) = seed(&app).await;

    let (status, merchant) =
        call(&app, "POST", &format!("/api/v1/merchants/{merchant_id}/status"), Some(json!({"action": "suspend"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(merchant["status"], "SUSPENDED");
    call(&app, "POST", &format!("/api/v1/merchants/{merchant_id}/status"), Some(json!({"action": "activate"}))).await;

    let (status, product) = call(&app, "PUT", "/api/v1/products/WIDGET-1/price", Some(json!({"price": "80"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(product["price"]["amount"], "80.00");

    let (status, product) =
        call(&app, "POST", "/api/v1/products/WIDGET-1/status", Some(json!({"action": "deactivate"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(product["status"], "INACTIVE");
    let (status, _) =
        call(&app, "POST", "/api/v1/orders", Some(json!({"user_id": user_id, "items": [{"sku": "WIDGET-1", "quantity": 1}]}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    call(&app, "POST", "/api/v1/products/WIDGET-1/status", Some(json!({"action": "activate"}))).await;

    let (status, user) = call(&app, "POST", &format!("/api/v1/users/{user_id}/status"), Some(json!({"action": "deactivate"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["status"], "INACTIVE");
    let (status, _) = call(&app, "POST", &format!("/api/v1/users/{user_id}/status"), Some(json!({"action": "suspend"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unrepresentable_amounts_are_rejected() {
    let app = router(harness().state);
    let (user_id, merchant_id) = seed(&app).await;

    for price in ["0.001", "70000000000000000000000000000"] {
        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/products",
            Some(json!({"sku": "ODD-1", "name": "Odd", "price": price, "stock_quantity": 1, "merchant_id": merchant_id})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "price {price}");
        assert_eq!(body["error"], "validation");
    }

    let (status, _) = call(&app, "PUT", "/api/v1/products/WIDGET-1/price", Some(json!({"price": "0.004"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) =
        call(&app, "POST", &format!("/api/v1/users/{user_id}/recharge"), Some(json!({"amount": "100000000000000000"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(&app, "POST", "/api/v1/products/WIDGET-1/stock", Some(json!({"quantity": 3000000000u32}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

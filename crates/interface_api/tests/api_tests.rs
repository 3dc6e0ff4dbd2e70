//! HTTP API tests against the in-memory bill store

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use core_kernel::Money;
use domain_billing::BillingService;
use interface_api::{config::ApiConfig, create_router};
use rust_decimal_macros::dec;
use test_utils::{MoneyFixtures, SeededMockStore, TestBillRequestBuilder};

async fn app() -> (Router, SeededMockStore) {
    let seeded = SeededMockStore::new().await;
    let billing: Arc<dyn BillingService> = Arc::new(seeded.engine.clone());
    (create_router(billing, ApiConfig::default()), seeded)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_health_endpoints() {
    let (app, _) = app().await;

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/health/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_create_get_list_delete_flow() {
    let (app, seeded) = app().await;
    let lamp = seeded.lamp();

    let body = TestBillRequestBuilder::for_customer(seeded.customer_id)
        .line(lamp, 3)
        .tax(MoneyFixtures::tax())
        .discount(MoneyFixtures::discount())
        .build_json();

    let (status, created) = send(&app, Method::POST, "/api/v1/bills", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["billNumber"], "BILL-0001");
    assert_eq!(created["totalAmount"], "31.00");
    assert_eq!(seeded.store().available(lamp).await, Some(2));

    let bill_id = created["billId"].as_str().unwrap().to_string();

    let (status, detail) = send(&app, Method::GET, &format!("/api/v1/bills/{}", bill_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["billNumber"], "BILL-0001");
    assert_eq!(detail["items"].as_array().unwrap().len(), 1);
    assert_eq!(detail["items"][0]["unitPrice"], "10.00");
    assert_eq!(detail["paymentStatus"], "pending");

    let (status, list) = send(&app, Method::GET, "/api/v1/bills", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, deleted) = send(&app, Method::DELETE, &format!("/api/v1/bills/{}", bill_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["existed"], true);
    assert_eq!(deleted["restored"][0]["quantity"], 3);
    assert_eq!(seeded.store().available(lamp).await, Some(5));
}

#[tokio::test]
async fn test_insufficient_stock_reports_shortfall() {
    let (app, seeded) = app().await;

    let body = TestBillRequestBuilder::for_customer(seeded.customer_id)
        .line(seeded.lamp(), 6)
        .build_json();

    let (status, error) = send(&app, Method::POST, "/api/v1/bills", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "insufficient_stock");
    assert_eq!(error["details"]["requested"], 6);
    assert_eq!(error["details"]["available"], 5);
    assert_eq!(error["details"]["shortfall"], 1);
    assert!(seeded.store().snapshot().await.bills.is_empty());
}

#[tokio::test]
async fn test_missing_items_is_invalid_request() {
    let (app, seeded) = app().await;

    let body = TestBillRequestBuilder::for_customer(seeded.customer_id).build_json();
    let (status, error) = send(&app, Method::POST, "/api/v1/bills", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "invalid_request");
    assert!(error["details"].as_array().is_some_and(|d| !d.is_empty()));
}

#[tokio::test]
async fn test_missing_customer_is_invalid_request() {
    let (app, seeded) = app().await;

    let body = TestBillRequestBuilder::without_customer()
        .line(seeded.mug(), 1)
        .build_json();
    let (status, error) = send(&app, Method::POST, "/api/v1/bills", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "invalid_request");
}

#[tokio::test]
async fn test_oversized_unit_prices_are_rejected() {
    let (app, seeded) = app().await;

    let body = TestBillRequestBuilder::for_customer(seeded.customer_id)
        .priced_line(seeded.lamp(), 1, Money::new(dec!(50000000000000000000000000000)))
        .priced_line(seeded.mug(), 1, Money::new(dec!(50000000000000000000000000000)))
        .build_json();
    let (status, error) = send(&app, Method::POST, "/api/v1/bills", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "invalid_request");
    assert!(seeded.store().snapshot().await.bills.is_empty());
    assert_eq!(seeded.store().available(seeded.lamp()).await, Some(5));
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (app, _) = app().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/bills")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_bill_is_not_found() {
    let (app, _) = app().await;

    let (status, error) = send(&app, Method::GET, &format!("/api/v1/bills/{}", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["error"], "not_found");
}

#[tokio::test]
async fn test_delete_of_unknown_bill_succeeds() {
    let (app, _) = app().await;

    let (status, deleted) = send(&app, Method::DELETE, &format!("/api/v1/bills/{}", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["existed"], false);
}

#[tokio::test]
async fn test_invalid_bill_id_is_bad_request() {
    let (app, _) = app().await;

    let (status, error) = send(&app, Method::GET, "/api/v1/bills/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "invalid_request");
}

#[tokio::test]
async fn test_low_stock_report_uses_threshold() {
    let (app, _) = app().await;

    let (status, low) = send(&app, Method::GET, "/api/v1/stock/low", None).await;
    assert_eq!(status, StatusCode::OK);
    let codes: Vec<&str> = low
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["RUG-03"]);

    let (_, low) = send(&app, Method::GET, "/api/v1/stock/low?threshold=10", None).await;
    let codes: Vec<&str> = low
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["RUG-03", "LAMP-01"]);
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let (app, _) = app().await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert!(response.headers().contains_key("x-request-id"));
}

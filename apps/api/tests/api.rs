//! End-to-end tests driving the router against an in-memory database.

use std::collections::HashMap;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use rxdesk_api::{bootstrap_admin, build_router, ApiConfig, AppState};
use rxdesk_db::{Database, DbConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

const ADMIN_EMAIL: &str = "admin@pharmacy.test";
const ADMIN_PASSWORD: &str = "admin-password";

async fn test_app() -> Router {
    let vars: HashMap<&str, &str> = [
        ("RXDESK_JWT_SECRET", "integration-secret"),
        ("RXDESK_BOOTSTRAP_ADMIN_EMAIL", ADMIN_EMAIL),
        ("RXDESK_BOOTSTRAP_ADMIN_PASSWORD", ADMIN_PASSWORD),
    ]
    .into_iter()
    .collect();
    let config = ApiConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    assert!(bootstrap_admin(&db, &config).await.unwrap());

    build_router(AppState::new(db, config))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn login(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

async fn create_cashier(app: &Router, admin: &str, email: &str) -> String {
    let (status, _) = send(
        app,
        Method::POST,
        "/users",
        Some(admin),
        Some(json!({
            "name": "Sana",
            "email": email,
            "password": "cashier-pass",
            "role": "cashier"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    login(app, email, "cashier-pass").await
}

/// Creates a product with one batch of `quantity` units at 4.25.
async fn stock_product(app: &Router, admin: &str, quantity: i64) -> String {
    let (status, product) = send(
        app,
        Method::POST,
        "/products",
        Some(admin),
        Some(json!({ "name": "Paracetamol 500mg", "category": "Analgesics", "price": 425 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let product_id = product["id"].as_str().unwrap().to_string();

    let (status, batch) = send(
        app,
        Method::POST,
        "/batches",
        Some(admin),
        Some(json!({
            "productId": product_id,
            "supplier": "PharmaCo",
            "expiryDate": "2030-01-01",
            "quantity": quantity,
            "costPrice": 250
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(batch["batchNumber"], "B000001");

    product_id
}

#[tokio::test]
async fn test_login_and_me() {
    let app = test_app().await;
    let token = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (status, me) = send(&app, Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], ADMIN_EMAIL);
    assert_eq!(me["role"], "admin");

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": ADMIN_EMAIL, "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_missing_or_bad_token_is_unauthorized() {
    let app = test_app().await;

    let (status, body) = send(&app, Method::GET, "/products", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = send(&app, Method::GET, "/products", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_role_gates() {
    let app = test_app().await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let cashier = create_cashier(&app, &admin, "sana@pharmacy.test").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/products",
        Some(&cashier),
        Some(json!({ "name": "Ibuprofen", "category": "Analgesics", "price": 650 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _) = send(&app, Method::GET, "/sales/all", Some(&cashier), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::GET, "/payroll", Some(&cashier), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::GET, "/products", Some(&cashier), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let app = test_app().await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    create_cashier(&app, &admin, "sana@pharmacy.test").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/users",
        Some(&admin),
        Some(json!({
            "name": "Other",
            "email": "SANA@pharmacy.test",
            "password": "another-pass",
            "role": "finance"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_checkout_flow() {
    let app = test_app().await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let cashier = create_cashier(&app, &admin, "sana@pharmacy.test").await;
    let product_id = stock_product(&app, &admin, 5).await;

    // 2 x 4.25 = 8.50, paid 10.00
    let (status, receipt) = send(
        &app,
        Method::POST,
        "/checkout",
        Some(&cashier),
        Some(json!({
            "items": [{ "productId": product_id, "quantity": 2 }],
            "payment": { "type": "cash", "cashReceived": 1000 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{receipt}");
    assert_eq!(receipt["total"], 850);
    assert_eq!(receipt["change"], 150);
    let invoice = receipt["invoiceNumber"].as_str().unwrap();
    assert_eq!(invoice.len(), "YYYYMMDD-0001".len());
    assert!(invoice.ends_with("-0001"));

    let uri = format!("/products/{}", product_id);
    let (_, product) = send(&app, Method::GET, &uri, Some(&admin), None).await;
    assert_eq!(product["totalQuantity"], 3);

    let (status, body) = send(
        &app,
        Method::POST,
        "/checkout",
        Some(&cashier),
        Some(json!({
            "items": [{ "productId": product_id, "quantity": 10 }],
            "payment": { "type": "card" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");
    assert_eq!(body["details"]["productId"], product_id.as_str());
    assert_eq!(body["details"]["available"], 3);
    assert_eq!(body["details"]["shortfall"], 7);

    let (status, body) = send(
        &app,
        Method::POST,
        "/checkout",
        Some(&cashier),
        Some(json!({
            "items": [{ "productId": product_id, "quantity": 1 }],
            "payment": { "type": "cash", "cashReceived": 100 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_PAYMENT");

    let (status, mine) = send(&app, Method::GET, "/sales/my", Some(&cashier), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (status, all) = send(&app, Method::GET, "/sales/all", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_refund_restocks() {
    let app = test_app().await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let cashier = create_cashier(&app, &admin, "sana@pharmacy.test").await;
    let product_id = stock_product(&app, &admin, 5).await;

    let (_, receipt) = send(
        &app,
        Method::POST,
        "/checkout",
        Some(&cashier),
        Some(json!({
            "items": [{ "productId": product_id, "quantity": 4 }],
            "payment": { "type": "card" }
        })),
    )
    .await;
    let sale_id = receipt["saleId"].as_str().unwrap();

    let (status, refund) = send(
        &app,
        Method::POST,
        &format!("/sales/{}/refund", sale_id),
        Some(&cashier),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{refund}");
    assert_eq!(refund["total"], -1700);
    assert_eq!(refund["refundOf"], sale_id);

    let uri = format!("/products/{}", product_id);
    let (_, product) = send(&app, Method::GET, &uri, Some(&admin), None).await;
    assert_eq!(product["totalQuantity"], 5);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/sales/{}/refund", sale_id),
        Some(&cashier),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_malformed_input_is_validation_error() {
    let app = test_app().await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/products")
        .header(header::AUTHORIZATION, format!("Bearer {}", admin))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) =
        send(&app, Method::GET, "/payroll?period=2025-13", Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        Method::POST,
        "/batches",
        Some(&admin),
        Some(json!({
            "productId": "missing",
            "expiryDate": "2030-01-01",
            "quantity": -1,
            "costPrice": 0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_product_delete_cascades_to_batches() {
    let app = test_app().await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let product_id = stock_product(&app, &admin, 5).await;

    let uri = format!("/products/{}", product_id);
    let (status, _) = send(&app, Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, batches) = send(
        &app,
        Method::GET,
        &format!("/batches/product/{}", product_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(batches.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_payroll_csv_export() {
    let app = test_app().await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/employees",
        Some(&admin),
        Some(json!({
            "name": "Hina Qureshi",
            "role": "pharmacist",
            "baseSalary": 500000,
            "hireDate": "2024-01-15"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, entries) =
        send(&app, Method::GET, "/payroll?period=2025-10", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["netPay"], 500000);

    let request = Request::builder()
        .uri("/payroll/export.csv?period=2025-10")
        .header(header::AUTHORIZATION, format!("Bearer {}", admin))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some(concat!(
            "employee,role,period,base_salary,advances,deductions,",
            "net_pay,paid,paid_date,payment_method"
        ))
    );
    assert_eq!(
        lines.next(),
        Some("Hina Qureshi,pharmacist,2025-10,5000.00,0.00,0.00,5000.00,false,,")
    );
}

#[tokio::test]
async fn test_out_of_range_inputs_are_validation_errors() {
    let app = test_app().await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (status, body) =
        send(&app, Method::GET, "/alerts?days=1000000000", Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["message"].is_string());

    let (status, _) = send(&app, Method::GET, "/alerts?days=365", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::POST,
        "/products",
        Some(&admin),
        Some(json!({
            "name": "Imported biologic",
            "category": "Biologics",
            "price": i64::MAX / 10
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

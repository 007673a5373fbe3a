use std::sync::Arc;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use opensase_storefront::http::auth::{ROLE_HEADER, USER_ID_HEADER};
use opensase_storefront::http::{router, AppState};
use opensase_storefront::notify::MemoryNotifier;
use opensase_storefront::repository::MemoryStore;
use opensase_storefront::Config;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

enum Caller { Anonymous, User(Uuid), Admin }

fn app() -> (Router, Arc<MemoryNotifier>) {
    let notifier = Arc::new(MemoryNotifier::new());
    let state = AppState::new(Arc::new(MemoryStore::new()), notifier.clone(), &Config::default());
    (router(state), notifier)
}

async fn call(app: &Router, method: &str, uri: &str, caller: &Caller, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri).header("content-type", "application/json");
    match caller {
        Caller::Anonymous => {}
        Caller::User(id) => request = request.header(USER_ID_HEADER, id.to_string()),
        Caller::Admin => request = request.header(USER_ID_HEADER, Uuid::new_v4().to_string()).header(ROLE_HEADER, "admin"),
    }
    let body = body.map(|b| Body::from(serde_json::to_vec(&b).unwrap())).unwrap_or_else(Body::empty);
    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
}

fn amount(value: &Value) -> String { value.to_string().trim_matches('"').to_string() }

fn charger(stock: u32) -> Value {
    json!({
        "name": "Galaxy 25W Charger",
        "category": "Chargers",
        "price": 1500,
        "description": "USB-C fast charger",
        "images": ["https://img.example/charger.jpg"],
        "stock": stock
    })
}

fn address() -> Value {
    json!({
        "full_name": "Kamal Perera", "email": "kamal@example.com", "address": "12 Galle Rd",
        "city": "Colombo", "postal_code": "00300", "phone": "0771234567"
    })
}

async fn register(app: &Router, email: &str) -> Uuid {
    let (status, user) = call(app, "POST", "/api/v1/users", &Caller::Anonymous,
        Some(json!({ "name": "Nimal Silva", "email": email, "password": "secret1" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(user.get("password_hash").is_none());
    user["id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_cart_checkout_accept_and_ship() {
    let (app, _) = app();
    let buyer = Caller::User(register(&app, "nimal@example.com").await);

    let (status, product) = call(&app, "POST", "/api/v1/products", &Caller::Admin, Some(charger(6))).await;
    assert_eq!(status, StatusCode::CREATED);
    let product_id = product["id"].as_str().unwrap().to_string();
    assert!(product["code"].as_str().unwrap().starts_with("PID-"));

    let (status, cart) = call(&app, "POST", "/api/v1/cart", &buyer, Some(json!({ "product_id": product_id, "quantity": 2 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["item_count"], 1);

    let (status, order) = call(&app, "POST", "/api/v1/orders", &buyer,
        Some(json!({ "shipping_address": address(), "payment_method": "cash_on_delivery" }))).await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(amount(&order["total_price"]["amount"]), "3000");
    let order_id = order["id"].as_str().unwrap().to_string();
    let order_number = order["order_number"].as_str().unwrap().to_string();
    assert!(order_number.starts_with("OID-"));

    let (_, product) = call(&app, "GET", &format!("/api/v1/products/{product_id}"), &Caller::Anonymous, None).await;
    assert_eq!(product["stock"], 4);
    let (_, cart) = call(&app, "GET", "/api/v1/cart", &buyer, None).await;
    assert_eq!(cart["item_count"], 0);
    let (_, mine) = call(&app, "GET", "/api/v1/orders/mine", &buyer, None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (status, _) = call(&app, "PATCH", &format!("/api/v1/orders/{order_id}/status"), &buyer, Some(json!({ "status": "accepted" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, accepted) = call(&app, "PATCH", &format!("/api/v1/orders/{order_id}/status"), &Caller::Admin, Some(json!({ "status": "accepted" }))).await;
    assert_eq!(status, StatusCode::OK, "{accepted}");
    assert_eq!(accepted["shipment"]["order_number"], order_number.as_str());
    assert_eq!(accepted["shipment"]["status"], "accepted");
    let shipment_id = accepted["shipment"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(&app, "GET", &format!("/api/v1/orders/{order_id}"), &buyer, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
    let (status, _) = call(&app, "PATCH", &format!("/api/v1/orders/{order_id}/status"), &Caller::Admin, Some(json!({ "status": "accepted" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, shipped) = call(&app, "PATCH", &format!("/api/v1/orders/{order_id}/status"), &Caller::Admin, Some(json!({ "status": "shipped" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shipped["shipment"]["status"], "shipped");

    let (status, shipment) = call(&app, "GET", &format!("/api/v1/shipments/{shipment_id}"), &buyer, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shipment["customer_name"], "Nimal Silva");
    let (_, mine) = call(&app, "GET", "/api/v1/shipments/mine", &buyer, None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
    let (status, _) = call(&app, "GET", &format!("/api/v1/shipments/{shipment_id}"), &Caller::User(Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_order_errors_map_to_status_codes() {
    let (app, _) = app();
    let buyer = Caller::User(register(&app, "buyer@example.com").await);
    let (_, product) = call(&app, "POST", "/api/v1/products", &Caller::Admin, Some(charger(1))).await;
    let product_id = product["id"].as_str().unwrap().to_string();

    let (status, body) = call(&app, "POST", "/api/v1/orders", &buyer, Some(json!({
        "items": [{ "product_id": product_id, "quantity": 2 }],
        "shipping_address": address(),
        "payment_method": "cash_on_delivery"
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(body["message"], "Insufficient stock for product: Galaxy 25W Charger");

    let (status, body) = call(&app, "POST", "/api/v1/orders", &buyer,
        Some(json!({ "shipping_address": address(), "payment_method": "cash_on_delivery" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "empty_order");

    let (status, body) = call(&app, "POST", "/api/v1/orders", &buyer, Some(json!({
        "items": [{ "product_id": product_id, "quantity": 1 }],
        "shipping_address": { "full_name": "Kamal Perera" },
        "payment_method": "cash_on_delivery"
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing shipping address fields: email, address, city, postal_code, phone");

    let (status, order) = call(&app, "POST", "/api/v1/orders", &buyer, Some(json!({
        "items": [{ "product_id": product_id, "quantity": 1 }],
        "shipping_address": address(),
        "payment_method": "bank_transfer",
        "bank_transfer_proof": "https://img.example/slip.jpg"
    }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let order_id = order["id"].as_str().unwrap().to_string();

    let (status, body) = call(&app, "PATCH", &format!("/api/v1/orders/{order_id}/status"), &Caller::Admin, Some(json!({ "status": "teleported" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_status");
    let (status, body) = call(&app, "PATCH", &format!("/api/v1/orders/{order_id}/status"), &Caller::Admin, Some(json!({ "status": "pending" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "no_status_change");
    let (status, paid) = call(&app, "PATCH", &format!("/api/v1/orders/{order_id}/payment"), &Caller::Admin, Some(json!({ "payment_status": "completed" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["payment_status"], "completed");

    let (status, _) = call(&app, "DELETE", &format!("/api/v1/orders/{order_id}"), &Caller::Admin, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, "DELETE", &format!("/api/v1/orders/{order_id}"), &Caller::Admin, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_catalog_access_rules() {
    let (app, _) = app();
    let (status, body) = call(&app, "POST", "/api/v1/products", &Caller::Anonymous, Some(charger(5))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
    let (status, _) = call(&app, "POST", "/api/v1/products", &Caller::User(Uuid::new_v4()), Some(charger(5))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let mut laptop = charger(5);
    laptop["category"] = json!("Laptops");
    laptop["details"] = json!({ "brand": "Lenovo" });
    let (status, body) = call(&app, "POST", "/api/v1/products", &Caller::Admin, Some(laptop)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().starts_with("Missing required details for Laptops"));

    call(&app, "POST", "/api/v1/products", &Caller::Admin, Some(charger(3))).await;
    let (_, found) = call(&app, "GET", "/api/v1/products/search?q=galaxy", &Caller::Anonymous, None).await;
    assert_eq!(found.as_array().unwrap().len(), 1);
    let (_, low) = call(&app, "GET", "/api/v1/products/low-stock", &Caller::Admin, None).await;
    assert_eq!(low.as_array().unwrap().len(), 1);
    let (_, chargers) = call(&app, "GET", "/api/v1/products/category/Chargers", &Caller::Anonymous, None).await;
    assert_eq!(chargers.as_array().unwrap().len(), 1);

    let (status, health) = call(&app, "GET", "/health", &Caller::Anonymous, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn test_unreadable_bodies_are_validation_errors() {
    let (app, _) = app();
    let buyer = Caller::User(register(&app, "rukshan@example.com").await);

    let (status, body) = call(&app, "POST", "/api/v1/orders", &buyer, Some(json!({ "shipping_address": address() }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert!(body["message"].as_str().unwrap().contains("payment_method"), "{body}");

    let (status, body) = call(&app, "PATCH", &format!("/api/v1/orders/{}/status", Uuid::new_v4()), &Caller::Admin, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let request = Request::builder().method("POST").uri("/api/v1/users")
        .header("content-type", "application/json")
        .body(Body::from("{\"name\": \"Nimal\",")).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "validation_error");
}

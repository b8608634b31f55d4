mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use emart_commerce::api::{self, AppState, AuthKeys};
use common::{coupon, ADMIN, BUYER, COURIER, MANAGER};
use emart_commerce::domain::aggregates::{DeliveryChargeRule, Product, Profile, Role};
use emart_commerce::repository::Repositories;
use emart_commerce::services::{LogPublisher, LogSmsGateway};

const SECRET: &str = "test-secret";

struct TestApp {
    app: Router,
    keys: AuthKeys,
    repos: Repositories,
    product: Product,
}

impl TestApp {
    async fn new() -> Self {
        let repos = Repositories::in_memory();
        let product = Product::create("Linen shirt", Decimal::new(500, 0), 4, "shirt.png").with_category("men");
        repos.products.insert(&product).await.unwrap();
        for profile in [
            Profile::new(BUYER, "Rahim", "Dhaka").with_phone("01700000000"),
            Profile::new(MANAGER, "Manager", "Dhaka").with_role(Role::OrderManager),
            Profile::new(ADMIN, "Admin", "Dhaka").with_role(Role::Admin),
            Profile::new(COURIER, "Karim", "Dhaka").with_role(Role::DeliveryPartner),
        ] {
            repos.profiles.insert(&profile).await.unwrap();
        }
        repos.delivery_charges.upsert(&DeliveryChargeRule {
            city: "Dhaka".into(), minimum_order_limit: 1000, discounted_delivery_charge: 0, default_delivery_charge: 60,
        }).await.unwrap();

        let state = AppState::new(repos.clone(), Arc::new(LogSmsGateway), None, Arc::new(LogPublisher), AuthKeys::new(SECRET, 3600));
        let app = api::router(state, &["http://localhost:5173".to_string()]);
        Self { app, keys: AuthKeys::new(SECRET, 3600), repos, product }
    }

    async fn call(&self, method: Method, uri: &str, as_user: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(email) = as_user {
            req = req.header(header::COOKIE, format!("_et={}", self.keys.issue(email).unwrap()));
        }
        let req = match body {
            Some(b) => req.header(header::CONTENT_TYPE, "application/json").body(Body::from(b.to_string())).unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let response = self.app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }
}

#[tokio::test]
async fn test_health() {
    let t = TestApp::new().await;
    let (status, body) = t.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_missing_and_invalid_tokens() {
    let t = TestApp::new().await;
    let (status, body) = t.call(Method::GET, "/carts?email=buyer@emart.io", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Authorization header missing.");
    assert_eq!(body["error"], true);

    let req = Request::builder().uri("/carts?email=buyer@emart.io").header(header::COOKIE, "_et=garbage").body(Body::empty()).unwrap();
    let response = t.app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_jwt_sets_session_cookie() {
    let t = TestApp::new().await;
    let req = Request::builder()
        .method(Method::POST)
        .uri("/jwt")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"email": "Buyer@Emart.io"}).to_string()))
        .unwrap();
    let response = t.app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap().to_string();
    assert!(cookie.starts_with("_et="));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn test_other_users_cart_is_unauthorized() {
    let t = TestApp::new().await;
    let (status, body) = t.call(Method::GET, "/carts?email=admin@emart.io", Some("buyer@emart.io"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "unauthorized");
}

#[tokio::test]
async fn test_register_validates_email() {
    let t = TestApp::new().await;
    let (status, body) = t.call(Method::POST, "/users", None, Some(json!({"email": "nope", "name": "X", "city": "Dhaka"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "VALIDATION_ERROR");

    let (status, body) = t.call(Method::POST, "/users", None, Some(json!({"email": "buyer@emart.io", "name": "X", "city": "Dhaka"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "user already exists");
}

#[tokio::test]
async fn test_checkout_and_cancel_over_http() {
    let t = TestApp::new().await;
    let buyer = Some("buyer@emart.io");
    let product_id = t.product.id.to_string();

    let (status, _) = t.call(Method::POST, "/carts", buyer, Some(json!({"email": "buyer@emart.io", "productId": product_id, "quantity": 3}))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, preview) = t.call(Method::GET, "/checkout?email=buyer@emart.io", buyer, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["subTotal"], 1500);
    assert_eq!(preview["courierCharge"], 0);

    let (status, order) = t.call(Method::POST, "/checkout", buyer, Some(json!({"email": "buyer@emart.io"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["finalAmount"], 1500);
    assert_eq!(order["orderStatus"][0]["name"], "Payment Pending");
    assert!(order.get("otp").is_none());
    let order_id = order["id"].as_str().unwrap().to_string();

    let (status, _) = t.call(Method::GET, "/all-orders", buyer, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t.call(Method::DELETE, &format!("/cacnel-order/{order_id}"), buyer, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let manager = Some("manager@emart.io");
    let (status, cancelled) = t.call(Method::DELETE, &format!("/cacnel-order/{order_id}"), manager, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "Cancelled");

    let (status, body) = t.call(Method::DELETE, &format!("/cancel-order/{order_id}"), manager, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "CONFLICT");

    let (_, product) = t.call(Method::GET, &format!("/products/{product_id}"), None, None).await;
    assert_eq!(product["quantity"], 4);
}

#[tokio::test]
async fn test_admin_stats_requires_admin() {
    let t = TestApp::new().await;
    let (status, _) = t.call(Method::GET, "/admin-stats", Some("manager@emart.io"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, stats) = t.call(Method::GET, "/admin-stats", Some("admin@emart.io"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["users"], 4);
    assert_eq!(stats["products"], 1);
    assert_eq!(stats["totalOrders"], 0);
}

#[tokio::test]
async fn test_discount_previews_over_http() {
    let t = TestApp::new().await;
    let buyer = Some(BUYER);
    t.repos.coupons.insert(&coupon("EID10", 10, 80, 2)).await.unwrap();
    t.call(Method::POST, "/carts", buyer, Some(json!({"email": BUYER, "productId": t.product.id, "quantity": 1}))).await;

    let (status, preview) = t.call(Method::POST, "/get-discount-by-coupon", buyer, Some(json!({"email": BUYER, "coupon": "EID10"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["discount"], 50);
    assert_eq!(preview["finalAmount"], 510);
    assert_eq!(preview["discountSource"], "EID10");

    let (status, _) = t.call(Method::POST, "/get-discount-by-coupon", buyer, Some(json!({"email": BUYER, "coupon": "NOPE"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = t.call(Method::POST, "/get-discount-by-coin", buyer, Some(json!({"email": BUYER}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Not enough coin");

    t.repos.profiles.credit_coins(BUYER, 150).await.unwrap();
    let (status, preview) = t.call(Method::POST, "/get-discount-by-coin", buyer, Some(json!({"email": BUYER}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["discount"], 150);
    assert_eq!(preview["finalAmount"], 410);
    assert_eq!(preview["discountSource"], "coin");

    let (status, _) = t.call(Method::POST, "/get-discount-by-coin", Some(MANAGER), Some(json!({"email": BUYER}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_order_walks_from_payment_pending_to_delivered() {
    let t = TestApp::new().await;
    let (buyer, manager, courier) = (Some(BUYER), Some(MANAGER), Some(COURIER));
    t.call(Method::POST, "/carts", buyer, Some(json!({"email": BUYER, "productId": t.product.id, "quantity": 1}))).await;
    let (status, order) = t.call(Method::POST, "/checkout", buyer, Some(json!({"email": BUYER}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["finalAmount"], 560);
    let order_id = order["id"].as_str().unwrap().to_string();
    let order_ref = json!({"orderId": order_id});

    let (status, body) = t.call(Method::PATCH, "/payment-confirmation", buyer, Some(json!({"orderId": order_id, "method": "card"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "Payment has not been captured");
    let (status, paid) = t.call(Method::PATCH, "/payment-confirmation", buyer, Some(json!({"orderId": order_id, "method": "Cash On Delivery"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["orderStatus"][1]["name"], "Processing");

    let (status, _) = t.call(Method::PATCH, "/status-processing-to-processed", buyer, Some(order_ref.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, processed) = t.call(Method::PATCH, "/status-processing-to-processed", manager, Some(order_ref.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(processed["orderStatus"][2]["name"], "Processed And Ready to Ship");
    let (status, reverted) = t.call(Method::PATCH, "/status-back-to-processed", manager, Some(order_ref.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reverted["orderStatus"].as_array().unwrap().len(), 2);
    t.call(Method::PATCH, "/status-processing-to-processed", manager, Some(order_ref.clone())).await;

    let ship = json!({"orderId": order_id, "deliveryPartnerEmail": COURIER});
    let (status, shipped) = t.call(Method::PATCH, "/status-processed-to-shipped", manager, Some(ship)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shipped["deliveryPartner"]["email"], COURIER);

    let (status, _) = t.call(Method::PATCH, "/status-processed-to-ready-to-delivery", manager, Some(order_ref.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, dispatch) = t.call(Method::PATCH, "/status-processed-to-ready-to-delivery", courier, Some(order_ref.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dispatch["notified"], true);
    assert_eq!(dispatch["order"]["orderStatus"][4]["name"], "Ready To Delivery");
    assert!(dispatch["order"].get("otp").is_none());

    let (status, resent) = t.call(Method::POST, "/resend-otp", courier, Some(order_ref.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resent["notified"], true);

    let id = order_id.parse().unwrap();
    let otp = t.repos.orders.get(id).await.unwrap().unwrap().otp().unwrap().as_str().to_string();
    let (status, body) = t.call(Method::PATCH, "/status-to-delivered", courier, Some(json!({"orderId": order_id, "otp": "wrong"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "Wrong OTP");

    let (status, delivered) = t.call(Method::PATCH, "/status-to-delivered", courier, Some(json!({"orderId": order_id, "otp": otp}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(delivered["status"], "Delivered");
    assert_eq!(delivered["orderStatus"][5]["name"], "Delivered");
    assert_eq!(t.repos.profiles.get(BUYER).await.unwrap().unwrap().coin, 5);

    let (status, _) = t.call(Method::POST, "/resend-otp", courier, Some(order_ref)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_products_page_by_category_and_list_categories() {
    let t = TestApp::new().await;
    for i in 0..3 {
        t.repos.products.insert(&Product::create(format!("Mug {i}"), Decimal::new(300, 0), 5, "mug.png").with_category("home")).await.unwrap();
    }

    let (status, page) = t.call(Method::GET, "/products?category=home&page=2&per_page=2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 3);
    assert_eq!(page["page"], 2);
    assert_eq!(page["data"].as_array().unwrap().len(), 1);

    let (_, page) = t.call(Method::GET, "/products", None, None).await;
    assert_eq!(page["total"], 4);
    assert_eq!(page["page"], 1);

    let (status, categories) = t.call(Method::GET, "/categories", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(categories, json!([{"name": "home", "products": 3}, {"name": "men", "products": 1}]));
}

#[tokio::test]
async fn test_create_product_caps_price_and_stock() {
    let t = TestApp::new().await;
    let admin = Some(ADMIN);
    let product = |price: &str, quantity: i64| json!({"name": "Gold", "price": price, "quantity": quantity, "image": "g.png"});

    let (status, _) = t.call(Method::POST, "/products", admin, Some(product("99999999999", 1))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = t.call(Method::POST, "/products", admin, Some(product("10", 5_000_000))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, created) = t.call(Method::POST, "/products", admin, Some(product("10", 5))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["quantity"], 5);
}

#[tokio::test]
async fn test_wishlist_over_http() {
    let t = TestApp::new().await;
    let buyer = Some(BUYER);
    let entry = json!({"email": BUYER, "productId": t.product.id});

    let (status, items) = t.call(Method::POST, "/wishlists", buyer, Some(entry.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(items[0]["productId"], t.product.id.to_string());
    let (status, items) = t.call(Method::POST, "/wishlists", buyer, Some(entry)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(items.as_array().unwrap().len(), 1);

    let (status, _) = t.call(Method::GET, &format!("/wishlists?email={ADMIN}"), buyer, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = t.call(Method::POST, "/wishlists", buyer, Some(json!({"email": BUYER, "productId": uuid::Uuid::new_v4()}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = t.call(Method::POST, &format!("/wishlists/{}/cart", t.product.id), buyer, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, items) = t.call(Method::GET, &format!("/wishlists?email={BUYER}"), buyer, None).await;
    assert_eq!(items, json!([]));
    let (_, cart) = t.call(Method::GET, &format!("/carts?email={BUYER}"), buyer, None).await;
    assert_eq!(cart[0]["quantity"], 1);

    let (status, _) = t.call(Method::DELETE, &format!("/wishlists/{}", t.product.id), buyer, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

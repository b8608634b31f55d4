//! HTTP surface: router, shared state, auth extraction and error mapping.

use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, patch, post};
use axum::Router;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::repository::Repositories;
use crate::services::{CheckoutService, EventPublisher, FulfillmentService, PaymentGateway, SmsGateway};

pub mod auth;
pub mod error;
pub mod handlers;

pub use auth::{AuthKeys, AuthUser};

#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub checkout: Arc<CheckoutService>,
    pub fulfillment: Arc<FulfillmentService>,
    pub auth: Arc<AuthKeys>,
}

impl AppState {
    pub fn new(
        repos: Repositories,
        sms: Arc<dyn SmsGateway>,
        payments: Option<Arc<dyn PaymentGateway>>,
        events: Arc<dyn EventPublisher>,
        auth: AuthKeys,
    ) -> Self {
        let checkout = Arc::new(CheckoutService::new(repos.clone(), events.clone()));
        let fulfillment = Arc::new(FulfillmentService::new(repos.clone(), sms, payments, events));
        Self { repos, checkout, fulfillment, auth: Arc::new(auth) }
    }
}

pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    use crate::api::handlers::{admin, cart, catalog, checkout, orders, pricing, session, users, wishlist};

    Router::new()
        .route("/", get(session::root))
        .route("/health", get(session::health))
        .route("/jwt", post(session::issue_token).delete(session::clear_token))
        // users
        .route("/users", get(users::list_users).post(users::register))
        .route("/users/admin/:email", get(users::is_admin))
        .route("/users/:email/role", patch(users::set_role))
        .route("/profile", get(users::profile))
        // catalog
        .route("/products", get(catalog::list_products).post(catalog::create_product))
        .route("/products/:id", get(catalog::get_product))
        .route("/categories", get(catalog::list_categories))
        // cart
        .route("/carts", get(cart::get_cart).post(cart::add_to_cart))
        .route("/carts/check", patch(cart::set_checked))
        .route("/carts/quantity", patch(cart::set_quantity))
        .route("/carts/:product_id", delete(cart::remove_item))
        // wishlist
        .route("/wishlists", get(wishlist::get_wishlist).post(wishlist::add_to_wishlist))
        .route("/wishlists/:product_id", delete(wishlist::remove_from_wishlist))
        .route("/wishlists/:product_id/cart", post(wishlist::move_to_cart))
        // pricing
        .route("/delivery-charge", get(pricing::delivery_charge))
        .route("/delivery-charges", get(pricing::list_delivery_charges).post(pricing::upsert_delivery_charge))
        .route("/coupons", get(pricing::list_coupons).post(pricing::create_coupon))
        .route("/get-discount-by-coupon", post(pricing::discount_by_coupon))
        .route("/get-discount-by-coin", post(pricing::discount_by_coin))
        // checkout & payment
        .route("/checkout", get(checkout::preview).post(checkout::place_order))
        .route("/create-payment-intent", post(checkout::create_payment_intent))
        .route("/payment-confirmation", patch(checkout::confirm_payment))
        // orders
        .route("/orders", get(orders::my_orders))
        .route("/orders/:id", get(orders::get_order))
        .route("/all-orders", get(orders::all_orders))
        .route("/delivery-orders", get(orders::delivery_orders))
        .route("/status-processing-to-processed", patch(orders::mark_processed))
        .route("/status-back-to-processed", patch(orders::revert_to_processing))
        .route("/status-processed-to-shipped", patch(orders::ship))
        .route("/status-processed-to-ready-to-delivery", patch(orders::ready_to_deliver))
        .route("/status-to-delivered", patch(orders::deliver))
        .route("/resend-otp", post(orders::resend_otp))
        .route("/cacnel-order/:id", delete(orders::cancel))
        .route("/cancel-order/:id", delete(orders::cancel))
        .route("/admin-stats", get(admin::stats))
        .layer(TraceLayer::new_for_http())
        .layer(cors(cors_origins))
        .with_state(state)
}

fn cors(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => { tracing::warn!(origin = %o, "ignoring invalid CORS origin"); None }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

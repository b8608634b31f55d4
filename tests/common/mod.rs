//! Shared fixtures: an in-memory store seeded with a small catalog and one
//! profile per role.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use emart_commerce::domain::aggregates::{Coupon, DeliveryChargeRule, Order, Product, Profile, Role};
use emart_commerce::repository::{
    CategorySummary, MemoryStore, OrderRepository, OrderStats, ProductFilter, ProductPage, ProductRepository,
    ProfileRepository, Repositories, StockDelta,
};
use emart_commerce::services::{
    CheckoutService, FulfillmentService, IntentDetails, IntentStatus, LogPublisher, PaymentGateway, PaymentIntent, SmsGateway,
};
use emart_commerce::{EcommerceError, Result};

pub const BUYER: &str = "buyer@emart.io";
pub const ADMIN: &str = "admin@emart.io";
pub const MANAGER: &str = "manager@emart.io";
pub const COURIER: &str = "courier@emart.io";
pub const OTHER_COURIER: &str = "courier2@emart.io";
pub const BUYER_PHONE: &str = "01700000000";

/// Captures outgoing texts; can be switched into a failing mode.
#[derive(Default)]
pub struct RecordingSms {
    pub sent: Mutex<Vec<(String, String)>>,
    pub failing: AtomicBool,
}

impl RecordingSms {
    pub fn fail(&self, on: bool) { self.failing.store(on, Ordering::SeqCst); }
    pub fn last(&self) -> Option<(String, String)> { self.sent.lock().unwrap().last().cloned() }
    pub fn count(&self) -> usize { self.sent.lock().unwrap().len() }
}

#[async_trait]
impl SmsGateway for RecordingSms {
    async fn send(&self, phone: &str, message: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EcommerceError::Gateway("sms provider unavailable".into()));
        }
        self.sent.lock().unwrap().push((phone.to_string(), message.to_string()));
        Ok(())
    }
}

pub struct Shop {
    pub repos: Repositories,
    pub checkout: CheckoutService,
    pub fulfillment: FulfillmentService,
    pub sms: Arc<RecordingSms>,
    pub shirt: Uuid,
    pub mug: Uuid,
}

impl Shop {
    pub async fn new() -> Self { Self::with_repos(Repositories::in_memory()).await }

    pub async fn with_repos(repos: Repositories) -> Self { Self::build(repos, None).await }

    pub async fn with_gateway(gateway: Arc<FakeGateway>) -> Self { Self::build(Repositories::in_memory(), Some(gateway)).await }

    async fn build(repos: Repositories, payments: Option<Arc<FakeGateway>>) -> Self {
        let sms = Arc::new(RecordingSms::default());
        let events = Arc::new(LogPublisher);
        let checkout = CheckoutService::new(repos.clone(), events.clone());
        let payments = payments.map(|g| g as Arc<dyn PaymentGateway>);
        let fulfillment = FulfillmentService::new(repos.clone(), sms.clone(), payments, events);

        let shirt = Product::create("Linen shirt", Decimal::new(500, 0), 10, "shirt.png").with_category("men");
        let mug = Product::create("Clay mug", Decimal::new(300, 0), 5, "mug.png");
        repos.products.insert(&shirt).await.unwrap();
        repos.products.insert(&mug).await.unwrap();

        for profile in [
            Profile::new(BUYER, "Rahim", "Dhaka").with_phone(BUYER_PHONE).with_address("12 Lake Road"),
            Profile::new(ADMIN, "Admin", "Dhaka").with_role(Role::Admin),
            Profile::new(MANAGER, "Manager", "Dhaka").with_role(Role::OrderManager),
            Profile::new(COURIER, "Karim", "Dhaka").with_role(Role::DeliveryPartner).with_phone("01800000000"),
            Profile::new(OTHER_COURIER, "Jamal", "Dhaka").with_role(Role::DeliveryPartner),
        ] {
            repos.profiles.insert(&profile).await.unwrap();
        }
        repos.delivery_charges.upsert(&DeliveryChargeRule {
            city: "Dhaka".into(), minimum_order_limit: 1000, discounted_delivery_charge: 0, default_delivery_charge: 60,
        }).await.unwrap();

        Self { repos, checkout, fulfillment, sms, shirt: shirt.id, mug: mug.id }
    }

    pub async fn profile(&self, email: &str) -> Profile {
        self.repos.profiles.get(email).await.unwrap().unwrap()
    }

    pub async fn stock(&self, id: Uuid) -> i64 {
        self.repos.products.get(id).await.unwrap().unwrap().quantity
    }

    pub async fn set_coins(&self, email: &str, coins: i64) {
        self.repos.profiles.credit_coins(email, coins).await.unwrap();
    }
}

/// Payment gateway holding intents in memory. `create_intent` records a
/// pending intent; tests then settle or tamper with it.
#[derive(Default)]
pub struct FakeGateway {
    pub intents: Mutex<HashMap<String, IntentDetails>>,
}

impl FakeGateway {
    pub fn put(&self, id: &str, status: IntentStatus, amount_minor: i64, order_id: Option<Uuid>) {
        let details = IntentDetails { status, amount_minor, order_id: order_id.map(|id| id.to_string()) };
        self.intents.lock().unwrap().insert(id.to_string(), details);
    }

    pub fn settle(&self, id: &str) {
        if let Some(intent) = self.intents.lock().unwrap().get_mut(id) { intent.status = IntentStatus::Succeeded; }
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_intent(&self, amount_minor: i64, order_id: &str) -> Result<PaymentIntent> {
        let mut intents = self.intents.lock().unwrap();
        let id = format!("pi_{}", intents.len() + 1);
        intents.insert(id.clone(), IntentDetails { status: IntentStatus::Pending, amount_minor, order_id: Some(order_id.to_string()) });
        Ok(PaymentIntent { client_secret: format!("{id}_secret"), id })
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<IntentDetails> {
        self.intents.lock().unwrap().get(intent_id).cloned().ok_or_else(|| EcommerceError::Gateway("no such intent".into()))
    }
}

pub fn coupon(code: &str, percentage: i64, cap: i64, uses: i32) -> Coupon {
    Coupon {
        coupon_code: code.into(), percentage: Decimal::from(percentage), maximum_discount_limit: cap, number_of_use: uses,
        start_date: Utc::now() - Duration::days(1), end_date: Utc::now() + Duration::days(7),
    }
}

/// Switches that make individual store writes fail.
#[derive(Default)]
pub struct Faults {
    pub stock: AtomicBool,
    pub credit: AtomicBool,
    pub replace: AtomicBool,
}

impl Faults {
    pub fn set(flag: &AtomicBool, on: bool) { flag.store(on, Ordering::SeqCst); }
}

fn injected(what: &str) -> EcommerceError { EcommerceError::Internal(format!("injected {what} failure")) }

/// Memory store wrapper whose stock, coin-credit and order-replace writes
/// can be made to fail on demand.
pub struct FaultyStore {
    pub store: Arc<MemoryStore>,
    pub faults: Arc<Faults>,
}

impl FaultyStore {
    /// Repositories backed by one memory store, with orders, products and
    /// profiles routed through the fault switches.
    pub fn repositories(faults: Arc<Faults>) -> Repositories {
        let store = Arc::new(MemoryStore::default());
        let faulty = Arc::new(FaultyStore { store: store.clone(), faults });
        Repositories {
            orders: faulty.clone(),
            products: faulty.clone(),
            profiles: faulty,
            carts: store.clone(),
            coupons: store.clone(),
            delivery_charges: store.clone(),
            wishlists: store,
        }
    }
}

#[async_trait]
impl OrderRepository for FaultyStore {
    async fn insert(&self, order: &Order) -> Result<()> { OrderRepository::insert(&*self.store, order).await }
    async fn get(&self, id: Uuid) -> Result<Option<Order>> { OrderRepository::get(&*self.store, id).await }
    async fn replace(&self, order: &Order) -> Result<Order> {
        if self.faults.replace.load(Ordering::SeqCst) { return Err(injected("order write")); }
        OrderRepository::replace(&*self.store, order).await
    }
    async fn list_by_user(&self, email: &str) -> Result<Vec<Order>> { self.store.list_by_user(email).await }
    async fn list_by_delivery_partner(&self, email: &str) -> Result<Vec<Order>> { self.store.list_by_delivery_partner(email).await }
    async fn list_all(&self) -> Result<Vec<Order>> { self.store.list_all().await }
    async fn stats(&self) -> Result<OrderStats> { self.store.stats().await }
}

#[async_trait]
impl ProductRepository for FaultyStore {
    async fn insert(&self, product: &Product) -> Result<()> { ProductRepository::insert(&*self.store, product).await }
    async fn get(&self, id: Uuid) -> Result<Option<Product>> { ProductRepository::get(&*self.store, id).await }
    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Product>> { self.store.get_many(ids).await }
    async fn list(&self, filter: &ProductFilter) -> Result<ProductPage> { ProductRepository::list(&*self.store, filter).await }
    async fn count(&self) -> Result<i64> { ProductRepository::count(&*self.store).await }
    async fn categories(&self) -> Result<Vec<CategorySummary>> { self.store.categories().await }
    async fn apply_stock_deltas(&self, deltas: &[StockDelta]) -> Result<()> {
        if self.faults.stock.load(Ordering::SeqCst) { return Err(injected("stock")); }
        self.store.apply_stock_deltas(deltas).await
    }
}

#[async_trait]
impl ProfileRepository for FaultyStore {
    async fn insert(&self, profile: &Profile) -> Result<bool> { ProfileRepository::insert(&*self.store, profile).await }
    async fn get(&self, email: &str) -> Result<Option<Profile>> { ProfileRepository::get(&*self.store, email).await }
    async fn list(&self) -> Result<Vec<Profile>> { ProfileRepository::list(&*self.store).await }
    async fn count(&self) -> Result<i64> { ProfileRepository::count(&*self.store).await }
    async fn set_role(&self, email: &str, role: Role) -> Result<bool> { self.store.set_role(email, role).await }
    async fn credit_coins(&self, email: &str, amount: i64) -> Result<()> {
        if self.faults.credit.load(Ordering::SeqCst) { return Err(injected("coin credit")); }
        self.store.credit_coins(email, amount).await
    }
    async fn debit_coins(&self, email: &str, amount: i64) -> Result<bool> { self.store.debit_coins(email, amount).await }
    async fn record_coupon_use(&self, email: &str, code: &str, limit: i32) -> Result<bool> {
        self.store.record_coupon_use(email, code, limit).await
    }
    async fn release_coupon_use(&self, email: &str, code: &str) -> Result<()> { self.store.release_coupon_use(email, code).await }
}

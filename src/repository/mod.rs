//! Repository contracts for each stored entity.
//!
//! Every method is a single atomic operation against the store. Services
//! never read-modify-write a shared counter; they call the conditional or
//! delta operations below instead.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, Coupon, DeliveryChargeRule, Order, Product, Profile, Role, Wishlist};
use crate::Result;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Signed change to one product's stock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StockDelta { pub product_id: Uuid, pub delta: i64 }

/// Catalog query: optional category and name search, one page at a time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    /// 1-based.
    pub page: u32,
    pub per_page: u32,
}

impl Default for ProductFilter {
    fn default() -> Self { Self { category: None, search: None, page: 1, per_page: Self::DEFAULT_PER_PAGE } }
}

impl ProductFilter {
    pub const DEFAULT_PER_PAGE: u32 = 20;
    pub const MAX_PER_PAGE: u32 = 100;

    /// Clamps paging input and drops blank filters.
    pub fn new(category: Option<String>, search: Option<String>, page: Option<u32>, per_page: Option<u32>) -> Self {
        let blank_to_none = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            category: blank_to_none(category),
            search: blank_to_none(search),
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(Self::DEFAULT_PER_PAGE).clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn limit(&self) -> i64 { i64::from(self.per_page) }
    pub fn offset(&self) -> i64 { i64::from(self.page - 1) * i64::from(self.per_page) }

    /// Category compares case-insensitively; search is a case-insensitive
    /// substring of the name.
    pub fn matches(&self, product: &Product) -> bool {
        let category_ok = match (&self.category, &product.category) {
            (None, _) => true,
            (Some(wanted), Some(actual)) => wanted.eq_ignore_ascii_case(actual),
            (Some(_), None) => false,
        };
        let search_ok = self.search.as_ref().map_or(true, |s| product.name.to_lowercase().contains(&s.to_lowercase()));
        category_ok && search_ok
    }
}

/// One page of products plus the number matching the filter overall.
#[derive(Clone, Debug, Default)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub name: String,
    pub products: i64,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total_orders: i64,
    pub active_orders: i64,
    pub delivered_orders: i64,
    pub cancelled_orders: i64,
    /// Sum of `finalAmount` over delivered orders.
    pub revenue: i64,
    /// Active orders grouped by current stage name.
    pub by_stage: BTreeMap<String, i64>,
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert(&self, order: &Order) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Order>>;
    /// Compare-and-swap on `order.version()`. Returns the stored order with
    /// its bumped version, or `Conflict` if another write got there first.
    async fn replace(&self, order: &Order) -> Result<Order>;
    async fn list_by_user(&self, email: &str) -> Result<Vec<Order>>;
    async fn list_by_delivery_partner(&self, email: &str) -> Result<Vec<Order>>;
    async fn list_all(&self) -> Result<Vec<Order>>;
    async fn stats(&self) -> Result<OrderStats>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn insert(&self, product: &Product) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Product>>;
    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Product>>;
    /// Newest first.
    async fn list(&self, filter: &ProductFilter) -> Result<ProductPage>;
    async fn count(&self) -> Result<i64>;
    /// Distinct categories with their product counts, by name.
    async fn categories(&self) -> Result<Vec<CategorySummary>>;
    /// Applies every delta or none. `NotFound` if any product is missing.
    async fn apply_stock_deltas(&self, deltas: &[StockDelta]) -> Result<()>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Returns `false` if a profile with that email already exists.
    async fn insert(&self, profile: &Profile) -> Result<bool>;
    async fn get(&self, email: &str) -> Result<Option<Profile>>;
    async fn list(&self) -> Result<Vec<Profile>>;
    async fn count(&self) -> Result<i64>;
    async fn set_role(&self, email: &str, role: Role) -> Result<bool>;
    async fn credit_coins(&self, email: &str, amount: i64) -> Result<()>;
    /// Debits only if the balance covers `amount`; returns whether it did.
    async fn debit_coins(&self, email: &str, amount: i64) -> Result<bool>;
    /// Appends `code` to the usage history only while its count is below
    /// `limit`; returns whether it did.
    async fn record_coupon_use(&self, email: &str, code: &str, limit: i32) -> Result<bool>;
    /// Removes one occurrence of `code` from the usage history.
    async fn release_coupon_use(&self, email: &str, code: &str) -> Result<()>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn get(&self, email: &str) -> Result<Cart>;
    async fn add_item(&self, email: &str, product_id: Uuid, quantity: i64) -> Result<()>;
    async fn set_checked(&self, email: &str, product_id: Uuid, checked: bool) -> Result<bool>;
    async fn set_quantity(&self, email: &str, product_id: Uuid, quantity: i64) -> Result<bool>;
    async fn remove_item(&self, email: &str, product_id: Uuid) -> Result<bool>;
    async fn remove_checked(&self, email: &str, product_ids: &[Uuid]) -> Result<()>;
}

#[async_trait]
pub trait CouponRepository: Send + Sync {
    async fn insert(&self, coupon: &Coupon) -> Result<bool>;
    async fn get(&self, code: &str) -> Result<Option<Coupon>>;
    async fn list(&self) -> Result<Vec<Coupon>>;
}

#[async_trait]
pub trait DeliveryChargeRepository: Send + Sync {
    async fn upsert(&self, rule: &DeliveryChargeRule) -> Result<()>;
    async fn get(&self, city: &str) -> Result<Option<DeliveryChargeRule>>;
    async fn list(&self) -> Result<Vec<DeliveryChargeRule>>;
}

#[async_trait]
pub trait WishlistRepository: Send + Sync {
    async fn get(&self, email: &str) -> Result<Wishlist>;
    /// Returns `false` if the product was already saved.
    async fn add(&self, email: &str, product_id: Uuid) -> Result<bool>;
    async fn remove(&self, email: &str, product_id: Uuid) -> Result<bool>;
}

/// The full set of repositories injected into services and handlers.
#[derive(Clone)]
pub struct Repositories {
    pub orders: Arc<dyn OrderRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub coupons: Arc<dyn CouponRepository>,
    pub delivery_charges: Arc<dyn DeliveryChargeRepository>,
    pub wishlists: Arc<dyn WishlistRepository>,
}

impl Repositories {
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self::from_store(store)
    }

    pub fn in_memory() -> Self { Self::from_store(Arc::new(MemoryStore::default())) }

    fn from_store<S>(store: Arc<S>) -> Self
    where
        S: OrderRepository + ProductRepository + ProfileRepository + CartRepository + CouponRepository
            + DeliveryChargeRepository + WishlistRepository + 'static,
    {
        Self {
            orders: store.clone(), products: store.clone(), profiles: store.clone(), carts: store.clone(),
            coupons: store.clone(), delivery_charges: store.clone(), wishlists: store,
        }
    }
}

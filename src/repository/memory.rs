//! In-memory repository implementations.
//!
//! One `RwLock` guards every collection, so each repository call is atomic
//! in the same way a single statement is against Postgres. Used by the test
//! suites and for running the service without a database.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, Coupon, DeliveryChargeRule, Order, OrderStatus, Product, Profile, Role, Wishlist};
use crate::repository::{
    CartRepository, CategorySummary, CouponRepository, DeliveryChargeRepository, OrderRepository, OrderStats, ProductFilter,
    ProductPage, ProductRepository, ProfileRepository, StockDelta, WishlistRepository,
};
use crate::{EcommerceError, Result};

#[derive(Default)]
struct Collections {
    orders: HashMap<Uuid, Order>,
    products: HashMap<Uuid, Product>,
    profiles: HashMap<String, Profile>,
    carts: HashMap<String, Cart>,
    coupons: HashMap<String, Coupon>,
    delivery_charges: HashMap<String, DeliveryChargeRule>,
    wishlists: HashMap<String, Wishlist>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

fn sorted_orders<'a>(orders: impl Iterator<Item = &'a Order>) -> Vec<Order> {
    let mut out: Vec<Order> = orders.cloned().collect();
    out.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    out
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.orders.contains_key(&order.id()) {
            return Err(EcommerceError::conflict(format!("Order {} already exists", order.id())));
        }
        // pending events belong to the caller, not to the stored copy
        let mut stored = order.clone();
        stored.take_events();
        inner.orders.insert(order.id(), stored);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.inner.read().await.orders.get(&id).cloned())
    }

    async fn replace(&self, order: &Order) -> Result<Order> {
        let mut inner = self.inner.write().await;
        let stored = inner.orders.get_mut(&order.id()).ok_or_else(|| EcommerceError::not_found("Order not found"))?;
        if stored.version() != order.version() {
            return Err(EcommerceError::conflict("Order was modified concurrently, retry"));
        }
        let mut next = order.clone();
        next.take_events();
        next.set_version(order.version() + 1);
        *stored = next.clone();
        Ok(next)
    }

    async fn list_by_user(&self, email: &str) -> Result<Vec<Order>> {
        Ok(sorted_orders(self.inner.read().await.orders.values().filter(|o| o.user_email() == email)))
    }

    async fn list_by_delivery_partner(&self, email: &str) -> Result<Vec<Order>> {
        Ok(sorted_orders(self.inner.read().await.orders.values().filter(|o| o.is_assigned_to(email))))
    }

    async fn list_all(&self) -> Result<Vec<Order>> {
        Ok(sorted_orders(self.inner.read().await.orders.values()))
    }

    async fn stats(&self) -> Result<OrderStats> {
        let inner = self.inner.read().await;
        let mut stats = OrderStats::default();
        for order in inner.orders.values() {
            stats.total_orders += 1;
            match order.status() {
                OrderStatus::Active => {
                    stats.active_orders += 1;
                    *stats.by_stage.entry(order.current_stage().to_string()).or_default() += 1;
                }
                OrderStatus::Delivered => {
                    stats.delivered_orders += 1;
                    stats.revenue += order.final_amount();
                }
                OrderStatus::Cancelled => stats.cancelled_orders += 1,
            }
        }
        Ok(stats)
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn insert(&self, product: &Product) -> Result<()> {
        self.inner.write().await.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.inner.read().await.products.get(&id).cloned())
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
        let inner = self.inner.read().await;
        Ok(ids.iter().filter_map(|id| inner.products.get(id).cloned()).collect())
    }

    async fn list(&self, filter: &ProductFilter) -> Result<ProductPage> {
        let mut matching: Vec<Product> = self.inner.read().await.products.values().filter(|p| filter.matches(p)).cloned().collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matching.len() as i64;
        let products = matching.into_iter().skip(filter.offset() as usize).take(filter.limit() as usize).collect();
        Ok(ProductPage { products, total })
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.inner.read().await.products.len() as i64)
    }

    async fn categories(&self) -> Result<Vec<CategorySummary>> {
        let inner = self.inner.read().await;
        let mut counts: BTreeMap<&str, i64> = BTreeMap::new();
        for category in inner.products.values().filter_map(|p| p.category.as_deref()) {
            *counts.entry(category).or_default() += 1;
        }
        Ok(counts.into_iter().map(|(name, products)| CategorySummary { name: name.to_string(), products }).collect())
    }

    async fn apply_stock_deltas(&self, deltas: &[StockDelta]) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(missing) = deltas.iter().find(|d| !inner.products.contains_key(&d.product_id)) {
            return Err(EcommerceError::not_found(format!("Product {} not found", missing.product_id)));
        }
        for d in deltas {
            if let Some(product) = inner.products.get_mut(&d.product_id) {
                product.adjust_stock(d.delta);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for MemoryStore {
    async fn insert(&self, profile: &Profile) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if inner.profiles.contains_key(&profile.email) { return Ok(false); }
        inner.profiles.insert(profile.email.clone(), profile.clone());
        Ok(true)
    }

    async fn get(&self, email: &str) -> Result<Option<Profile>> {
        Ok(self.inner.read().await.profiles.get(email).cloned())
    }

    async fn list(&self) -> Result<Vec<Profile>> {
        let mut out: Vec<Profile> = self.inner.read().await.profiles.values().cloned().collect();
        out.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(out)
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.inner.read().await.profiles.len() as i64)
    }

    async fn set_role(&self, email: &str, role: Role) -> Result<bool> {
        Ok(self.inner.write().await.profiles.get_mut(email).map(|p| p.role = role).is_some())
    }

    async fn credit_coins(&self, email: &str, amount: i64) -> Result<()> {
        let mut inner = self.inner.write().await;
        let profile = inner.profiles.get_mut(email).ok_or_else(|| EcommerceError::not_found("Profile not found"))?;
        profile.coin += amount;
        Ok(())
    }

    async fn debit_coins(&self, email: &str, amount: i64) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner.profiles.get_mut(email) {
            Some(p) if p.coin >= amount => { p.coin -= amount; Ok(true) }
            _ => Ok(false),
        }
    }

    async fn record_coupon_use(&self, email: &str, code: &str, limit: i32) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let Some(profile) = inner.profiles.get_mut(email) else { return Ok(false) };
        let used = profile.coupon.iter().filter(|c| *c == code).count();
        if used >= usize::try_from(limit).unwrap_or(0) { return Ok(false); }
        profile.coupon.push(code.to_string());
        Ok(true)
    }

    async fn release_coupon_use(&self, email: &str, code: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(profile) = inner.profiles.get_mut(email) {
            if let Some(pos) = profile.coupon.iter().rposition(|c| c == code) {
                profile.coupon.remove(pos);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn get(&self, email: &str) -> Result<Cart> {
        Ok(self.inner.read().await.carts.get(email).cloned().unwrap_or_else(|| Cart::new(email)))
    }

    async fn add_item(&self, email: &str, product_id: Uuid, quantity: i64) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.carts.entry(email.to_string()).or_insert_with(|| Cart::new(email)).add_item(product_id, quantity);
        Ok(())
    }

    async fn set_checked(&self, email: &str, product_id: Uuid, checked: bool) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.carts.get_mut(email).is_some_and(|c| c.set_checked(product_id, checked).is_ok()))
    }

    async fn set_quantity(&self, email: &str, product_id: Uuid, quantity: i64) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.carts.get_mut(email).is_some_and(|c| c.update_quantity(product_id, quantity).is_ok()))
    }

    async fn remove_item(&self, email: &str, product_id: Uuid) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.carts.get_mut(email).is_some_and(|c| c.remove_item(product_id).is_ok()))
    }

    async fn remove_checked(&self, email: &str, product_ids: &[Uuid]) -> Result<()> {
        if let Some(cart) = self.inner.write().await.carts.get_mut(email) {
            cart.remove_checked(product_ids);
        }
        Ok(())
    }
}

#[async_trait]
impl CouponRepository for MemoryStore {
    async fn insert(&self, coupon: &Coupon) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if inner.coupons.contains_key(&coupon.coupon_code) { return Ok(false); }
        inner.coupons.insert(coupon.coupon_code.clone(), coupon.clone());
        Ok(true)
    }

    async fn get(&self, code: &str) -> Result<Option<Coupon>> {
        Ok(self.inner.read().await.coupons.get(code).cloned())
    }

    async fn list(&self) -> Result<Vec<Coupon>> {
        Ok(self.inner.read().await.coupons.values().cloned().collect())
    }
}

#[async_trait]
impl DeliveryChargeRepository for MemoryStore {
    async fn upsert(&self, rule: &DeliveryChargeRule) -> Result<()> {
        self.inner.write().await.delivery_charges.insert(rule.city.to_lowercase(), rule.clone());
        Ok(())
    }

    async fn get(&self, city: &str) -> Result<Option<DeliveryChargeRule>> {
        Ok(self.inner.read().await.delivery_charges.get(&city.to_lowercase()).cloned())
    }

    async fn list(&self) -> Result<Vec<DeliveryChargeRule>> {
        Ok(self.inner.read().await.delivery_charges.values().cloned().collect())
    }
}

#[async_trait]
impl WishlistRepository for MemoryStore {
    async fn get(&self, email: &str) -> Result<Wishlist> {
        Ok(self.inner.read().await.wishlists.get(email).cloned().unwrap_or_else(|| Wishlist::new(email)))
    }

    async fn add(&self, email: &str, product_id: Uuid) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.wishlists.entry(email.to_string()).or_insert_with(|| Wishlist::new(email)).add(product_id))
    }

    async fn remove(&self, email: &str, product_id: Uuid) -> Result<bool> {
        Ok(self.inner.write().await.wishlists.get_mut(email).map_or(false, |w| w.remove(product_id)))
    }
}

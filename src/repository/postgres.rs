//! Postgres-backed repositories.
//!
//! Counters (stock, coins, coupon usage) are only ever changed with
//! server-side expressions so concurrent requests cannot lose updates.
//! Orders are stored as JSONB documents guarded by a version column.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartItem, Coupon, DeliveryChargeRule, Order, Product, Profile, Role, Wishlist, WishlistItem};
use crate::repository::{
    CartRepository, CategorySummary, CouponRepository, DeliveryChargeRepository, OrderRepository, OrderStats, ProductFilter,
    ProductPage, ProductRepository, ProfileRepository, StockDelta, WishlistRepository,
};
use crate::{EcommerceError, Result};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

// =============================================================================
// Orders
// =============================================================================

#[derive(sqlx::FromRow)]
struct OrderRow { document: Json<Order>, otp: Option<String>, version: i64 }

impl From<OrderRow> for Order {
    fn from(r: OrderRow) -> Self { r.document.0.with_storage_fields(r.otp, r.version) }
}

const ORDER_COLUMNS: &str = "document, otp, version";

#[async_trait]
impl OrderRepository for PgStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        sqlx::query("INSERT INTO orders (id, user_email, delivery_partner_email, status, stage, final_amount, document, otp, version, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())")
            .bind(order.id()).bind(order.user_email()).bind(order.delivery_partner().map(|p| p.email.as_str()))
            .bind(order.status().as_str()).bind(order.current_stage().as_str()).bind(order.final_amount())
            .bind(Json(order)).bind(order.otp().map(|o| o.as_str())).bind(order.version()).bind(order.created_at())
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(Order::from))
    }

    async fn replace(&self, order: &Order) -> Result<Order> {
        let result = sqlx::query("UPDATE orders SET delivery_partner_email = $3, status = $4, stage = $5, final_amount = $6, document = $7, otp = $8, version = version + 1, updated_at = NOW() WHERE id = $1 AND version = $2")
            .bind(order.id()).bind(order.version()).bind(order.delivery_partner().map(|p| p.email.as_str()))
            .bind(order.status().as_str()).bind(order.current_stage().as_str()).bind(order.final_amount())
            .bind(Json(order)).bind(order.otp().map(|o| o.as_str()))
            .execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return match OrderRepository::get(self, order.id()).await? {
                Some(_) => Err(EcommerceError::conflict("Order was modified concurrently, retry")),
                None => Err(EcommerceError::not_found("Order not found")),
            };
        }
        let mut stored = order.clone();
        stored.set_version(order.version() + 1);
        Ok(stored)
    }

    async fn list_by_user(&self, email: &str) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE user_email = $1 ORDER BY created_at DESC"))
            .bind(email).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn list_by_delivery_partner(&self, email: &str) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE delivery_partner_email = $1 ORDER BY created_at DESC"))
            .bind(email).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn list_all(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"))
            .fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn stats(&self) -> Result<OrderStats> {
        let (total_orders, active_orders, delivered_orders, cancelled_orders, revenue): (i64, i64, i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE status = 'Active'), COUNT(*) FILTER (WHERE status = 'Delivered'), COUNT(*) FILTER (WHERE status = 'Cancelled'), COALESCE(SUM(final_amount) FILTER (WHERE status = 'Delivered'), 0)::BIGINT FROM orders",
        ).fetch_one(&self.pool).await?;
        let by_stage: Vec<(String, i64)> = sqlx::query_as("SELECT stage, COUNT(*) FROM orders WHERE status = 'Active' GROUP BY stage")
            .fetch_all(&self.pool).await?;
        Ok(OrderStats { total_orders, active_orders, delivered_orders, cancelled_orders, revenue, by_stage: by_stage.into_iter().collect() })
    }
}

// =============================================================================
// Products
// =============================================================================

#[async_trait]
impl ProductRepository for PgStore {
    async fn insert(&self, p: &Product) -> Result<()> {
        sqlx::query("INSERT INTO products (id, name, description, price, quantity, image, category, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)")
            .bind(p.id).bind(&p.name).bind(&p.description).bind(p.price).bind(p.quantity).bind(&p.image).bind(&p.category)
            .bind(p.created_at).bind(p.updated_at)
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(&self.pool).await?)
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
        Ok(sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1)").bind(ids).fetch_all(&self.pool).await?)
    }

    async fn list(&self, filter: &ProductFilter) -> Result<ProductPage> {
        const MATCHING: &str = "WHERE ($1::TEXT IS NULL OR lower(category) = lower($1)) AND ($2::TEXT IS NULL OR name ILIKE '%' || $2 || '%')";
        let products = sqlx::query_as::<_, Product>(&format!("SELECT * FROM products {MATCHING} ORDER BY created_at DESC LIMIT $3 OFFSET $4"))
            .bind(&filter.category).bind(&filter.search).bind(filter.limit()).bind(filter.offset())
            .fetch_all(&self.pool).await?;
        let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM products {MATCHING}"))
            .bind(&filter.category).bind(&filter.search)
            .fetch_one(&self.pool).await?;
        Ok(ProductPage { products, total })
    }

    async fn count(&self) -> Result<i64> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products").fetch_one(&self.pool).await?;
        Ok(n)
    }

    async fn categories(&self) -> Result<Vec<CategorySummary>> {
        Ok(sqlx::query_as::<_, CategorySummary>("SELECT category AS name, COUNT(*) AS products FROM products WHERE category IS NOT NULL GROUP BY category ORDER BY category")
            .fetch_all(&self.pool).await?)
    }

    async fn apply_stock_deltas(&self, deltas: &[StockDelta]) -> Result<()> {
        // fixed lock order across concurrent orders
        let mut sorted = deltas.to_vec();
        sorted.sort_by_key(|d| d.product_id);

        let mut tx = self.pool.begin().await?;
        for d in &sorted {
            let result = sqlx::query("UPDATE products SET quantity = quantity + $2, updated_at = NOW() WHERE id = $1")
                .bind(d.product_id).bind(d.delta)
                .execute(&mut *tx).await?;
            if result.rows_affected() == 0 {
                tx.rollback().await?;
                return Err(EcommerceError::not_found(format!("Product {} not found", d.product_id)));
            }
        }
        tx.commit().await?;
        Ok(())
    }
}

// =============================================================================
// Profiles
// =============================================================================

#[derive(sqlx::FromRow)]
struct ProfileRow {
    email: String, name: String, phone: Option<String>, address: String, city: String, role: String,
    coin: i64, coupon: Vec<String>, created_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = EcommerceError;
    fn try_from(r: ProfileRow) -> Result<Self> {
        let role = r.role.parse::<Role>().map_err(EcommerceError::Internal)?;
        Ok(Profile { email: r.email, name: r.name, phone: r.phone, address: r.address, city: r.city, role, coin: r.coin, coupon: r.coupon, created_at: r.created_at })
    }
}

#[async_trait]
impl ProfileRepository for PgStore {
    async fn insert(&self, p: &Profile) -> Result<bool> {
        let result = sqlx::query("INSERT INTO profiles (email, name, phone, address, city, role, coin, coupon, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) ON CONFLICT (email) DO NOTHING")
            .bind(&p.email).bind(&p.name).bind(&p.phone).bind(&p.address).bind(&p.city).bind(p.role.as_str())
            .bind(p.coin).bind(&p.coupon).bind(p.created_at)
            .execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn get(&self, email: &str) -> Result<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE email = $1").bind(email).fetch_optional(&self.pool).await?;
        row.map(Profile::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<Profile>> {
        let rows = sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles ORDER BY email").fetch_all(&self.pool).await?;
        rows.into_iter().map(Profile::try_from).collect()
    }

    async fn count(&self) -> Result<i64> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM profiles").fetch_one(&self.pool).await?;
        Ok(n)
    }

    async fn set_role(&self, email: &str, role: Role) -> Result<bool> {
        let result = sqlx::query("UPDATE profiles SET role = $2 WHERE email = $1").bind(email).bind(role.as_str()).execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn credit_coins(&self, email: &str, amount: i64) -> Result<()> {
        let result = sqlx::query("UPDATE profiles SET coin = coin + $2 WHERE email = $1").bind(email).bind(amount).execute(&self.pool).await?;
        if result.rows_affected() == 0 { return Err(EcommerceError::not_found("Profile not found")); }
        Ok(())
    }

    async fn debit_coins(&self, email: &str, amount: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE profiles SET coin = coin - $2 WHERE email = $1 AND coin >= $2").bind(email).bind(amount).execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn record_coupon_use(&self, email: &str, code: &str, limit: i32) -> Result<bool> {
        let result = sqlx::query("UPDATE profiles SET coupon = array_append(coupon, $2::text) WHERE email = $1 AND cardinality(array_positions(coupon, $2::text)) < $3")
            .bind(email).bind(code).bind(limit)
            .execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn release_coupon_use(&self, email: &str, code: &str) -> Result<()> {
        sqlx::query("UPDATE profiles SET coupon = coupon[:array_position(coupon, $2::text) - 1] || coupon[array_position(coupon, $2::text) + 1:] WHERE email = $1 AND $2::text = ANY(coupon)")
            .bind(email).bind(code)
            .execute(&self.pool).await?;
        Ok(())
    }
}

// =============================================================================
// Carts
// =============================================================================

#[async_trait]
impl CartRepository for PgStore {
    async fn get(&self, email: &str) -> Result<Cart> {
        let items = sqlx::query_as::<_, CartItem>("SELECT product_id, quantity, checked, added_at FROM cart_items WHERE email = $1 ORDER BY added_at")
            .bind(email).fetch_all(&self.pool).await?;
        Ok(Cart { email: email.to_string(), items })
    }

    async fn add_item(&self, email: &str, product_id: Uuid, quantity: i64) -> Result<()> {
        sqlx::query("INSERT INTO cart_items (email, product_id, quantity, checked, added_at) VALUES ($1, $2, $3, TRUE, NOW()) ON CONFLICT (email, product_id) DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity")
            .bind(email).bind(product_id).bind(quantity)
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn set_checked(&self, email: &str, product_id: Uuid, checked: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE cart_items SET checked = $3 WHERE email = $1 AND product_id = $2")
            .bind(email).bind(product_id).bind(checked).execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_quantity(&self, email: &str, product_id: Uuid, quantity: i64) -> Result<bool> {
        let result = if quantity <= 0 {
            sqlx::query("DELETE FROM cart_items WHERE email = $1 AND product_id = $2").bind(email).bind(product_id).execute(&self.pool).await?
        } else {
            sqlx::query("UPDATE cart_items SET quantity = $3 WHERE email = $1 AND product_id = $2").bind(email).bind(product_id).bind(quantity).execute(&self.pool).await?
        };
        Ok(result.rows_affected() == 1)
    }

    async fn remove_item(&self, email: &str, product_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE email = $1 AND product_id = $2").bind(email).bind(product_id).execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove_checked(&self, email: &str, product_ids: &[Uuid]) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE email = $1 AND checked AND product_id = ANY($2)")
            .bind(email).bind(product_ids).execute(&self.pool).await?;
        Ok(())
    }
}

// =============================================================================
// Coupons & delivery charges
// =============================================================================

#[async_trait]
impl CouponRepository for PgStore {
    async fn insert(&self, c: &Coupon) -> Result<bool> {
        let result = sqlx::query("INSERT INTO coupons (coupon_code, percentage, maximum_discount_limit, number_of_use, start_date, end_date) VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (coupon_code) DO NOTHING")
            .bind(&c.coupon_code).bind(c.percentage).bind(c.maximum_discount_limit).bind(c.number_of_use).bind(c.start_date).bind(c.end_date)
            .execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn get(&self, code: &str) -> Result<Option<Coupon>> {
        Ok(sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE coupon_code = $1").bind(code).fetch_optional(&self.pool).await?)
    }

    async fn list(&self) -> Result<Vec<Coupon>> {
        Ok(sqlx::query_as::<_, Coupon>("SELECT * FROM coupons ORDER BY end_date DESC").fetch_all(&self.pool).await?)
    }
}

#[async_trait]
impl DeliveryChargeRepository for PgStore {
    async fn upsert(&self, r: &DeliveryChargeRule) -> Result<()> {
        sqlx::query("INSERT INTO delivery_charges (city, minimum_order_limit, discounted_delivery_charge, default_delivery_charge) VALUES ($1, $2, $3, $4) ON CONFLICT ((lower(city))) DO UPDATE SET minimum_order_limit = EXCLUDED.minimum_order_limit, discounted_delivery_charge = EXCLUDED.discounted_delivery_charge, default_delivery_charge = EXCLUDED.default_delivery_charge")
            .bind(&r.city).bind(r.minimum_order_limit).bind(r.discounted_delivery_charge).bind(r.default_delivery_charge)
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn get(&self, city: &str) -> Result<Option<DeliveryChargeRule>> {
        Ok(sqlx::query_as::<_, DeliveryChargeRule>("SELECT * FROM delivery_charges WHERE lower(city) = lower($1)").bind(city).fetch_optional(&self.pool).await?)
    }

    async fn list(&self) -> Result<Vec<DeliveryChargeRule>> {
        Ok(sqlx::query_as::<_, DeliveryChargeRule>("SELECT * FROM delivery_charges ORDER BY city").fetch_all(&self.pool).await?)
    }
}

// =============================================================================
// Wishlists
// =============================================================================

#[async_trait]
impl WishlistRepository for PgStore {
    async fn get(&self, email: &str) -> Result<Wishlist> {
        let items = sqlx::query_as::<_, WishlistItem>("SELECT product_id, added_at FROM wishlist_items WHERE email = $1 ORDER BY added_at")
            .bind(email).fetch_all(&self.pool).await?;
        Ok(Wishlist { email: email.to_string(), items })
    }

    async fn add(&self, email: &str, product_id: Uuid) -> Result<bool> {
        let result = sqlx::query("INSERT INTO wishlist_items (email, product_id, added_at) VALUES ($1, $2, NOW()) ON CONFLICT (email, product_id) DO NOTHING")
            .bind(email).bind(product_id).execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove(&self, email: &str, product_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM wishlist_items WHERE email = $1 AND product_id = $2")
            .bind(email).bind(product_id).execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }
}

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use crate::api::{AppState, AuthUser};
use crate::domain::aggregates::{Coupon, DeliveryChargeRule, Role};
use crate::services::CheckoutPreview;
use crate::{EcommerceError, Result};

#[derive(Debug, Deserialize)]
pub struct CityQuery {
    pub city: String,
}

pub async fn delivery_charge(State(s): State<AppState>, Query(q): Query<CityQuery>) -> Result<Json<DeliveryChargeRule>> {
    s.repos.delivery_charges.get(q.city.trim()).await?
        .map(Json)
        .ok_or_else(|| EcommerceError::not_found(format!("No delivery charge set for {}", q.city.trim())))
}

pub async fn list_delivery_charges(State(s): State<AppState>) -> Result<Json<Vec<DeliveryChargeRule>>> {
    Ok(Json(s.repos.delivery_charges.list().await?))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryChargeRequest {
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(range(min = 0))]
    pub minimum_order_limit: i64,
    #[validate(range(min = 0))]
    pub discounted_delivery_charge: i64,
    #[validate(range(min = 0))]
    pub default_delivery_charge: i64,
}

pub async fn upsert_delivery_charge(State(s): State<AppState>, user: AuthUser, Json(r): Json<DeliveryChargeRequest>) -> Result<Json<DeliveryChargeRule>> {
    user.require_admin(&s.repos).await?;
    r.validate()?;
    let rule = DeliveryChargeRule {
        city: r.city.trim().to_string(),
        minimum_order_limit: r.minimum_order_limit,
        discounted_delivery_charge: r.discounted_delivery_charge,
        default_delivery_charge: r.default_delivery_charge,
    };
    s.repos.delivery_charges.upsert(&rule).await?;
    tracing::info!(city = %rule.city, "delivery charge updated");
    Ok(Json(rule))
}

pub async fn list_coupons(State(s): State<AppState>, user: AuthUser) -> Result<Json<Vec<Coupon>>> {
    user.require_role(&s.repos, &[Role::Admin, Role::OrderManager]).await?;
    Ok(Json(s.repos.coupons.list().await?))
}

fn check_coupon(c: &Coupon) -> Result<()> {
    if c.coupon_code.trim().is_empty() {
        return Err(EcommerceError::Validation("couponCode: must not be empty".into()));
    }
    if c.percentage <= Decimal::ZERO || c.percentage > Decimal::ONE_HUNDRED {
        return Err(EcommerceError::Validation("percentage: must be within (0, 100]".into()));
    }
    if c.maximum_discount_limit < 0 || c.number_of_use < 1 {
        return Err(EcommerceError::Validation("limits: must be positive".into()));
    }
    if c.end_date < c.start_date {
        return Err(EcommerceError::Validation("end_Date: must not precede start_Date".into()));
    }
    Ok(())
}

pub async fn create_coupon(State(s): State<AppState>, user: AuthUser, Json(mut coupon): Json<Coupon>) -> Result<(StatusCode, Json<Coupon>)> {
    user.require_admin(&s.repos).await?;
    coupon.coupon_code = coupon.coupon_code.trim().to_string();
    check_coupon(&coupon)?;
    if !s.repos.coupons.insert(&coupon).await? {
        return Err(EcommerceError::conflict("Coupon already exists"));
    }
    tracing::info!(code = %coupon.coupon_code, "coupon created");
    Ok((StatusCode::CREATED, Json(coupon)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CouponDiscountRequest {
    pub email: String,
    #[validate(length(min = 1))]
    pub coupon: String,
}

pub async fn discount_by_coupon(State(s): State<AppState>, user: AuthUser, Json(r): Json<CouponDiscountRequest>) -> Result<Json<CheckoutPreview>> {
    r.validate()?;
    Ok(Json(s.checkout.coupon_preview(&user.email, &r.email.trim().to_lowercase(), &r.coupon).await?))
}

#[derive(Debug, Deserialize)]
pub struct CoinDiscountRequest {
    pub email: String,
}

pub async fn discount_by_coin(State(s): State<AppState>, user: AuthUser, Json(r): Json<CoinDiscountRequest>) -> Result<Json<CheckoutPreview>> {
    Ok(Json(s.checkout.coin_preview(&user.email, &r.email.trim().to_lowercase()).await?))
}

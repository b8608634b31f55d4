use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{EmailQuery, OrderRef};
use crate::api::{AppState, AuthUser};
use crate::domain::aggregates::{Order, Role};
use crate::services::OtpDispatch;
use crate::{EcommerceError, Result};

const ORDER_STAFF: &[Role] = &[Role::Admin, Role::OrderManager];

pub async fn my_orders(State(s): State<AppState>, user: AuthUser, Query(q): Query<EmailQuery>) -> Result<Json<Vec<Order>>> {
    let email = q.email.unwrap_or_else(|| user.email.clone()).trim().to_lowercase();
    if user.ensure_self(&email).is_err() {
        user.require_role(&s.repos, ORDER_STAFF).await?;
    }
    Ok(Json(s.repos.orders.list_by_user(&email).await?))
}

/// Visible to the purchaser, order staff, and the assigned delivery partner.
pub async fn get_order(State(s): State<AppState>, user: AuthUser, Path(id): Path<Uuid>) -> Result<Json<Order>> {
    let order = s.repos.orders.get(id).await?.ok_or_else(|| EcommerceError::not_found("Order not found"))?;
    if order.user_email() != user.email && !order.is_assigned_to(&user.email) {
        user.require_role(&s.repos, ORDER_STAFF).await?;
    }
    Ok(Json(order))
}

pub async fn all_orders(State(s): State<AppState>, user: AuthUser) -> Result<Json<Vec<Order>>> {
    user.require_role(&s.repos, ORDER_STAFF).await?;
    Ok(Json(s.repos.orders.list_all().await?))
}

pub async fn delivery_orders(State(s): State<AppState>, user: AuthUser) -> Result<Json<Vec<Order>>> {
    user.require_role(&s.repos, &[Role::DeliveryPartner]).await?;
    Ok(Json(s.repos.orders.list_by_delivery_partner(&user.email).await?))
}

pub async fn mark_processed(State(s): State<AppState>, user: AuthUser, Json(r): Json<OrderRef>) -> Result<Json<Order>> {
    let actor = user.profile(&s.repos).await?;
    Ok(Json(s.fulfillment.mark_processed(&actor, r.order_id).await?))
}

pub async fn revert_to_processing(State(s): State<AppState>, user: AuthUser, Json(r): Json<OrderRef>) -> Result<Json<Order>> {
    let actor = user.profile(&s.repos).await?;
    Ok(Json(s.fulfillment.revert_to_processing(&actor, r.order_id).await?))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShipRequest {
    pub order_id: Uuid,
    #[validate(email)]
    pub delivery_partner_email: String,
}

pub async fn ship(State(s): State<AppState>, user: AuthUser, Json(r): Json<ShipRequest>) -> Result<Json<Order>> {
    r.validate()?;
    let actor = user.profile(&s.repos).await?;
    let partner = r.delivery_partner_email.trim().to_lowercase();
    Ok(Json(s.fulfillment.ship(&actor, r.order_id, &partner).await?))
}

pub async fn ready_to_deliver(State(s): State<AppState>, user: AuthUser, Json(r): Json<OrderRef>) -> Result<Json<OtpDispatch>> {
    let actor = user.profile(&s.repos).await?;
    Ok(Json(s.fulfillment.issue_delivery_otp(&actor, r.order_id).await?))
}

pub async fn resend_otp(State(s): State<AppState>, user: AuthUser, Json(r): Json<OrderRef>) -> Result<Json<OtpDispatch>> {
    let actor = user.profile(&s.repos).await?;
    Ok(Json(s.fulfillment.resend_otp(&actor, r.order_id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverRequest {
    pub order_id: Uuid,
    pub otp: String,
}

pub async fn deliver(State(s): State<AppState>, user: AuthUser, Json(r): Json<DeliverRequest>) -> Result<Json<Order>> {
    let actor = user.profile(&s.repos).await?;
    Ok(Json(s.fulfillment.deliver(&actor, r.order_id, &r.otp).await?))
}

pub async fn cancel(State(s): State<AppState>, user: AuthUser, Path(id): Path<Uuid>) -> Result<Json<Order>> {
    user.require_role(&s.repos, ORDER_STAFF).await?;
    Ok(Json(s.checkout.cancel_order(id).await?))
}

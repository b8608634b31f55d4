use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::{AppState, AuthUser};
use crate::domain::aggregates::Order;
use crate::domain::pricing::DiscountSelector;
use crate::services::payment::PaymentIntent;
use crate::services::CheckoutPreview;
use crate::Result;

#[derive(Debug, Deserialize)]
pub struct CheckoutQuery {
    pub email: String,
    /// `coin`, a coupon code, or absent.
    pub discount: Option<String>,
}

pub async fn preview(State(s): State<AppState>, user: AuthUser, Query(q): Query<CheckoutQuery>) -> Result<Json<CheckoutPreview>> {
    let selector = DiscountSelector::parse(q.discount.as_deref());
    Ok(Json(s.checkout.preview(&user.email, &q.email.trim().to_lowercase(), &selector).await?))
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub email: String,
    pub discount: Option<String>,
}

pub async fn place_order(State(s): State<AppState>, user: AuthUser, Json(r): Json<PlaceOrderRequest>) -> Result<(StatusCode, Json<Order>)> {
    let selector = DiscountSelector::parse(r.discount.as_deref());
    let order = s.checkout.place_order(&user.email, &r.email.trim().to_lowercase(), &selector).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentRequest {
    pub order_id: Uuid,
}

pub async fn create_payment_intent(State(s): State<AppState>, user: AuthUser, Json(r): Json<PaymentIntentRequest>) -> Result<Json<PaymentIntent>> {
    let actor = user.profile(&s.repos).await?;
    Ok(Json(s.fulfillment.create_payment_intent(&actor, r.order_id).await?))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    pub order_id: Uuid,
    #[validate(length(min = 1, max = 64))]
    pub method: String,
    pub payment_intent_id: Option<String>,
}

pub async fn confirm_payment(State(s): State<AppState>, user: AuthUser, Json(r): Json<PaymentConfirmation>) -> Result<Json<Order>> {
    r.validate()?;
    let actor = user.profile(&s.repos).await?;
    Ok(Json(s.fulfillment.confirm_payment(&actor, r.order_id, r.method, r.payment_intent_id).await?))
}

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::EmailQuery;
use crate::api::{AppState, AuthUser};
use crate::domain::aggregates::{CartError, CartItem};
use crate::{EcommerceError, Result};

fn missing_line() -> EcommerceError { EcommerceError::not_found(CartError::ItemNotFound.to_string()) }

pub async fn get_cart(State(s): State<AppState>, user: AuthUser, Query(q): Query<EmailQuery>) -> Result<Json<Vec<CartItem>>> {
    let Some(email) = q.email else { return Ok(Json(vec![])) };
    user.ensure_self(&email)?;
    Ok(Json(s.repos.carts.get(&user.email).await?.items))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub email: String,
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 1000))]
    pub quantity: i64,
}

pub async fn add_to_cart(State(s): State<AppState>, user: AuthUser, Json(r): Json<AddToCartRequest>) -> Result<(StatusCode, Json<Vec<CartItem>>)> {
    r.validate()?;
    user.ensure_self(&r.email)?;
    if s.repos.products.get(r.product_id).await?.is_none() {
        return Err(EcommerceError::not_found("Product not found"));
    }
    s.repos.carts.add_item(&user.email, r.product_id, r.quantity).await?;
    Ok((StatusCode::CREATED, Json(s.repos.carts.get(&user.email).await?.items)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    pub email: String,
    pub product_id: Uuid,
    pub checked: bool,
}

pub async fn set_checked(State(s): State<AppState>, user: AuthUser, Json(r): Json<CheckRequest>) -> Result<Json<Vec<CartItem>>> {
    user.ensure_self(&r.email)?;
    if !s.repos.carts.set_checked(&user.email, r.product_id, r.checked).await? {
        return Err(missing_line());
    }
    Ok(Json(s.repos.carts.get(&user.email).await?.items))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuantityRequest {
    pub email: String,
    pub product_id: Uuid,
    /// Zero or less drops the line.
    #[validate(range(max = 1000))]
    pub quantity: i64,
}

pub async fn set_quantity(State(s): State<AppState>, user: AuthUser, Json(r): Json<QuantityRequest>) -> Result<Json<Vec<CartItem>>> {
    r.validate()?;
    user.ensure_self(&r.email)?;
    if !s.repos.carts.set_quantity(&user.email, r.product_id, r.quantity).await? {
        return Err(missing_line());
    }
    Ok(Json(s.repos.carts.get(&user.email).await?.items))
}

pub async fn remove_item(State(s): State<AppState>, user: AuthUser, Path(product_id): Path<Uuid>, Query(q): Query<EmailQuery>) -> Result<StatusCode> {
    if let Some(email) = &q.email { user.ensure_self(email)?; }
    if !s.repos.carts.remove_item(&user.email, product_id).await? {
        return Err(missing_line());
    }
    Ok(StatusCode::NO_CONTENT)
}

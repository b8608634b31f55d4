use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::EmailQuery;
use crate::api::{AppState, AuthUser};
use crate::domain::aggregates::WishlistItem;
use crate::{EcommerceError, Result};

pub async fn get_wishlist(State(s): State<AppState>, user: AuthUser, Query(q): Query<EmailQuery>) -> Result<Json<Vec<WishlistItem>>> {
    if let Some(email) = &q.email { user.ensure_self(email)?; }
    Ok(Json(s.repos.wishlists.get(&user.email).await?.items))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistRequest {
    pub email: String,
    pub product_id: Uuid,
}

/// 201 when saved, 200 when the product was already on the list.
pub async fn add_to_wishlist(State(s): State<AppState>, user: AuthUser, Json(r): Json<WishlistRequest>) -> Result<(StatusCode, Json<Vec<WishlistItem>>)> {
    user.ensure_self(&r.email)?;
    if s.repos.products.get(r.product_id).await?.is_none() {
        return Err(EcommerceError::not_found("Product not found"));
    }
    let created = s.repos.wishlists.add(&user.email, r.product_id).await?;
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(s.repos.wishlists.get(&user.email).await?.items)))
}

pub async fn remove_from_wishlist(State(s): State<AppState>, user: AuthUser, Path(product_id): Path<Uuid>, Query(q): Query<EmailQuery>) -> Result<StatusCode> {
    if let Some(email) = &q.email { user.ensure_self(email)?; }
    if !s.repos.wishlists.remove(&user.email, product_id).await? {
        return Err(EcommerceError::not_found("Product is not on the wishlist"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Moves a saved product into the cart as one checked unit.
pub async fn move_to_cart(State(s): State<AppState>, user: AuthUser, Path(product_id): Path<Uuid>, Query(q): Query<EmailQuery>) -> Result<StatusCode> {
    if let Some(email) = &q.email { user.ensure_self(email)?; }
    if !s.repos.wishlists.get(&user.email).await?.contains(product_id) {
        return Err(EcommerceError::not_found("Product is not on the wishlist"));
    }
    if s.repos.products.get(product_id).await?.is_none() {
        return Err(EcommerceError::not_found("Product not found"));
    }
    s.repos.carts.add_item(&user.email, product_id, 1).await?;
    s.repos.wishlists.remove(&user.email, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

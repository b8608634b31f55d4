use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::api::{AppState, AuthUser};
use crate::domain::aggregates::Product;
use crate::repository::{CategorySummary, ProductFilter};
use crate::{EcommerceError, Result};

/// Highest unit price accepted for a new product.
pub const MAX_UNIT_PRICE: i64 = 10_000_000;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub category: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}

pub async fn list_products(State(s): State<AppState>, Query(p): Query<ListParams>) -> Result<Json<PaginatedResponse<Product>>> {
    let filter = ProductFilter::new(p.category, p.search, p.page, p.per_page);
    let page = s.repos.products.list(&filter).await?;
    Ok(Json(PaginatedResponse { data: page.products, total: page.total, page: filter.page }))
}

pub async fn list_categories(State(s): State<AppState>) -> Result<Json<Vec<CategorySummary>>> {
    Ok(Json(s.repos.products.categories().await?))
}

pub async fn get_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Product>> {
    s.repos.products.get(id).await?.map(Json).ok_or_else(|| EcommerceError::not_found("Product not found"))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    #[validate(range(min = 0, max = 1_000_000))]
    pub quantity: i64,
    #[validate(length(min = 1))]
    pub image: String,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
}

pub async fn create_product(State(s): State<AppState>, user: AuthUser, Json(r): Json<CreateProductRequest>) -> Result<(StatusCode, Json<Product>)> {
    user.require_admin(&s.repos).await?;
    r.validate()?;
    if r.price.is_sign_negative() || r.price > Decimal::from(MAX_UNIT_PRICE) {
        return Err(EcommerceError::Validation(format!("price: must be between 0 and {MAX_UNIT_PRICE}")));
    }
    let mut product = Product::create(r.name, r.price, r.quantity, r.image);
    if let Some(description) = r.description { product = product.with_description(description); }
    if let Some(category) = r.category { product = product.with_category(category.trim()); }
    s.repos.products.insert(&product).await?;
    tracing::info!(product_id = %product.id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

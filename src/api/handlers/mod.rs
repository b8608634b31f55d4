//! Route handlers, grouped by resource.

use serde::Deserialize;
use uuid::Uuid;

pub mod admin;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod pricing;
pub mod session;
pub mod users;
pub mod wishlist;

/// `?email=` query parameter.
#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

/// Body naming the order a transition applies to.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRef {
    pub order_id: Uuid,
}

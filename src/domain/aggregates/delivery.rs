//! Delivery charge rules, one per city.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryChargeRule {
    pub city: String,
    pub minimum_order_limit: i64,
    pub discounted_delivery_charge: i64,
    pub default_delivery_charge: i64,
}

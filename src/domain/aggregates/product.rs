//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    /// Units in stock. Signed: concurrent checkouts may oversell.
    pub quantity: i64,
    pub image: String,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn create(name: impl Into<String>, price: Decimal, quantity: i64, image: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), name: name.into(), description: String::new(), price, quantity,
            image: image.into(), category: None, created_at: now, updated_at: now,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self { self.category = Some(category.into()); self }
    pub fn with_description(mut self, description: impl Into<String>) -> Self { self.description = description.into(); self }

    pub fn is_in_stock(&self) -> bool { self.quantity > 0 }

    /// How many of `requested` units can actually be sold right now.
    pub fn sellable(&self, requested: i64) -> i64 { requested.min(self.quantity).max(0) }

    pub fn adjust_stock(&mut self, delta: i64) {
        self.quantity += delta;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_product_create() {
        let p = Product::create("Test Product", Decimal::new(1999, 2), 3, "img.png");
        assert_eq!(p.name, "Test Product");
        assert!(p.is_in_stock());
    }
    #[test]
    fn test_sellable_clamps_to_stock() {
        let mut p = Product::create("P", Decimal::new(10, 0), 2, "");
        assert_eq!(p.sellable(5), 2);
        assert_eq!(p.sellable(1), 1);
        p.adjust_stock(-2);
        assert_eq!(p.sellable(1), 0);
        assert!(!p.is_in_stock());
        p.adjust_stock(-1);
        assert_eq!(p.sellable(3), 0);
    }
}

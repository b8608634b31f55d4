//! Wishlist Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wishlist {
    pub email: String,
    pub items: Vec<WishlistItem>,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub product_id: Uuid,
    pub added_at: DateTime<Utc>,
}

impl Wishlist {
    pub fn new(email: impl Into<String>) -> Self { Self { email: email.into(), items: vec![] } }

    pub fn contains(&self, product_id: Uuid) -> bool { self.items.iter().any(|i| i.product_id == product_id) }

    /// Saves a product once; returns `false` if it was already saved.
    pub fn add(&mut self, product_id: Uuid) -> bool {
        if self.contains(product_id) { return false; }
        self.items.push(WishlistItem { product_id, added_at: Utc::now() });
        true
    }

    pub fn remove(&mut self, product_id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        self.items.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wishlist_keeps_one_entry_per_product() {
        let mut list = Wishlist::new("a@b.io");
        let id = Uuid::new_v4();
        assert!(list.add(id));
        assert!(!list.add(id));
        assert_eq!(list.items.len(), 1);
        assert!(list.remove(id));
        assert!(!list.remove(id));
    }
}
